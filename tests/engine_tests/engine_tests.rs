//! Tests for Engine
//!
//! These tests verify:
//! - Write commands are logged, read and unknown commands are not
//! - Startup replay rebuilds the store without re-appending
//! - Replaying twice gives the same state
//! - The write allow-list is configurable
//! - Startup fails on a damaged AOF
//! - Concurrent writers

use std::fs;
use std::sync::Arc;
use std::thread;

use tidekv::aof::AofReader;
use tidekv::config::{AofSyncPolicy, AofTailPolicy, Config, UnknownCommandPolicy};
use tidekv::engine::Engine;
use tidekv::protocol::Value;
use tidekv::TideError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .aof_sync_policy(AofSyncPolicy::Always) // Sync every write for test reliability
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    (temp_dir, engine)
}

fn exec(engine: &Engine, parts: &[&str]) -> Value {
    engine.execute_value(Value::command(parts)).unwrap()
}

fn aof_entries(engine: &Engine) -> Vec<Value> {
    AofReader::open(engine.aof_path())
        .unwrap()
        .entries()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory_and_aof() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let engine = Engine::open(Config::builder().data_dir(&data_dir).build()).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("appendonly.aof").exists());
    assert_eq!(engine.replay_result().entries_replayed, 0);
    engine.close().unwrap();
}

#[test]
fn test_engine_set_get() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(exec(&engine, &["SET", "foo", "bar"]), Value::ok());
    assert_eq!(exec(&engine, &["GET", "foo"]), Value::bulk("bar"));
}

#[test]
fn test_only_write_commands_are_logged() {
    let (_temp, engine) = setup_temp_engine();

    exec(&engine, &["SET", "a", "1"]);
    exec(&engine, &["GET", "a"]);
    exec(&engine, &["PING"]);
    exec(&engine, &["HSET", "h", "f", "v"]);
    exec(&engine, &["HGETALL", "h"]);
    exec(&engine, &["HDEL", "h", "f"]);
    exec(&engine, &["DEL", "a"]);

    assert_eq!(
        aof_entries(&engine),
        vec![
            Value::command(["SET", "a", "1"]),
            Value::command(["HSET", "h", "f", "v"]),
            Value::command(["HDEL", "h", "f"]),
            Value::command(["DEL", "a"]),
        ]
    );
}

#[test]
fn test_logged_entry_is_original_request() {
    let (_temp, engine) = setup_temp_engine();

    exec(&engine, &["set", "Key", "Value"]);

    assert_eq!(aof_entries(&engine), vec![Value::command(["set", "Key", "Value"])]);
}

#[test]
fn test_unknown_command_not_logged() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(exec(&engine, &["FROB"]), Value::simple(""));

    assert!(aof_entries(&engine).is_empty());
}

#[test]
fn test_strict_unknown_command_policy() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .unknown_command_policy(UnknownCommandPolicy::Error)
        .build();
    let engine = Engine::open(config).unwrap();

    assert!(exec(&engine, &["FROB"]).is_error());
    engine.close().unwrap();
}

#[test]
fn test_invalid_request_shapes() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(
        engine.execute_value(Value::simple("SET")),
        Err(TideError::InvalidRequest(_))
    ));
    assert!(matches!(
        engine.execute_value(Value::Array(vec![])),
        Err(TideError::InvalidRequest(_))
    ));
}

#[test]
fn test_custom_write_commands() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .write_commands(["set"])
        .build();
    let engine = Engine::open(config).unwrap();

    assert!(engine.is_write_command("SET"));
    assert!(!engine.is_write_command("HSET"));

    exec(&engine, &["SET", "a", "1"]);
    exec(&engine, &["HSET", "h", "f", "v"]);

    assert_eq!(aof_entries(&engine).len(), 1);
    engine.close().unwrap();
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_restores_state() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(&temp_dir)).unwrap();
        exec(&engine, &["SET", "foo", "bar"]);
        exec(&engine, &["SET", "gone", "x"]);
        exec(&engine, &["DEL", "gone"]);
        exec(&engine, &["HSET", "user", "name", "ada"]);
        engine.close().unwrap();
    }

    let engine = Engine::open(test_config(&temp_dir)).unwrap();

    assert_eq!(engine.replay_result().entries_replayed, 4);
    assert_eq!(exec(&engine, &["GET", "foo"]), Value::bulk("bar"));
    assert_eq!(exec(&engine, &["GET", "gone"]), Value::Null);
    assert_eq!(exec(&engine, &["HGET", "user", "name"]), Value::bulk("ada"));
}

#[test]
fn test_replay_does_not_reappend() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(&temp_dir)).unwrap();
        exec(&engine, &["SET", "a", "1"]);
        exec(&engine, &["SET", "b", "2"]);
        engine.close().unwrap();
    }
    let len_after_writes = fs::metadata(test_config(&temp_dir).aof_path()).unwrap().len();

    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    engine.close().unwrap();

    assert_eq!(fs::metadata(engine.aof_path()).unwrap().len(), len_after_writes);
    assert_eq!(engine.aof().entries_appended(), 0);
}

#[test]
fn test_replay_twice_gives_same_state() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(&temp_dir)).unwrap();
        for i in 0..20 {
            let key = format!("k{}", i % 7);
            let value = format!("v{}", i);
            exec(&engine, &["SET", &key, &value]);
            exec(&engine, &["HSET", "h", &key, &value]);
        }
        exec(&engine, &["DEL", "k3"]);
        engine.close().unwrap();
    }

    let first = Engine::open(test_config(&temp_dir)).unwrap();
    let first_snapshot = first.store().snapshot();
    first.close().unwrap();

    let second = Engine::open(test_config(&temp_dir)).unwrap();
    let second_snapshot = second.store().snapshot();
    second.close().unwrap();

    assert_eq!(first_snapshot, second_snapshot);
    assert_eq!(first_snapshot.strings.len(), 6);
}

#[test]
fn test_damaged_aof_refuses_to_open() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    fs::create_dir_all(&config.data_dir).unwrap();
    fs::write(config.aof_path(), b"*2\r\n$3\r\nSET\r\n?\r\n").unwrap();

    assert!(matches!(
        Engine::open(config),
        Err(TideError::AofCorruption { .. })
    ));
}

#[test]
fn test_truncate_policy_opens_with_damaged_tail() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(&temp_dir)).unwrap();
        exec(&engine, &["SET", "kept", "yes"]);
        engine.close().unwrap();
    }
    let mut bytes = fs::read(test_config(&temp_dir).aof_path()).unwrap();
    bytes.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$4\r\nlost");
    fs::write(test_config(&temp_dir).aof_path(), &bytes).unwrap();

    assert!(Engine::open(test_config(&temp_dir)).is_err());

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .aof_tail_policy(AofTailPolicy::Truncate)
        .build();
    let engine = Engine::open(config).unwrap();

    assert!(engine.replay_result().was_truncated());
    assert_eq!(exec(&engine, &["GET", "kept"]), Value::bulk("yes"));
    engine.close().unwrap();
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_distinct_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .aof_sync_policy(AofSyncPolicy::every_sec())
        .build();
    let engine = Arc::new(Engine::open(config.clone()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("t{}-{}", t, i);
                    let value = format!("v{}", i);
                    let reply = engine
                        .execute_value(Value::command(["SET", key.as_str(), value.as_str()]))
                        .unwrap();
                    assert_eq!(reply, Value::ok());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let live = engine.store().snapshot();
    assert_eq!(live.strings.len(), 800);
    engine.close().unwrap();

    let reopened = Engine::open(config).unwrap();
    assert_eq!(reopened.store().snapshot(), live);
    reopened.close().unwrap();
}

#[test]
fn test_same_key_writes_replay_to_live_value() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(Engine::open(test_config(&temp_dir)).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..50 {
                    let value = format!("{}-{}", t, i);
                    engine
                        .execute_value(Value::command(["SET", "shared", value.as_str()]))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let live = engine.store().get(b"shared");
    engine.close().unwrap();

    let reopened = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(reopened.store().get(b"shared"), live);
    reopened.close().unwrap();
}
