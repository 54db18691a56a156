//! Tests for the TCP Server and Connection loop
//!
//! These tests verify:
//! - Request/reply over a real socket
//! - Malformed requests are skipped, the session continues
//! - Protocol errors close the connection
//! - Connection limit
//! - Concurrent clients
//! - Shutdown drains idle connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tidekv::config::{AofSyncPolicy, Config};
use tidekv::engine::Engine;
use tidekv::network::{Server, ShutdownHandle};
use tidekv::protocol::Value;
use tidekv::Client;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    engine: Arc<Engine>,
    shutdown: ShutdownHandle,
    handle: JoinHandle<()>,
}

impl TestServer {
    fn start(config: Config) -> Self {
        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let mut server = Server::bind(config, Arc::clone(&engine)).unwrap();
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            engine,
            shutdown,
            handle,
        }
    }

    fn client(&self) -> Client {
        let client = Client::connect(self.addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        client
    }

    fn stop(self) {
        self.shutdown.trigger();
        self.handle.join().unwrap();
        self.engine.close().unwrap();
    }
}

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .listen_addr("127.0.0.1:0")
        .aof_sync_policy(AofSyncPolicy::every_sec())
        .build()
}

// =============================================================================
// Request / Reply Tests
// =============================================================================

#[test]
fn test_ping() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(test_config(&temp_dir));

    let mut client = server.client();
    assert_eq!(client.command(["PING"]).unwrap(), Value::simple("PONG"));

    drop(client);
    server.stop();
}

#[test]
fn test_many_requests_on_one_connection() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(test_config(&temp_dir));

    let mut client = server.client();
    for i in 0..100 {
        let key = format!("key{}", i);
        assert_eq!(client.command(["SET", key.as_str(), "v"]).unwrap(), Value::ok());
        assert_eq!(client.command(["GET", key.as_str()]).unwrap(), Value::bulk("v"));
    }

    drop(client);
    server.stop();
}

#[test]
fn test_unknown_command_keeps_connection_open() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(test_config(&temp_dir));

    let mut client = server.client();
    client.send_raw(b"*1\r\n$4\r\nFROB\r\n").unwrap();
    assert_eq!(client.read_reply().unwrap(), Some(Value::simple("")));
    assert_eq!(client.command(["PING"]).unwrap(), Value::simple("PONG"));

    assert_eq!(server.engine.aof().entries_appended(), 0);

    drop(client);
    server.stop();
}

#[test]
fn test_non_array_request_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(test_config(&temp_dir));

    let mut client = server.client();
    client.send_raw(b":1\r\n").unwrap();
    client.send_raw(b"*0\r\n").unwrap();
    client.send_raw(b"*1\r\n:5\r\n").unwrap();

    // No reply was sent for the three bad requests; the next reply is PING's
    assert_eq!(client.command(["PING"]).unwrap(), Value::simple("PONG"));

    drop(client);
    server.stop();
}

#[test]
fn test_protocol_error_closes_connection() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(test_config(&temp_dir));

    let mut client = server.client();
    client.send_raw(b"?garbage\r\n").unwrap();

    match client.read_reply() {
        Ok(Some(Value::Error(message))) => assert!(message.contains("Protocol error")),
        other => panic!("Expected protocol error reply, got {:?}", other),
    }
    assert!(!matches!(client.read_reply(), Ok(Some(_))));

    // The server itself keeps serving
    let mut other = server.client();
    assert_eq!(other.command(["PING"]).unwrap(), Value::simple("PONG"));

    drop(other);
    server.stop();
}

#[test]
fn test_connection_limit() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .listen_addr("127.0.0.1:0")
        .max_connections(1)
        .build();
    let server = TestServer::start(config);

    let mut first = server.client();
    assert_eq!(first.command(["PING"]).unwrap(), Value::simple("PONG"));

    let mut second = server.client();
    assert_eq!(
        second.read_reply().unwrap(),
        Some(Value::error("ERR max number of clients reached"))
    );

    drop(first);
    drop(second);
    server.stop();
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_clients_then_replay() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(test_config(&temp_dir));

    let clients = 8;
    let writes = 50;
    let addr = server.addr;

    let handles: Vec<_> = (0..clients)
        .map(|c| {
            thread::spawn(move || {
                let mut client = Client::connect(addr).unwrap();
                for i in 0..writes {
                    let key = format!("c{}-k{}", c, i);
                    let value = format!("v{}", i);
                    let reply = client.command(["SET", key.as_str(), value.as_str()]).unwrap();
                    assert_eq!(reply, Value::ok());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let live = server.engine.store().snapshot();
    assert_eq!(live.strings.len(), clients * writes);
    server.stop();

    let reopened = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(reopened.store().snapshot(), live);
    reopened.close().unwrap();
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_closes_idle_connections() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(test_config(&temp_dir));

    let mut client = server.client();
    assert_eq!(client.command(["PING"]).unwrap(), Value::simple("PONG"));

    // Returns only once the idle connection's worker has been joined
    server.stop();

    assert!(!matches!(client.read_reply(), Ok(Some(_))));
}
