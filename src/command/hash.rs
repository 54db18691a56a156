//! Hash commands: HSET, HGET, HGETALL, HDEL

use crate::protocol::Value;
use crate::store::Store;
use super::{bytes_args, wrong_arity};

/// `HSET key field value [field value ...]`
pub(super) fn hset(store: &Store, args: &[Value]) -> Value {
    if args.len() < 3 || args.len() % 2 == 0 {
        return wrong_arity("hset");
    }

    match bytes_args(args) {
        Ok(args) => {
            let fields = args[1..]
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()));
            store.hset(args[0].clone(), fields);
            Value::ok()
        }
        Err(reply) => reply,
    }
}

/// `HGET key field`
pub(super) fn hget(store: &Store, args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_arity("hget");
    }

    match bytes_args(args) {
        Ok(args) => store.hget(&args[0], &args[1]).into(),
        Err(reply) => reply,
    }
}

/// `HGETALL key`, alternating field and value
pub(super) fn hgetall(store: &Store, args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_arity("hgetall");
    }

    match bytes_args(args) {
        Ok(args) => Value::Array(
            store
                .hgetall(&args[0])
                .into_iter()
                .flat_map(|(field, value)| [Value::BulkString(field), Value::BulkString(value)])
                .collect(),
        ),
        Err(reply) => reply,
    }
}

/// `HDEL key field [field ...]`
pub(super) fn hdel(store: &Store, args: &[Value]) -> Value {
    if args.len() < 2 {
        return wrong_arity("hdel");
    }

    match bytes_args(args) {
        Ok(args) => Value::Integer(store.hdel(&args[0], &args[1..]) as i64),
        Err(reply) => reply,
    }
}
