//! Connection and key-space commands: PING, ECHO, DEL

use crate::protocol::Value;
use crate::store::Store;
use super::{bytes_args, wrong_arity};

/// `PING [message]`
pub(super) fn ping(_store: &Store, args: &[Value]) -> Value {
    let args = match bytes_args(args) {
        Ok(args) => args,
        Err(reply) => return reply,
    };

    match args.as_slice() {
        [] => Value::simple("PONG"),
        [message] => Value::bulk(message.clone()),
        _ => wrong_arity("ping"),
    }
}

/// `ECHO message`
pub(super) fn echo(_store: &Store, args: &[Value]) -> Value {
    let args = match bytes_args(args) {
        Ok(args) => args,
        Err(reply) => return reply,
    };

    match args.as_slice() {
        [message] => Value::bulk(message.clone()),
        _ => wrong_arity("echo"),
    }
}

/// `DEL key [key ...]`, removing string and hash keys alike
pub(super) fn del(store: &Store, args: &[Value]) -> Value {
    if args.is_empty() {
        return wrong_arity("del");
    }

    match bytes_args(args) {
        Ok(keys) => Value::Integer(store.delete(&keys) as i64),
        Err(reply) => reply,
    }
}
