//! String commands: SET, GET

use crate::protocol::Value;
use crate::store::Store;
use super::{bytes_args, wrong_arity};

/// `SET key value`
pub(super) fn set(store: &Store, args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_arity("set");
    }

    match bytes_args(args) {
        Ok(mut args) => {
            let value = args.pop().unwrap_or_default();
            let key = args.pop().unwrap_or_default();
            store.set(key, value);
            Value::ok()
        }
        Err(reply) => reply,
    }
}

/// `GET key`
pub(super) fn get(store: &Store, args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_arity("get");
    }

    match bytes_args(args) {
        Ok(args) => store.get(&args[0]).into(),
        Err(reply) => reply,
    }
}
