//! Protocol Module
//!
//! RESP (REdis Serialization Protocol) values and their wire codec.
//!
//! ## Value Types
//! - `+` simple string
//! - `-` error
//! - `:` integer
//! - `$` bulk string (`$-1` is the null bulk string)
//! - `*` array
//!
//! ## Requests
//! Clients always send an array of bulk strings. The first element,
//! compared case-insensitively, names the command.

mod value;
mod request;
mod codec;

pub use value::Value;
pub use request::Request;
pub use codec::{
    decode, encode, encode_into, encoded_len, read_value, write_value, Decoder, CRLF,
    MAX_ARRAY_LEN, MAX_BULK_LEN, MAX_DEPTH, MAX_LINE_LEN, NULL_BULK,
};
