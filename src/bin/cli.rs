//! TideKV CLI Client
//!
//! Command-line interface for interacting with TideKV.

use clap::Parser;
use tidekv::protocol::Value;
use tidekv::Client;

/// TideKV CLI
#[derive(Parser, Debug)]
#[command(name = "tidekv-cli")]
#[command(about = "CLI for the TideKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Command and its arguments, e.g. `SET foo bar`
    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    match client.command(&args.command) {
        Ok(reply) => {
            let failed = reply.is_error();
            print_reply(&reply, 0);
            if failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a reply the way redis-cli does
fn print_reply(reply: &Value, indent: usize) {
    match reply {
        Value::SimpleString(text) => println!("{}", text),
        Value::Error(text) => println!("(error) {}", text),
        Value::Integer(n) => println!("(integer) {}", n),
        Value::BulkString(data) => println!("\"{}\"", String::from_utf8_lossy(data)),
        Value::Null => println!("(nil)"),
        Value::Array(items) if items.is_empty() => println!("(empty array)"),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let prefix = format!("{}) ", i + 1);
                if i > 0 {
                    print!("{}", " ".repeat(indent));
                }
                print!("{}", prefix);
                print_reply(item, indent + prefix.len());
            }
        }
    }
}
