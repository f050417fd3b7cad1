//! Module `protocol` tokenizes and interprets the text command language
//! (spec.md §4.G) and renders responses. Keys and values are whitespace-free
//! tokens by construction (the wire format is whitespace-delimited); an
//! input that supplies extra tokens where a single key or value token is
//! expected is rejected explicitly rather than silently re-joined, resolving
//! spec.md §9's "reject or quote" open question (SPEC_FULL.md §4.G).

use std::net::TcpStream;
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::store::{Outcome, Store};
use crate::watch::{ClientId, WatchManager, WatchOp};

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Get(&'a str),
    Set(&'a str, &'a str),
    Del(&'a str),
    Edit(&'a str, &'a str),
    Snapshot,
    Vget(usize, &'a str),
    Change(usize),
    Store(&'a str),
    Vstore(&'a str),
    Load(&'a str),
    Vload(&'a str),
    Watch(&'a str, WatchOp),
    Unwatch(Option<(&'a str, WatchOp)>),
}

fn protocol_err(msg: impl Into<String>) -> Error {
    Error::Protocol("<command>".to_string(), msg.into())
}

fn parse_version(token: &str) -> Result<usize> {
    token
        .parse::<usize>()
        .map_err(|_| protocol_err(format!("invalid version {:?}", token)))
}

fn parse_watch_op(token: &str) -> Result<WatchOp> {
    WatchOp::parse(token).ok_or_else(|| {
        protocol_err("Invalid watch operation. Use SET, DEL, EDIT, or ALL".to_string())
    })
}

fn parse(line: &str) -> Result<Command> {
    let mut tokens = line.split_whitespace();
    let verb = tokens.next().ok_or_else(|| protocol_err("empty command"))?;
    let rest: Vec<&str> = tokens.collect();

    match verb {
        "GET" => match rest.as_slice() {
            [key] => Ok(Command::Get(key)),
            [] => Err(protocol_err("GET requires a key")),
            _ => Err(protocol_err("Key cannot contain whitespace")),
        },
        "SET" => match rest.as_slice() {
            [key, value] => Ok(Command::Set(key, value)),
            [_] | [] => Err(protocol_err("SET requires a key and a value")),
            _ => Err(protocol_err("Value cannot contain whitespace")),
        },
        "DEL" => match rest.as_slice() {
            [key] => Ok(Command::Del(key)),
            [] => Err(protocol_err("DEL requires a key")),
            _ => Err(protocol_err("Key cannot contain whitespace")),
        },
        "EDIT" => match rest.as_slice() {
            [key, value] => Ok(Command::Edit(key, value)),
            [_] | [] => Err(protocol_err("EDIT requires a key and a value")),
            _ => Err(protocol_err("Value cannot contain whitespace")),
        },
        "SNAPSHOT" => Ok(Command::Snapshot),
        "VGET" => match rest.as_slice() {
            [v, key] => Ok(Command::Vget(parse_version(v)?, key)),
            _ => Err(protocol_err("VGET requires a version and a key")),
        },
        "CHANGE" => match rest.as_slice() {
            [v] => Ok(Command::Change(parse_version(v)?)),
            _ => Err(protocol_err("CHANGE requires a version")),
        },
        "STORE" => match rest.as_slice() {
            [file] => Ok(Command::Store(file)),
            _ => Err(protocol_err("STORE requires a file name")),
        },
        "VSTORE" => match rest.as_slice() {
            [file] => Ok(Command::Vstore(file)),
            _ => Err(protocol_err("VSTORE requires a file name")),
        },
        "LOAD" => match rest.as_slice() {
            [file] => Ok(Command::Load(file)),
            _ => Err(protocol_err("LOAD requires a file name")),
        },
        "VLOAD" => match rest.as_slice() {
            [file] => Ok(Command::Vload(file)),
            _ => Err(protocol_err("VLOAD requires a file name")),
        },
        "WATCH" => match rest.as_slice() {
            [key, op] => Ok(Command::Watch(key, parse_watch_op(op)?)),
            _ => Err(protocol_err("WATCH requires a key and an operation")),
        },
        "UNWATCH" => match rest.as_slice() {
            [] => Ok(Command::Unwatch(None)),
            [key, op] => Ok(Command::Unwatch(Some((key, parse_watch_op(op)?)))),
            _ => Err(protocol_err("UNWATCH takes either no arguments or a key and an operation")),
        },
        _ => Err(protocol_err("Unknown command")),
    }
}

/// Parse and execute one line of input, returning the LF-terminated
/// response the caller should write back to the client (spec.md §4.G: "all
/// responses terminate with a single LF").
pub fn handle_line(
    line: &str,
    store: &mut Store,
    watches: &WatchManager,
    client: ClientId,
    transport: &TcpStream,
    save_dir: &Path,
) -> String {
    match parse(line) {
        Ok(command) => execute(command, store, watches, client, transport, save_dir),
        Err(err) => format!("ERROR {}\n", display_protocol_message(&err)),
    }
}

fn display_protocol_message(err: &Error) -> String {
    match err {
        Error::Protocol(_, msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn execute(
    command: Command,
    store: &mut Store,
    watches: &WatchManager,
    client: ClientId,
    transport: &TcpStream,
    save_dir: &Path,
) -> String {
    match command {
        Command::Get(key) => match store.get(key) {
            Some(value) => format!("OK {}\n", String::from_utf8_lossy(&value)),
            None => "ERROR Key not found\n".to_string(),
        },
        Command::Set(key, value) => match store.set(key, value.as_bytes()) {
            Outcome::Ok => {
                watches.notify_event(key, WatchOp::Set, Some(value));
                "OK\n".to_string()
            }
            Outcome::AlreadyExists => "ERROR Key already exists\n".to_string(),
            Outcome::NotFound => unreachable!("set never reports NotFound"),
        },
        Command::Del(key) => match store.del(key) {
            Outcome::Ok => {
                watches.notify_event(key, WatchOp::Del, None);
                "OK\n".to_string()
            }
            Outcome::NotFound => "ERROR Key not found\n".to_string(),
            Outcome::AlreadyExists => unreachable!("del never reports AlreadyExists"),
        },
        Command::Edit(key, value) => match store.edit(key, value.as_bytes()) {
            Outcome::Ok => {
                watches.notify_event(key, WatchOp::Edit, Some(value));
                "OK\n".to_string()
            }
            Outcome::NotFound => "ERROR Key not found\n".to_string(),
            Outcome::AlreadyExists => unreachable!("edit never reports AlreadyExists"),
        },
        Command::Snapshot => {
            let v = store.snapshot();
            debug!(target: "protocol", "snapshot created, version {}", v);
            format!("OK Snapshot created, version {}\n", v)
        }
        Command::Vget(v, key) => match store.vget(v, key) {
            Ok(Some(value)) => format!("OK {}\n", String::from_utf8_lossy(&value)),
            Ok(None) => format!("ERROR Key not found in version {}\n", v),
            Err(_) => "ERROR Invalid version\n".to_string(),
        },
        Command::Change(v) => match store.change(v) {
            Ok(()) => format!("CHANGE to version {}\n", v),
            Err(_) => "ERROR Invalid version\n".to_string(),
        },
        Command::Store(file) => match store.store_image(save_dir, file) {
            Ok(()) => {
                info!(target: "protocol", "full image saved to {}", file);
                format!("DATABASE and SNAPSHOTS saved to {}\n", file)
            }
            Err(_) => format!("ERROR in opening {}\n", file),
        },
        Command::Vstore(file) => match store.vstore_image(save_dir, file) {
            Ok(()) => {
                info!(target: "protocol", "tree image saved to {}", file);
                format!("DATABASE saved to {}\n", file)
            }
            Err(_) => format!("ERROR in opening {}\n", file),
        },
        Command::Load(file) => match store.load_image(save_dir, file) {
            Ok(()) => {
                info!(target: "protocol", "full image loaded from {}", file);
                "DATABASE and SNAPSHOTS Loaded\n".to_string()
            }
            Err(_) => format!("ERROR in opening {}\n", file),
        },
        Command::Vload(file) => match store.vload_image(save_dir, file) {
            Ok(()) => {
                info!(target: "protocol", "tree image loaded from {}", file);
                "DATABASE Loaded\n".to_string()
            }
            Err(_) => format!("ERROR in opening {}\n", file),
        },
        Command::Watch(key, op) => match transport.try_clone() {
            Ok(clone) => {
                watches.add_watch(client, clone, key, op);
                debug!(target: "protocol", "client {} watching {} for {:?}", client, key, op);
                format!("OK Watching {} for {} operations\n", key, op.as_str())
            }
            Err(err) => format!("ERROR could not register watch: {}\n", err),
        },
        Command::Unwatch(None) => {
            watches.remove_all_watches(client);
            "OK Removed all watches\n".to_string()
        }
        Command::Unwatch(Some((key, op))) => {
            watches.remove_watch(client, key, op);
            format!("OK Removed watch for {}\n", key)
        }
    }
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod protocol_test;
