use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use super::*;

fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server_side, _) = listener.accept().unwrap();
    (client, server_side)
}

#[test]
fn test_watch_op_parse() {
    assert_eq!(WatchOp::parse("SET"), Some(WatchOp::Set));
    assert_eq!(WatchOp::parse("ALL"), Some(WatchOp::All));
    assert_eq!(WatchOp::parse("bogus"), None);
}

#[test]
fn test_notify_reaches_specific_and_all_watchers() {
    let mgr = WatchManager::new();
    let (read_end_specific, write_end_specific) = loopback_pair();
    let (read_end_all, write_end_all) = loopback_pair();

    mgr.add_watch(1, write_end_specific, "foo", WatchOp::Set);
    mgr.add_watch(2, write_end_all, "foo", WatchOp::All);

    mgr.notify_event("foo", WatchOp::Set, Some("bar"));

    let mut reader = BufReader::new(read_end_specific);
    let mut line = String::new();
    read_end_specific_with_timeout(&mut reader, &mut line);
    assert_eq!(line, "NOTIFICATION SET foo bar\n");

    let mut reader2 = BufReader::new(read_end_all);
    let mut line2 = String::new();
    read_end_specific_with_timeout(&mut reader2, &mut line2);
    assert_eq!(line2, "NOTIFICATION SET foo bar\n");
}

fn read_end_specific_with_timeout(reader: &mut BufReader<TcpStream>, line: &mut String) {
    reader
        .get_ref()
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    reader.read_line(line).unwrap();
}

#[test]
fn test_del_notification_carries_no_value() {
    let mgr = WatchManager::new();
    let (read_end, write_end) = loopback_pair();
    mgr.add_watch(1, write_end, "k", WatchOp::Del);

    mgr.notify_event("k", WatchOp::Del, None);

    let mut reader = BufReader::new(read_end);
    let mut line = String::new();
    read_end_specific_with_timeout(&mut reader, &mut line);
    assert_eq!(line, "NOTIFICATION DEL k\n");
}

#[test]
fn test_remove_watch_stops_delivery() {
    let mgr = WatchManager::new();
    let (_read_end, write_end) = loopback_pair();
    mgr.add_watch(1, write_end, "k", WatchOp::Set);
    mgr.remove_watch(1, "k", WatchOp::Set);

    // No subscribers left; notify_event should simply find nothing to do.
    mgr.notify_event("k", WatchOp::Set, Some("v"));
}

#[test]
fn test_remove_all_watches_clears_subscriber_index() {
    let mgr = WatchManager::new();
    let (_read_a, write_a) = loopback_pair();
    let (_read_b, write_b) = loopback_pair();
    mgr.add_watch(7, write_a, "a", WatchOp::Set);
    mgr.add_watch(7, write_b, "b", WatchOp::Del);

    mgr.remove_all_watches(7);

    let index = mgr.index.lock().unwrap();
    assert!(!index.subscribers.contains_key(&7));
    assert!(!index.transports.contains_key(&7));
}
