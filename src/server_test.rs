use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use super::*;

fn spawn_server() -> (String, Arc<AtomicBool>, thread::JoinHandle<()>) {
    let dir = std::env::temp_dir().join(format!("vertree-server-test-{:?}", thread::current().id()));
    let mut server = Server::bind("127.0.0.1:0", dir).unwrap();
    let addr = server.listener.local_addr().unwrap().to_string();
    let stop = server.stop_handle();

    let handle = thread::spawn(move || {
        server.run().unwrap();
    });

    // Give the loop thread a moment to enter its poll wait.
    thread::sleep(Duration::from_millis(50));
    (addr, stop, handle)
}

fn read_line(stream: &TcpStream) -> String {
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    line
}

#[test]
fn test_basic_set_get_over_network() {
    let (addr, stop, handle) = spawn_server();
    let mut client = TcpStream::connect(&addr).unwrap();

    client.write_all(b"SET tirth great\n").unwrap();
    assert_eq!(read_line(&client), "OK\n");

    client.write_all(b"GET tirth\n").unwrap();
    assert_eq!(read_line(&client), "OK great\n");

    client.write_all(b"GET none\n").unwrap();
    assert_eq!(read_line(&client), "ERROR Key not found\n");

    stop.store(false, Ordering::SeqCst);
    handle.join().unwrap();
}

#[test]
fn test_watch_fanout_over_network() {
    let (addr, stop, handle) = spawn_server();

    let mut subscriber = TcpStream::connect(&addr).unwrap();
    subscriber.write_all(b"WATCH foo ALL\n").unwrap();
    assert_eq!(read_line(&subscriber), "OK Watching foo for ALL operations\n");

    let mut setter = TcpStream::connect(&addr).unwrap();
    setter.write_all(b"SET foo bar\n").unwrap();
    assert_eq!(read_line(&setter), "OK\n");

    assert_eq!(read_line(&subscriber), "NOTIFICATION SET foo bar\n");

    stop.store(false, Ordering::SeqCst);
    handle.join().unwrap();
}

#[test]
fn test_multiple_commands_in_one_write_are_each_answered() {
    let (addr, stop, handle) = spawn_server();
    let mut client = TcpStream::connect(&addr).unwrap();

    client.write_all(b"SET a 1\nSET b 2\nGET a\n").unwrap();
    assert_eq!(read_line(&client), "OK\n");
    assert_eq!(read_line(&client), "OK\n");
    assert_eq!(read_line(&client), "OK 1\n");

    stop.store(false, Ordering::SeqCst);
    handle.join().unwrap();
}
