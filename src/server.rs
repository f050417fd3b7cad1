//! Module `server` implements the single-threaded, non-blocking, edge-
//! triggered event loop (spec.md §4.H) on top of `mio`.
//!
//! One listener plus N connected peers are registered with a single
//! [Poll]. Each wakeup drains every ready peer's socket in a non-blocking
//! loop, splits whatever complete lines have accumulated, dispatches them
//! through [crate::protocol::handle_line], and writes the response back.
//! End-of-stream or an unrecoverable read error deregisters and closes the
//! peer. The listener's own accept loop is likewise non-blocking and
//! drained until `WouldBlock` (spec.md §4.H).
//!
//! All mutation flows through this one thread, which is why [crate::store]
//! needs no internal locking (spec.md §5); the only state shared with
//! another thread is [crate::watch::WatchManager]'s queue.

use std::collections::HashMap;
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream as StdTcpStream;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use crate::error::{Error, Result};
use crate::protocol;
use crate::store::Store;
use crate::watch::WatchManager;

const LISTENER: Token = Token(0);
const READ_BUF: usize = 4096;
/// Bounded so shutdown is responsive even while idle (spec.md §5).
const POLL_TIMEOUT: Duration = Duration::from_millis(1000);
const MAX_WRITE_RETRIES: usize = 100;

struct Connection {
    stream: TcpStream,
    /// A standing clone of the peer's socket, handed to the watch manager
    /// on `WATCH` so its delivery thread can write independently of this
    /// loop (see `crate::watch`).
    transport: StdTcpStream,
    inbuf: Vec<u8>,
}

/// Owns the listener, the connection table, the store and the watch
/// manager. One instance per running process.
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    store: Store,
    watches: WatchManager,
    save_dir: PathBuf,
    running: Arc<AtomicBool>,
}

impl Server {
    pub fn bind(addr: &str, save_dir: PathBuf) -> Result<Server> {
        let std_listener = std::net::TcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;
        let mut listener = TcpListener::from_std(std_listener);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Server {
            poll,
            listener,
            connections: HashMap::new(),
            next_token: 1,
            store: Store::new(),
            watches: WatchManager::new(),
            save_dir,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// A handle the caller can flip to `false` to stop [Server::run] at its
    /// next poll wakeup (spec.md §5, "setting running = false").
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(128);
        while self.running.load(Ordering::SeqCst) {
            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::from(err)),
            }

            for event in events.iter() {
                if event.token() == LISTENER {
                    self.accept_loop()?;
                } else {
                    self.readable(event.token());
                }
            }
        }
        info!(target: "server", "shutting down, {} connections open", self.connections.len());
        Ok(())
    }

    fn accept_loop(&mut self) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    self.register_connection(stream, addr)?;
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err) => {
                    warn!(target: "server", "accept failed: {}", err);
                    return Ok(());
                }
            }
        }
    }

    fn register_connection(&mut self, mut mio_stream: TcpStream, addr: std::net::SocketAddr) -> Result<()> {
        let transport = clone_as_std_stream(&mio_stream)?;

        let token = Token(self.next_token);
        self.next_token += 1;
        self.poll
            .registry()
            .register(&mut mio_stream, token, Interest::READABLE)?;

        debug!(target: "server", "accepted {} as {:?}", addr, token);
        self.connections.insert(
            token,
            Connection {
                stream: mio_stream,
                transport,
                inbuf: Vec::new(),
            },
        );
        Ok(())
    }

    fn readable(&mut self, token: Token) {
        let mut closed = false;
        let mut responses: Vec<String> = Vec::new();

        if let Some(conn) = self.connections.get_mut(&token) {
            let mut buf = [0u8; READ_BUF];
            loop {
                match conn.stream.read(&mut buf) {
                    Ok(0) => {
                        closed = true;
                        break;
                    }
                    Ok(n) => conn.inbuf.extend_from_slice(&buf[..n]),
                    Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => {
                        closed = true;
                        break;
                    }
                }
            }

            while let Some(pos) = conn.inbuf.iter().position(|&b| b == b'\n') {
                let line_bytes: Vec<u8> = conn.inbuf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line_bytes);
                let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
                if line.is_empty() {
                    continue;
                }
                let response = protocol::handle_line(
                    line,
                    &mut self.store,
                    &self.watches,
                    token.0,
                    &conn.transport,
                    &self.save_dir,
                );
                responses.push(response);
            }
        }

        if let Some(conn) = self.connections.get_mut(&token) {
            for response in &responses {
                if write_response(&mut conn.stream, response).is_err() {
                    closed = true;
                    break;
                }
            }
        }

        if closed {
            self.close_connection(token);
        }
    }

    fn close_connection(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
        self.watches.remove_all_watches(token.0);
        debug!(target: "server", "closed {:?}", token);
    }
}

/// `mio::net::TcpStream` deliberately drops `try_clone` (cloning a
/// poll-registered fd is unsafe to do through the trait mio exposes), so we
/// reach for `libc::dup` directly: duplicate the raw fd and hand the
/// duplicate to `std::net::TcpStream`, which the watch manager can then
/// write to independently of this loop's registration.
fn clone_as_std_stream(stream: &TcpStream) -> Result<StdTcpStream> {
    let dup_fd = unsafe { libc::dup(stream.as_raw_fd()) };
    if dup_fd < 0 {
        return Err(Error::from(io::Error::last_os_error()));
    }
    Ok(unsafe { StdTcpStream::from_raw_fd(dup_fd) })
}

fn write_response(stream: &mut TcpStream, response: &str) -> io::Result<()> {
    let bytes = response.as_bytes();
    let mut written = 0;
    let mut retries = 0;
    while written < bytes.len() {
        match stream.write(&bytes[written..]) {
            Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
            Ok(n) => written += n,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                retries += 1;
                if retries > MAX_WRITE_RETRIES {
                    return Err(err);
                }
                std::thread::yield_now();
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
