//! Byte-level transports underneath [`DeviceLink`](crate::link::DeviceLink)
//!
//! The recorder speaks a strict request/response protocol: one line out, one buffer back.
//! [`TcpTransport`] is the real socket; [`ScriptedTransport`] answers from a closure or a
//! canned list of replies and records every line it was sent.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::codec::{LINE_TERMINATOR, QUERY_SEPARATOR};
use crate::error::{Error, Result};

/// Read/write timeout applied to the recorder socket
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of the single read performed per exchange
pub const RECEIVE_BUFFER_SIZE: usize = 1024;

/// A request/response byte channel to the recorder
pub trait Transport {
    /// Write one complete, already-terminated wire line
    fn send(&mut self, message: &str) -> io::Result<()>;

    /// Read the reply to the last line sent
    fn receive(&mut self) -> io::Result<String>;
}

/// TCP connection to a recorder's control port
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `address:port` with [`IO_TIMEOUT`] applied to connect, reads and writes
    pub fn connect(address: &str, port: u16) -> Result<Self> {
        let target = format!("{}:{}", address, port);
        let connection_error = |source| Error::Connection {
            address: target.clone(),
            source,
        };

        let mut last_error = None;
        for addr in (address, port).to_socket_addrs().map_err(connection_error)? {
            match TcpStream::connect_timeout(&addr, IO_TIMEOUT) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(IO_TIMEOUT))
                        .map_err(connection_error)?;
                    stream
                        .set_write_timeout(Some(IO_TIMEOUT))
                        .map_err(connection_error)?;
                    tracing::debug!("Connected to {} ({})", target, addr);
                    return Ok(Self { stream });
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(connection_error(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
        })))
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, message: &str) -> io::Result<()> {
        self.stream.write_all(message.as_bytes())
    }

    fn receive(&mut self) -> io::Result<String> {
        let mut buffer = [0u8; RECEIVE_BUFFER_SIZE];
        let read = self.stream.read(&mut buffer)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "recorder closed the connection",
            ));
        }
        Ok(String::from_utf8_lossy(&buffer[..read]).into_owned())
    }
}

/// Shared record of the lines a [`ScriptedTransport`] was sent, terminators stripped
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<String>>>);

impl SentLog {
    fn push(&self, line: String) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }

    /// Every line sent so far, in order
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every query sent so far, with batches split into their queries
    pub fn queries(&self) -> Vec<String> {
        self.lines()
            .iter()
            .flat_map(|line| line.split(QUERY_SEPARATOR).map(String::from))
            .collect()
    }

    /// How many times `query` was sent, alone or inside a batch
    pub fn count(&self, query: &str) -> usize {
        self.queries().iter().filter(|q| q.as_str() == query).count()
    }
}

type Responder = Box<dyn FnMut(&str) -> io::Result<String> + Send>;

/// In-memory transport answering each line from a responder closure
pub struct ScriptedTransport {
    responder: Responder,
    pending: Option<String>,
    log: SentLog,
}

impl ScriptedTransport {
    /// Answer each line (terminator stripped) with `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> io::Result<String> + Send + 'static,
    {
        Self {
            responder: Box::new(responder),
            pending: None,
            log: SentLog::default(),
        }
    }

    /// Answer lines with `replies` in order, timing out once they run out
    pub fn from_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue: VecDeque<String> = replies.into_iter().map(Into::into).collect();
        Self::new(move |line| {
            queue.pop_front().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no scripted reply for '{}'", line),
                )
            })
        })
    }

    /// Handle to the record of sent lines
    pub fn sent_log(&self) -> SentLog {
        self.log.clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, message: &str) -> io::Result<()> {
        let line = message
            .strip_suffix(LINE_TERMINATOR)
            .unwrap_or(message)
            .to_string();
        self.log.push(line.clone());
        self.pending = Some(line);
        Ok(())
    }

    fn receive(&mut self) -> io::Result<String> {
        let line = self
            .pending
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "nothing was sent"))?;
        (self.responder)(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_scripted_replies_in_order() {
        let mut transport = ScriptedTransport::from_replies(["!a? 0 ;", "!b? 0 ;"]);
        transport.send("a?\n\r").unwrap();
        assert_eq!(transport.receive().unwrap(), "!a? 0 ;");
        transport.send("b?\n\r").unwrap();
        assert_eq!(transport.receive().unwrap(), "!b? 0 ;");
        transport.send("c?\n\r").unwrap();
        let err = transport.receive().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_scripted_receive_without_send() {
        let mut transport = ScriptedTransport::from_replies(["!a? 0 ;"]);
        assert!(transport.receive().is_err());
    }

    #[test]
    fn test_sent_log_splits_batches() {
        let mut transport = ScriptedTransport::new(|_| Ok(String::new()));
        let log = transport.sent_log();
        transport.send("protect=off;reset=erase\n\r").unwrap();
        transport.send("reset=abort\n\r").unwrap();

        assert_eq!(log.lines(), vec!["protect=off;reset=erase", "reset=abort"]);
        assert_eq!(log.queries().len(), 3);
        assert_eq!(log.count("reset=abort"), 1);
        assert_eq!(log.count("reset=condition"), 0);
    }

    #[test]
    fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buffer = [0u8; 64];
            let read = socket.read(&mut buffer).unwrap();
            assert_eq!(&buffer[..read], b"dts_id?\n\r");
            socket.write_all(b"!dts_id? 0 : mark5b ;").unwrap();
        });

        let mut transport = TcpTransport::connect("127.0.0.1", port).unwrap();
        transport.send("dts_id?\n\r").unwrap();
        assert_eq!(transport.receive().unwrap(), "!dts_id? 0 : mark5b ;");
        server.join().unwrap();
    }

    #[test]
    fn test_tcp_connect_refused() {
        // Bind then drop to get a port nobody is listening on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = TcpTransport::connect("127.0.0.1", port).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
