// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Byte-level framed I/O over stream (TCP), datagram (UDP) and stdio
//! transports, with peek-before-read support so higher layers can select a
//! wire protocol before committing to a decode.

use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

mod stdio;
pub use stdio::StdioStream;

/// Errors surfaced by the transport layer.
///
/// `TimedOut` and `Closed` are non-fatal control-flow signals: callers in
/// `mps-server` treat them as "try again" rather than protocol failures.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("socket operation timed out")]
    TimedOut,
    #[error("peer closed the connection")]
    Closed,
    #[error("network I/O error: {0}")]
    Io(#[from] io::Error),
}

impl NetError {
    fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => NetError::TimedOut,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => NetError::Closed,
            _ => NetError::Io(err),
        }
    }
}

pub type NetResult<T> = Result<T, NetError>;

/// A protocol x host x port triple, as configured by `--socket=proto:host:port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketProtocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone)]
pub struct EndpointSpec {
    pub protocol: SocketProtocol,
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl EndpointSpec {
    fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.host.unwrap_or(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
            self.port,
        )
    }
}

/// A server-side listening endpoint: either a bound TCP/UDP socket or the
/// process's own stdio. Stream transports carry many framed requests per
/// connection; a `Udp` listener carries exactly one message per datagram.
pub enum Listener {
    Tcp(TcpListener),
    Udp(UdpSocket),
    Stdio,
}

impl Listener {
    pub fn bind(spec: &EndpointSpec) -> NetResult<Listener> {
        let addr = spec.bind_addr();
        match spec.protocol {
            SocketProtocol::Tcp => Ok(Listener::Tcp(TcpListener::bind(addr)?)),
            SocketProtocol::Udp => Ok(Listener::Udp(UdpSocket::bind(addr)?)),
        }
    }

    pub fn stdio() -> Listener {
        Listener::Stdio
    }

    /// Duplicates the listener's configuration with fresh kernel state, the
    /// way a thread pool hands each worker thread its own handle onto a
    /// shared listening socket.
    pub fn try_clone(&self) -> NetResult<Listener> {
        match self {
            Listener::Tcp(l) => Ok(Listener::Tcp(l.try_clone()?)),
            Listener::Udp(s) => Ok(Listener::Udp(s.try_clone()?)),
            Listener::Stdio => Ok(Listener::Stdio),
        }
    }

    /// Accepts a new client (stream transports) or a single datagram (UDP),
    /// fused into one call per spec: the first bytes of the request are
    /// already buffered in the returned `Transport` when this returns `Ok`.
    ///
    /// `accept_timeout` bounds only the wait for a new client/datagram to
    /// arrive; `request_timeout` is installed on the resulting transport for
    /// subsequent reads within the session.
    pub fn accept_and_receive(
        &self,
        accept_timeout: Option<Duration>,
        request_timeout: Option<Duration>,
    ) -> NetResult<Transport> {
        match self {
            Listener::Tcp(listener) => {
                let stream = match accept_timeout {
                    None => {
                        listener.set_nonblocking(false)?;
                        listener.accept().map(|(s, _)| s).map_err(NetError::from_io)?
                    }
                    Some(timeout) => accept_with_timeout(listener, timeout)?,
                };
                stream.set_nodelay(true).ok();
                let mut transport = Transport::new(TransportKind::Tcp(stream));
                transport.set_request_timeout(request_timeout)?;
                Ok(transport)
            }
            Listener::Udp(socket) => {
                socket.set_read_timeout(accept_timeout)?;
                let mut buf = vec![0u8; 64 * 1024];
                let (n, peer) = socket.recv_from(&mut buf).map_err(NetError::from_io)?;
                buf.truncate(n);
                let socket = socket.try_clone()?;
                let mut transport = Transport::new(TransportKind::Udp {
                    socket,
                    peer,
                    datagram_consumed: false,
                });
                transport.read_buf = buf;
                transport.set_request_timeout(request_timeout)?;
                Ok(transport)
            }
            Listener::Stdio => {
                let mut transport = Transport::new(TransportKind::Stdio(StdioStream::new()));
                // stdio has no out-of-band accept step; the first read happens
                // lazily the first time the caller peeks or reads.
                transport.set_request_timeout(request_timeout)?;
                Ok(transport)
            }
        }
    }
}

fn accept_with_timeout(listener: &TcpListener, timeout: Duration) -> NetResult<TcpStream> {
    listener.set_nonblocking(true)?;
    let deadline = std::time::Instant::now() + timeout;
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(stream),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if std::time::Instant::now() >= deadline {
                    return Err(NetError::TimedOut);
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(e) => {
                warn!(error = %e, "accept() failed");
                return Err(NetError::from_io(e));
            }
        }
    }
}

enum TransportKind {
    Tcp(TcpStream),
    Udp {
        socket: UdpSocket,
        peer: SocketAddr,
        datagram_consumed: bool,
    },
    Stdio(StdioStream),
}

/// One accepted connection (or one UDP datagram, or the process's stdio),
/// with a peekable read buffer and a staged write buffer.
pub struct Transport {
    kind: TransportKind,
    read_buf: Vec<u8>,
    read_pos: usize,
    write_buf: Vec<u8>,
}

impl Transport {
    fn new(kind: TransportKind) -> Self {
        Transport {
            kind,
            read_buf: Vec::new(),
            read_pos: 0,
            write_buf: Vec::new(),
        }
    }

    pub fn from_tcp_stream(stream: TcpStream) -> Self {
        Transport::new(TransportKind::Tcp(stream))
    }

    pub fn set_request_timeout(&mut self, timeout: Option<Duration>) -> NetResult<()> {
        match &self.kind {
            TransportKind::Tcp(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)?;
            }
            TransportKind::Udp { socket, .. } => {
                socket.set_read_timeout(timeout)?;
                socket.set_write_timeout(timeout)?;
            }
            TransportKind::Stdio(_) => {}
        }
        Ok(())
    }

    fn unread_len(&self) -> usize {
        self.read_buf.len() - self.read_pos
    }

    fn fill_to(&mut self, n: usize) -> NetResult<()> {
        while self.unread_len() < n {
            if self.read_pos > 0 {
                self.read_buf.drain(..self.read_pos);
                self.read_pos = 0;
            }
            let mut chunk = [0u8; 4096];
            let read = match &mut self.kind {
                TransportKind::Tcp(s) => s.read(&mut chunk).map_err(NetError::from_io)?,
                TransportKind::Stdio(s) => s.read(&mut chunk).map_err(NetError::from_io)?,
                TransportKind::Udp {
                    datagram_consumed, ..
                } => {
                    // The datagram's payload is already fully buffered by
                    // accept_and_receive; a second read means the caller
                    // asked for more than the datagram contained.
                    if *datagram_consumed {
                        return Err(NetError::Closed);
                    }
                    *datagram_consumed = true;
                    0
                }
            };
            if read == 0 {
                return Err(NetError::Closed);
            }
            self.read_buf.extend_from_slice(&chunk[..read]);
        }
        Ok(())
    }

    /// Peeks `n` bytes without consuming them from the logical stream.
    pub fn peek(&mut self, n: usize) -> NetResult<&[u8]> {
        self.fill_to(n)?;
        Ok(&self.read_buf[self.read_pos..self.read_pos + n])
    }

    /// Peeks exactly one byte, the operation the protocol dispatcher (C5)
    /// needs to pick a handler.
    pub fn peek_byte(&mut self) -> NetResult<u8> {
        Ok(self.peek(1)?[0])
    }

    /// Reads and consumes exactly `n` bytes.
    pub fn read_exact(&mut self, n: usize) -> NetResult<Vec<u8>> {
        self.fill_to(n)?;
        let bytes = self.read_buf[self.read_pos..self.read_pos + n].to_vec();
        self.read_pos += n;
        Ok(bytes)
    }

    /// Stages bytes into the send buffer; nothing is written to the kernel
    /// until `send` is called.
    pub fn write_buffered(&mut self, bytes: &[u8]) {
        self.write_buf.extend_from_slice(bytes);
    }

    /// Flushes the staged send buffer as one logical response.
    pub fn send(&mut self) -> NetResult<()> {
        let buf = std::mem::take(&mut self.write_buf);
        match &mut self.kind {
            TransportKind::Tcp(s) => s.write_all(&buf).map_err(NetError::from_io)?,
            TransportKind::Stdio(s) => s.write_all(&buf).map_err(NetError::from_io)?,
            TransportKind::Udp { socket, peer, .. } => {
                socket.send_to(&buf, *peer).map_err(NetError::from_io)?;
            }
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if let TransportKind::Tcp(s) = &self.kind {
            let _ = s.shutdown(std::net::Shutdown::Both);
        }
    }

    pub fn is_datagram(&self) -> bool {
        matches!(self.kind, TransportKind::Udp { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::net::TcpStream;

    #[test]
    fn peek_then_read_exact_round_trips() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || {
            let mut s = TcpStream::connect(addr).unwrap();
            s.write_all(b"Lhello").unwrap();
        });
        let (stream, _) = listener.accept().unwrap();
        let mut transport = Transport::from_tcp_stream(stream);
        assert_eq!(transport.peek_byte().unwrap(), b'L');
        // peeking again must not consume
        assert_eq!(transport.peek_byte().unwrap(), b'L');
        let body = transport.read_exact(6).unwrap();
        assert_eq!(&body, b"Lhello");
        client.join().unwrap();
    }

    #[test]
    fn accept_with_timeout_times_out_with_no_client() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let err = accept_with_timeout(&listener, Duration::from_millis(30)).unwrap_err();
        assert!(matches!(err, NetError::TimedOut));
    }
}
