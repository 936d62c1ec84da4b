// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request-line parsing. `GET` only, per §4.4; `httparse` does the
//! line/header tokenizing (as `libdd-common`'s test harness uses it for
//! minimal request construction), this module only owns finding the header
//! terminator over the blocking `Transport` and rejecting non-`GET` methods.

use mps_net::Transport;
use tracing::warn;

use crate::error::HttpError;

/// Header blocks beyond this size are rejected rather than grown without
/// bound; real MPS query strings are well under this.
const MAX_HEAD_LEN: usize = 16 * 1024;

pub struct RawRequest {
    pub method: String,
    pub path: String,
    pub query: String,
}

/// Peeks a growing window of the transport until the `\r\n\r\n` header
/// terminator appears, then consumes exactly that many bytes and parses the
/// request line out of it with `httparse`.
pub fn read_request(transport: &mut Transport) -> Result<RawRequest, HttpError> {
    let mut probe = 256usize;
    let head_len = loop {
        let window = transport.peek(probe.min(MAX_HEAD_LEN))?;
        if let Some(pos) = find_header_terminator(window) {
            break pos + 4;
        }
        if probe >= MAX_HEAD_LEN {
            return Err(HttpError::BadRequest);
        }
        probe = (probe * 2).min(MAX_HEAD_LEN);
    };

    let head = transport.read_exact(head_len)?;
    parse_request_line(&head)
}

fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_request_line(head: &[u8]) -> Result<RawRequest, HttpError> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(head) {
        Ok(httparse::Status::Complete(_)) | Ok(httparse::Status::Partial) => {}
        Err(_) => return Err(HttpError::BadRequest),
    }

    let method = req.method.ok_or(HttpError::BadRequest)?.to_string();
    if method != "GET" {
        warn!(method = %method, "rejecting non-GET request");
        return Err(HttpError::MethodNotAllowed(method));
    }

    let raw_path = req.path.ok_or(HttpError::BadRequest)?;
    let (path, query) = match raw_path.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (raw_path.to_string(), String::new()),
    };

    Ok(RawRequest { method, path, query })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    #[test]
    fn parses_get_line_with_query() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || {
            let mut s = TcpStream::connect(addr).unwrap();
            s.write_all(b"GET /SearchIndex?index=test HTTP/1.1\r\nHost: x\r\n\r\n")
                .unwrap();
        });
        let (stream, _) = listener.accept().unwrap();
        let mut transport = Transport::from_tcp_stream(stream);
        let req = read_request(&mut transport).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/SearchIndex");
        assert_eq!(req.query, "index=test");
        client.join().unwrap();
    }

    #[test]
    fn rejects_non_get_method() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || {
            let mut s = TcpStream::connect(addr).unwrap();
            s.write_all(b"POST /SearchIndex HTTP/1.1\r\n\r\n").unwrap();
        });
        let (stream, _) = listener.accept().unwrap();
        let mut transport = Transport::from_tcp_stream(stream);
        let err = read_request(&mut transport).unwrap_err();
        assert!(matches!(err, HttpError::MethodNotAllowed(_)));
        client.join().unwrap();
    }
}
