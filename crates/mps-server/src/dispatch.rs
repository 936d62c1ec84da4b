// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Protocol dispatcher (C5): peek exactly one byte and match it against a
//! small table of registered protocols. Replaces the original's
//! function-pointer table keyed by header byte with a plain match, per the
//! "protocol handler table with function pointers" REDESIGN FLAG — adding a
//! protocol means adding one arm here.

use mps_net::Transport;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Lwps,
    Http,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unrecognized protocol lead byte {0:#x}")]
    Unrecognized(u8),
    #[error(transparent)]
    Net(#[from] mps_net::NetError),
}

/// Peeks the connection's first byte without consuming it and selects a
/// handler. `mps-server::session` consumes the byte itself once the chosen
/// codec starts reading its frame/request-line.
pub fn detect(transport: &mut Transport) -> Result<Protocol, DispatchError> {
    let lead = transport.peek_byte()?;
    match lead {
        mps_lwps::PROTOCOL_TAG => Ok(Protocol::Lwps),
        mps_http::PROTOCOL_LEAD_BYTE => Ok(Protocol::Http),
        other => Err(DispatchError::Unrecognized(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    fn transport_with(bytes: &'static [u8]) -> Transport {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || {
            let mut s = TcpStream::connect(addr).unwrap();
            s.write_all(bytes).unwrap();
        });
        let (stream, _) = listener.accept().unwrap();
        client.join().unwrap();
        Transport::from_tcp_stream(stream)
    }

    #[test]
    fn routes_l_to_lwps_and_g_to_http() {
        assert_eq!(detect(&mut transport_with(b"Lrest")).unwrap(), Protocol::Lwps);
        assert_eq!(detect(&mut transport_with(b"GET /x")).unwrap(), Protocol::Http);
    }

    #[test]
    fn rejects_unknown_lead_byte() {
        let err = detect(&mut transport_with(b"XYZ")).unwrap_err();
        assert!(matches!(err, DispatchError::Unrecognized(b'X')));
    }
}
