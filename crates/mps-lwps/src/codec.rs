// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Frame layout: one tag byte (`b'L'`), a 4-byte big-endian length prefix,
//! then a `bincode`-encoded message body. Grounded on
//! `datadog-ipc`'s `transport::blocking` length-delimited-frame pattern,
//! adapted from tokio's async codec to the blocking `mps-net::Transport`.

use mps_net::Transport;

use crate::error::LwpsError;
use crate::message::{Request, Response};

/// First byte of every LWPS frame, matching §4.3/§4.5 (`'L'` routes to this
/// codec in the protocol dispatcher).
pub const PROTOCOL_TAG: u8 = b'L';

/// Generous but bounded, so a corrupt length prefix can't make the server
/// allocate unbounded memory for one frame.
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

fn encode_frame(body: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(body.len() + 5);
    framed.push(PROTOCOL_TAG);
    framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
    framed.extend_from_slice(body);
    framed
}

/// Peeks the protocol tag byte without consuming it, the operation the
/// dispatcher (C5) uses to route to this codec in the first place.
pub fn peek_header(transport: &mut Transport) -> Result<u8, LwpsError> {
    Ok(transport.peek_byte()?)
}

fn read_length_prefixed_body(transport: &mut Transport) -> Result<Vec<u8>, LwpsError> {
    let tag = transport.read_exact(1)?[0];
    if tag != PROTOCOL_TAG {
        return Err(LwpsError::BadTag(tag));
    }
    let len_bytes = transport.read_exact(4)?;
    let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
    if len > MAX_FRAME_LEN {
        return Err(LwpsError::FrameTooLarge {
            max: MAX_FRAME_LEN,
            got: len,
        });
    }
    Ok(transport.read_exact(len as usize)?)
}

pub fn read_request(transport: &mut Transport) -> Result<Request, LwpsError> {
    let body = read_length_prefixed_body(transport)?;
    decode_request(&body)
}

pub fn write_response(transport: &mut Transport, response: &Response) -> Result<(), LwpsError> {
    let frame = encode_frame(&encode_response(response)?);
    transport.write_buffered(&frame);
    transport.send()?;
    Ok(())
}

/// For test-writing LWPS clients and for unit tests: encode a request into a
/// complete frame buffer.
pub fn encode_request_frame(request: &Request) -> Result<Vec<u8>, LwpsError> {
    Ok(encode_frame(&encode_request(request)?))
}

pub fn encode_request(request: &Request) -> Result<Vec<u8>, LwpsError> {
    bincode::serialize(request).map_err(|e| LwpsError::Encode(e.to_string()))
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, LwpsError> {
    bincode::deserialize(bytes).map_err(|e| LwpsError::Decode(e.to_string()))
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>, LwpsError> {
    bincode::serialize(response).map_err(|e| LwpsError::Encode(e.to_string()))
}

pub fn decode_response(bytes: &[u8]) -> Result<Response, LwpsError> {
    bincode::deserialize(bytes).map_err(|e| LwpsError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mps_spi::{SortType, SearchResponse};

    #[test]
    fn request_round_trips_through_encode_decode() {
        let req = Request::Init {
            username: "u".into(),
            password: "p".into(),
            reference_id: "r42".into(),
        };
        let bytes = encode_request(&req).unwrap();
        let decoded = decode_request(&bytes).unwrap();
        match decoded {
            Request::Init { username, password, reference_id } => {
                assert_eq!(username, "u");
                assert_eq!(password, "p");
                assert_eq!(reference_id, "r42");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn search_response_round_trips() {
        let resp = Response::Search {
            response: SearchResponse {
                results: vec![],
                total_results: 0,
                start_index: 0,
                end_index: 0,
                sort_type: SortType::NoSort,
                max_sort_key: None,
                search_time_seconds: 0.01,
            },
            reference_id: "abc".into(),
        };
        let bytes = encode_response(&resp).unwrap();
        let decoded = decode_response(&bytes).unwrap();
        assert_eq!(decoded.reference_id(), "abc");
    }

    #[test]
    fn frame_prefixes_tag_and_length() {
        let req = Request::ServerInfo {
            reference_id: "x".into(),
        };
        let frame = encode_request_frame(&req).unwrap();
        assert_eq!(frame[0], PROTOCOL_TAG);
        let len = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        assert_eq!(len as usize, frame.len() - 5);
    }
}
