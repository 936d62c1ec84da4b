// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The HTTP/text protocol (C4): `GET`-only request decoding and
//! RSS/XML/object-notation/raw response encoding. `mps-server` drives the
//! SPI and admission control; this crate only understands the wire.

pub mod error;
pub mod escape;
pub mod format;
pub mod path;
pub mod query;
pub mod request;
pub mod response;

pub use error::HttpError;
pub use path::{HttpOperation, ResponseFormat};
pub use request::{read_request, RawRequest};

/// Peeks one byte without consuming, the operation the protocol dispatcher
/// (C5) uses to recognize `'G'` (from `GET`) and route here.
pub const PROTOCOL_LEAD_BYTE: u8 = b'G';

/// Parses a freshly-accepted connection's request line and query string
/// into a typed operation. Combines `request::read_request` and
/// `path::parse` the way the session handler (C6) needs them in sequence.
pub fn decode_request(transport: &mut mps_net::Transport) -> Result<HttpOperation, HttpError> {
    let raw = request::read_request(transport)?;
    path::parse(&raw.path, &raw.query)
}
