// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! LWPS: the compact binary request/response protocol between LWPS-aware
//! clients and the MPS server.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{peek_header, read_request, write_response, PROTOCOL_TAG};
pub use error::{LwpsError, LwpsErrorKind};
pub use message::{Request, Response};
