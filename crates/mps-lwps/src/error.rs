// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// `TimedOut` and `Closed` are non-fatal control-flow signals (§4.3): the
/// session loop treats them as "move on", not as reasons to log an error and
/// tear down the connection. Every other variant terminates the session.
#[derive(Debug, Error)]
pub enum LwpsError {
    #[error("timed out waiting for data")]
    TimedOut,
    #[error("peer closed the connection")]
    Closed,
    #[error("unrecognized protocol tag byte {0:#x}")]
    BadTag(u8),
    #[error("frame exceeds maximum length {max} bytes (got {got})")]
    FrameTooLarge { max: u32, got: u32 },
    #[error("failed to decode LWPS message: {0}")]
    Decode(String),
    #[error("failed to encode LWPS message: {0}")]
    Encode(String),
    #[error(transparent)]
    Net(#[from] mps_net::NetError),
}

/// Coarse classification the session handler (C6) switches on, per §4.3's
/// "non-fatal vs everything else" contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LwpsErrorKind {
    TimedOut,
    Closed,
    Fatal,
}

impl LwpsError {
    pub fn kind(&self) -> LwpsErrorKind {
        match self {
            LwpsError::TimedOut => LwpsErrorKind::TimedOut,
            LwpsError::Closed => LwpsErrorKind::Closed,
            LwpsError::Net(mps_net::NetError::TimedOut) => LwpsErrorKind::TimedOut,
            LwpsError::Net(mps_net::NetError::Closed) => LwpsErrorKind::Closed,
            _ => LwpsErrorKind::Fatal,
        }
    }
}
