// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Every variant carries the HTTP status the session handler writes for it,
/// per §4.4's method/line/timeout/failure/admission status table.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("malformed request line")]
    BadRequest,
    #[error("request timed out")]
    Timeout,
    #[error("internal error: {0}")]
    Internal(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("format not implemented")]
    NotImplemented,
}

impl HttpError {
    pub fn status(&self) -> u16 {
        match self {
            HttpError::MethodNotAllowed(_) => 405,
            HttpError::BadRequest => 400,
            HttpError::Timeout => 408,
            HttpError::Internal(_) => 500,
            HttpError::ServiceUnavailable(_) => 503,
            HttpError::NotImplemented => 501,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            HttpError::MethodNotAllowed(_) => "Method Not Allowed",
            HttpError::BadRequest => "Bad Request",
            HttpError::Timeout => "Request Timeout",
            HttpError::Internal(_) => "Internal Server Error",
            HttpError::ServiceUnavailable(_) => "Service Unavailable",
            HttpError::NotImplemented => "Not Implemented",
        }
    }
}

impl From<mps_net::NetError> for HttpError {
    fn from(err: mps_net::NetError) -> Self {
        match err {
            mps_net::NetError::TimedOut => HttpError::Timeout,
            mps_net::NetError::Closed => HttpError::BadRequest,
            mps_net::NetError::Io(e) => HttpError::Internal(e.to_string()),
        }
    }
}
