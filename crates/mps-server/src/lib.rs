// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The serving core: protocol dispatch (C5), per-request session handling
//! (C6), admission control (C7), lifecycle (C8), and result post-processing
//! (C9). `mps-server` depends only on `mps-net`/`mps-spi`/`mps-lwps`/
//! `mps-http`, never on a concrete `SearchProvider`.

pub mod admission;
pub mod dispatch;
pub mod lifecycle;
pub mod postproc;
pub mod session;
pub mod state;

use mps_net::Transport;
use mps_spi::{SearchProvider, Session};
use thiserror::Error;
use tracing::warn;

use admission::AdmissionController;
use dispatch::{DispatchError, Protocol};

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Lwps(#[from] mps_lwps::LwpsError),
    #[error(transparent)]
    Http(#[from] mps_http::HttpError),
}

/// Handles exactly one fully-accepted connection: detects the protocol,
/// decodes one request, runs it through the session handler, and writes the
/// one response the protocol calls for. Per §4.6 step 4 the caller closes
/// the transport afterward regardless of outcome.
pub fn dispatch_one<P: SearchProvider>(
    transport: &mut Transport,
    provider: &P,
    session: &Session,
    admission: &AdmissionController,
) -> Result<(), ServeError> {
    match dispatch::detect(transport)? {
        Protocol::Lwps => {
            let request = mps_lwps::read_request(transport)?;
            let response = session::handle_lwps_request(provider, session, admission, request);
            mps_lwps::write_response(transport, &response)?;
            Ok(())
        }
        Protocol::Http => {
            let operation = match mps_http::decode_request(transport) {
                Ok(op) => op,
                Err(err) => {
                    mps_http::response::write_error(transport, err.status(), err.reason_phrase(), &err.to_string())?;
                    return Err(err.into());
                }
            };
            session::handle_http_operation(transport, provider, session, admission, operation)?;
            Ok(())
        }
    }
}

/// Logs a dispatch failure at the severity §4.6 step 3 assigns it. The
/// worker loop always continues afterward — only termination and the
/// session-count bound end it.
pub fn log_dispatch_error(err: &ServeError) {
    match err {
        ServeError::Dispatch(DispatchError::Net(mps_net::NetError::TimedOut)) => {
            warn!("accept/read timed out waiting for client data");
        }
        ServeError::Dispatch(DispatchError::Net(mps_net::NetError::Closed)) => {}
        ServeError::Lwps(e) if e.kind() == mps_lwps::LwpsErrorKind::TimedOut => {
            warn!("LWPS read timed out waiting for client data");
        }
        ServeError::Lwps(e) if e.kind() == mps_lwps::LwpsErrorKind::Closed => {}
        other => warn!(error = %other, "request handling failed"),
    }
}
