// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! LWPS message types. The byte layout of the original `lwps.c`/`lwps.h` is
//! not available to this port (§9 Open Question), so the frame format is
//! redesigned from scratch; only the message-ID / field-set / reference-ID
//! invariants of spec §4.3 are preserved.

use serde::{Deserialize, Serialize};

use mps_spi::{
    info::{DocumentInfo, FieldInfo, IndexInfo, ServerIndexInfo, ServerInfo, TermCase, TermInfo, TermMatch},
    ChunkType, SearchResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Init {
        username: String,
        password: String,
        reference_id: String,
    },
    Search {
        indices: Vec<String>,
        language: Option<String>,
        query: String,
        positive_feedback: Option<String>,
        negative_feedback: Option<String>,
        start: u64,
        end: u64,
        reference_id: String,
    },
    Retrieval {
        index: String,
        document_key: String,
        item_name: String,
        mime_type: String,
        chunk_type: ChunkType,
        chunk_start: u32,
        chunk_end: u32,
        reference_id: String,
    },
    ServerInfo {
        reference_id: String,
    },
    ServerIndexInfo {
        reference_id: String,
    },
    IndexInfo {
        index: String,
        reference_id: String,
    },
    IndexFieldInfo {
        index: String,
        reference_id: String,
    },
    IndexTermInfo {
        index: String,
        term_match: TermMatch,
        term_case: TermCase,
        term: Option<String>,
        field_name: Option<String>,
        reference_id: String,
    },
    DocumentInfo {
        index: String,
        document_key: String,
        reference_id: String,
    },
}

impl Request {
    pub fn reference_id(&self) -> &str {
        match self {
            Request::Init { reference_id, .. }
            | Request::Search { reference_id, .. }
            | Request::Retrieval { reference_id, .. }
            | Request::ServerInfo { reference_id }
            | Request::ServerIndexInfo { reference_id }
            | Request::IndexInfo { reference_id, .. }
            | Request::IndexFieldInfo { reference_id, .. }
            | Request::IndexTermInfo { reference_id, .. }
            | Request::DocumentInfo { reference_id, .. } => reference_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Init {
        reference_id: String,
    },
    Search {
        response: SearchResponse,
        reference_id: String,
    },
    Retrieval {
        data: Vec<u8>,
        reference_id: String,
    },
    ServerInfo {
        info: ServerInfo,
        reference_id: String,
    },
    ServerIndexInfo {
        infos: Vec<ServerIndexInfo>,
        reference_id: String,
    },
    IndexInfo {
        info: IndexInfo,
        reference_id: String,
    },
    IndexFieldInfo {
        infos: Vec<FieldInfo>,
        reference_id: String,
    },
    IndexTermInfo {
        infos: Vec<TermInfo>,
        reference_id: String,
    },
    DocumentInfo {
        info: DocumentInfo,
        reference_id: String,
    },
    /// `code` is a `SpiError`/admission wire code; kept as a bare `i32` here
    /// so `mps-lwps` does not need to depend on `mps-spi`'s error enum
    /// staying binary-compatible across versions.
    Error {
        code: i32,
        description: String,
        reference_id: String,
    },
}

impl Response {
    pub fn reference_id(&self) -> &str {
        match self {
            Response::Init { reference_id }
            | Response::Search { reference_id, .. }
            | Response::Retrieval { reference_id, .. }
            | Response::ServerInfo { reference_id, .. }
            | Response::ServerIndexInfo { reference_id, .. }
            | Response::IndexInfo { reference_id, .. }
            | Response::IndexFieldInfo { reference_id, .. }
            | Response::IndexTermInfo { reference_id, .. }
            | Response::DocumentInfo { reference_id, .. }
            | Response::Error { reference_id, .. } => reference_id,
        }
    }

    pub fn error(code: i32, description: impl Into<String>, reference_id: impl Into<String>) -> Response {
        Response::Error {
            code,
            description: description.into(),
            reference_id: reference_id.into(),
        }
    }
}
