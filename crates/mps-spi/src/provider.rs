// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The Search-Provider Interface (SPI): the narrow contract the server core
//! consumes from a storage engine. Replaces the original's opaque `void *`
//! session/index handles and function-pointer table with a trait, per the
//! "opaque provider pointers across modules" REDESIGN FLAG.

use std::path::PathBuf;

use crate::error::SpiError;
use crate::info::{DocumentInfo, FieldInfo, IndexInfo, ServerIndexInfo, ServerInfo, TermCase, TermInfo, TermMatch};
use crate::result::SearchResponse;

pub type SpiResult<T> = Result<T, SpiError>;

/// Process-wide configuration visible to every handler: immutable after
/// startup, safely shared across threads and forked children.
#[derive(Debug, Clone)]
pub struct Session {
    pub index_root: PathBuf,
    pub configuration_path: PathBuf,
    pub temporary_path: PathBuf,
}

/// What chunk of a document item to retrieve, per `spi.h`'s
/// `SPI_CHUNK_TYPE_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ChunkType {
    #[default]
    Unknown,
    Document,
    Byte,
}

/// The operation set a storage engine exposes to the server core. The core
/// never assumes anything about the provider's internal concurrency: it
/// treats the provider as thread-safe across independent sessions, and
/// serializes calls within one session/thread by construction (one
/// in-flight request per server session, per §4.2).
pub trait SearchProvider: Send + Sync {
    type Index: Clone + std::fmt::Debug + Send + Sync;

    fn initialize_server(&self, session: &Session) -> SpiResult<()>;

    /// Always attempted on worker exit, normal or signal-driven.
    fn shutdown_server(&self, session: &Session) -> SpiResult<()>;

    fn open_index(&self, session: &Session, index_name: &str) -> SpiResult<Self::Index>;

    fn close_index(&self, session: &Session, index: &Self::Index) -> SpiResult<()>;

    #[allow(clippy::too_many_arguments)]
    fn search_index(
        &self,
        session: &Session,
        indices: &[Self::Index],
        language_code: Option<&str>,
        search_text: &str,
        positive_feedback_text: Option<&str>,
        negative_feedback_text: Option<&str>,
        start_index: u64,
        end_index: u64,
    ) -> SpiResult<SearchResponse>;

    #[allow(clippy::too_many_arguments)]
    fn retrieve_document(
        &self,
        session: &Session,
        index: &Self::Index,
        document_key: &str,
        item_name: &str,
        mime_type: &str,
        chunk_type: ChunkType,
        chunk_start: u32,
        chunk_end: u32,
    ) -> SpiResult<Vec<u8>>;

    fn get_server_info(&self, session: &Session) -> SpiResult<ServerInfo>;

    fn get_server_index_info(&self, session: &Session) -> SpiResult<Vec<ServerIndexInfo>>;

    fn get_index_info(&self, session: &Session, index: &Self::Index) -> SpiResult<IndexInfo>;

    fn get_index_field_info(&self, session: &Session, index: &Self::Index) -> SpiResult<Vec<FieldInfo>>;

    fn get_index_term_info(
        &self,
        session: &Session,
        index: &Self::Index,
        term_match: TermMatch,
        term_case: TermCase,
        term: Option<&str>,
        field_name: Option<&str>,
    ) -> SpiResult<Vec<TermInfo>>;

    fn get_document_info(
        &self,
        session: &Session,
        index: &Self::Index,
        document_key: &str,
    ) -> SpiResult<DocumentInfo>;

    /// Folds multiple per-index search-report document bodies into one
    /// human-readable block. Failures here are warnings, not errors (§4.9).
    fn merge_and_format_search_reports(&self, reports: &[Vec<u8>]) -> SpiResult<Vec<u8>> {
        let mut merged = Vec::new();
        for (i, report) in reports.iter().enumerate() {
            if i > 0 {
                merged.extend_from_slice(b"\n---\n");
            }
            merged.extend_from_slice(report);
        }
        Ok(merged)
    }
}
