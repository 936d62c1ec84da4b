// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The Search-Provider Interface (SPI) boundary: the operation contracts,
//! error codes, and data model the MPS server core consumes from a storage
//! engine. The core depends only on this crate, never on a concrete
//! provider implementation.

pub mod error;
pub mod info;
pub mod provider;
pub mod result;
pub mod sort;

pub use error::SpiError;
pub use info::{
    DocumentInfo, FieldInfo, IndexAccess, IndexInfo, IndexUpdateFrequency, ServerIndexInfo,
    ServerInfo, TermCase, TermInfo, TermMatch,
};
pub use provider::{ChunkType, SearchProvider, Session, SpiResult};
pub use result::{DocumentItem, SearchResponse, SearchResult};
pub use sort::{compare_keys, SortKey, SortType};
