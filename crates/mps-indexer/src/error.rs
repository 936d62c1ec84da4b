// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("failed to read index stream: {0}")]
    StreamRead(#[source] std::io::Error),
    #[error("malformed index stream record at line {line}: {source}")]
    StreamParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("index stream exceeded the configured memory budget of {limit_mb} MB")]
    MemoryBudgetExceeded { limit_mb: u64 },
    #[error("document record before any meta record lacked a required field: {0}")]
    InvalidDocument(String),
    #[error("failed to read stopword file {path}: {source}")]
    StopFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write index directory: {0}")]
    WriteIndex(#[source] std::io::Error),
    #[error("failed to serialize index: {0}")]
    Serialize(#[source] serde_json::Error),
}
