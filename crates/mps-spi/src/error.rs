// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// The numeric wire code carried by LWPS error frames and referenced by HTTP
/// error bodies. Values for genuine SPI failures are taken verbatim from the
/// original `spi.h` (`SPI_InvalidSession = -200` .. `SPI_GetIndexNameFailed =
/// -660`); infrastructure and admission codes have no `spi.h` counterpart and
/// were assigned a separate range for this port (see DESIGN.md).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SpiError {
    #[error("out of memory")]
    Memory = -100,
    #[error("invalid parameter")]
    Parameter = -101,
    #[error("invalid return parameter")]
    ReturnParameter = -102,
    #[error("miscellaneous failure")]
    Misc = -103,

    #[error("one-minute load average exceeded the configured maximum for this operation class")]
    ExceededLoadMaximum = -150,

    #[error("invalid session")]
    InvalidSession = -200,
    #[error("invalid index directory")]
    InvalidIndexDirectory = -201,
    #[error("invalid configuration directory")]
    InvalidConfigurationDirectory = -202,
    #[error("invalid temporary directory")]
    InvalidTemporaryDirectory = -203,
    #[error("failed to initialize server")]
    InitializeServerFailed = -204,
    #[error("failed to shut down server")]
    ShutdownServerFailed = -205,

    #[error("invalid index")]
    InvalidIndex = -300,
    #[error("invalid index name")]
    InvalidIndexName = -301,
    #[error("failed to open index")]
    OpenIndexFailed = -302,
    #[error("failed to close index")]
    CloseIndexFailed = -303,

    #[error("invalid language code")]
    InvalidLanguageCode = -400,
    #[error("invalid search text")]
    InvalidSearchText = -401,
    #[error("invalid positive feedback text")]
    InvalidPositiveFeedbackText = -402,
    #[error("invalid negative feedback text")]
    InvalidNegativeFeedbackText = -403,
    #[error("invalid search results range")]
    InvalidSearchResultsRange = -404,
    #[error("search failed")]
    SearchIndexFailed = -405,

    #[error("invalid document key")]
    InvalidDocumentKey = -501,
    #[error("invalid item name")]
    InvalidItemName = -502,
    #[error("invalid mime type")]
    InvalidMimeType = -503,
    #[error("invalid chunk type")]
    InvalidChunkType = -504,
    #[error("invalid chunk range")]
    InvalidChunkRange = -505,
    #[error("retrieval failed")]
    RetrieveDocumentFailed = -506,

    #[error("failed to get server info")]
    GetServerInfoFailed = -600,
    #[error("failed to get server index info")]
    GetServerIndexInfoFailed = -610,
    #[error("failed to get index info")]
    GetIndexInfoFailed = -620,
    #[error("failed to get index field info")]
    GetIndexFieldInfoFailed = -630,
    #[error("invalid term match type")]
    InvalidTermMatch = -640,
    #[error("invalid term case type")]
    InvalidTermCase = -641,
    #[error("invalid term")]
    InvalidTerm = -642,
    #[error("invalid field name")]
    InvalidFieldName = -643,
    #[error("failed to get index term info")]
    GetIndexTermInfoFailed = -644,
    #[error("failed to get document info")]
    GetDocumentInfoFailed = -650,
    #[error("failed to get index name")]
    GetIndexNameFailed = -660,
}

impl SpiError {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<SpiError> {
        use SpiError::*;
        // `spi.h`'s SPI_ERROR_VALID range check, widened to cover this
        // port's infrastructure/admission codes.
        let all = [
            Memory,
            Parameter,
            ReturnParameter,
            Misc,
            ExceededLoadMaximum,
            InvalidSession,
            InvalidIndexDirectory,
            InvalidConfigurationDirectory,
            InvalidTemporaryDirectory,
            InitializeServerFailed,
            ShutdownServerFailed,
            InvalidIndex,
            InvalidIndexName,
            OpenIndexFailed,
            CloseIndexFailed,
            InvalidLanguageCode,
            InvalidSearchText,
            InvalidPositiveFeedbackText,
            InvalidNegativeFeedbackText,
            InvalidSearchResultsRange,
            SearchIndexFailed,
            InvalidDocumentKey,
            InvalidItemName,
            InvalidMimeType,
            InvalidChunkType,
            InvalidChunkRange,
            RetrieveDocumentFailed,
            GetServerInfoFailed,
            GetServerIndexInfoFailed,
            GetIndexInfoFailed,
            GetIndexFieldInfoFailed,
            InvalidTermMatch,
            InvalidTermCase,
            InvalidTerm,
            InvalidFieldName,
            GetIndexTermInfoFailed,
            GetDocumentInfoFailed,
            GetIndexNameFailed,
        ];
        all.into_iter().find(|e| e.code() == code)
    }

    /// The `GetErrorText` SPI operation: a human-readable description
    /// suitable for an LWPS error frame or an HTTP error body.
    pub fn message(self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_through_from_code() {
        for code in [-100, -150, -200, -301, -405, -506, -660] {
            let err = SpiError::from_code(code).expect("known code");
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert!(SpiError::from_code(1).is_none());
    }
}
