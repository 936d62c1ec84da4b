// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The recognized-paths table from §4.4: which query variables each path
//! requires, and the typed operation each resolves to. `mps-server` matches
//! on `HttpOperation` and drives the SPI; this module only validates and
//! structures the query string.

use mps_spi::{TermCase, TermMatch};

use crate::error::HttpError;
use crate::query;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Rss,
    Xml,
    Json,
    Ruby,
    Python,
    Raw,
    /// Recognized but unimplemented; §9's Open Question resolves this to a
    /// reserved slot that always yields `501`.
    Mxg,
}

impl ResponseFormat {
    pub fn parse(s: &str) -> Option<ResponseFormat> {
        Some(match s {
            "rss" => ResponseFormat::Rss,
            "xml" => ResponseFormat::Xml,
            "json" => ResponseFormat::Json,
            "ruby" => ResponseFormat::Ruby,
            "python" => ResponseFormat::Python,
            "raw" => ResponseFormat::Raw,
            "mxg" => ResponseFormat::Mxg,
            _ => return None,
        })
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ResponseFormat::Rss => "application/rss+xml",
            ResponseFormat::Xml => "text/xml",
            ResponseFormat::Json => "text/x-json",
            ResponseFormat::Ruby => "text/x-ruby",
            ResponseFormat::Python => "text/x-python",
            // Raw's real content-type comes from the retrieved item's own
            // MIME type; this is only a placeholder never actually sent.
            ResponseFormat::Raw => "application/octet-stream",
            ResponseFormat::Mxg => "application/octet-stream",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    None,
    Raw,
    Formatted,
}

impl ReportMode {
    fn parse(s: &str) -> Option<ReportMode> {
        Some(match s {
            "none" => ReportMode::None,
            "raw" => ReportMode::Raw,
            "formatted" => ReportMode::Formatted,
            _ => return None,
        })
    }
}

/// RSS-only, comma-separated: `mps` and/or `opensearch` toggle additive
/// namespace declarations and extra elements. Both default off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extensions {
    pub mps: bool,
    pub opensearch: bool,
}

impl Extensions {
    fn parse(value: &str) -> Extensions {
        let mut ext = Extensions::default();
        for token in query::split_list(value) {
            match token.as_str() {
                "mps" => ext.mps = true,
                "opensearch" => ext.opensearch = true,
                _ => {}
            }
        }
        ext
    }
}

#[derive(Debug, Clone)]
pub struct SearchIndexRequest {
    pub indexes: Vec<String>,
    pub language: Option<String>,
    pub search: Option<String>,
    pub positive_feedback: Option<String>,
    pub negative_feedback: Option<String>,
    pub start: Option<u64>,
    pub limit: Option<u64>,
    pub report: ReportMode,
    pub format: ResponseFormat,
    pub extensions: Extensions,
}

#[derive(Debug, Clone)]
pub struct RetrieveDocumentRequest {
    pub index: String,
    pub document_key: String,
    pub item_name: String,
    pub mime_type: String,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone)]
pub struct InfoRequest {
    pub format: ResponseFormat,
}

#[derive(Debug, Clone)]
pub struct IndexInfoRequest {
    pub index: String,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone)]
pub struct IndexTermInfoRequest {
    pub index: String,
    pub term_match: TermMatch,
    pub term_case: TermCase,
    pub term: Option<String>,
    pub field: Option<String>,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone)]
pub struct DocumentInfoRequest {
    pub index: String,
    pub document_key: String,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone)]
pub enum HttpOperation {
    SearchIndex(SearchIndexRequest),
    RetrieveDocument(RetrieveDocumentRequest),
    ServerInfo(InfoRequest),
    ServerIndexInfo(InfoRequest),
    IndexInfo(IndexInfoRequest),
    IndexFieldInfo(IndexInfoRequest),
    IndexTermInfo(IndexTermInfoRequest),
    DocumentInfo(DocumentInfoRequest),
}

fn format_or(vars: &std::collections::HashMap<String, String>, default: ResponseFormat) -> Result<ResponseFormat, HttpError> {
    match vars.get("format") {
        Some(raw) => ResponseFormat::parse(raw).ok_or(HttpError::BadRequest),
        None => Ok(default),
    }
}

fn required<'a>(
    vars: &'a std::collections::HashMap<String, String>,
    key: &str,
) -> Result<&'a str, HttpError> {
    vars.get(key).map(String::as_str).filter(|v| !v.is_empty()).ok_or(HttpError::BadRequest)
}

/// Parses `path` + `query` into a typed operation, per §4.4's table.
/// Unrecognized paths are a `400`, matching "malformed lines yield 400"
/// (there being no distinct "not found" status in this protocol).
pub fn parse(path: &str, query: &str) -> Result<HttpOperation, HttpError> {
    let vars = query::parse(query);

    Ok(match path {
        "/SearchIndex" => {
            let indexes = query::split_list(required(&vars, "index")?);
            HttpOperation::SearchIndex(SearchIndexRequest {
                indexes,
                language: vars.get("language").cloned(),
                search: vars.get("search").cloned(),
                positive_feedback: vars.get("positiveFeedback").cloned(),
                negative_feedback: vars.get("negativeFeedback").cloned(),
                start: parse_u64(vars.get("start"))?,
                limit: parse_u64(vars.get("limit"))?,
                report: match vars.get("report") {
                    Some(raw) => ReportMode::parse(raw).ok_or(HttpError::BadRequest)?,
                    None => ReportMode::Formatted,
                },
                format: format_or(&vars, ResponseFormat::Xml)?,
                extensions: vars
                    .get("extensions")
                    .map(|v| Extensions::parse(v))
                    .unwrap_or_default(),
            })
        }
        "/RetrieveDocument" => HttpOperation::RetrieveDocument(RetrieveDocumentRequest {
            index: required(&vars, "index")?.to_string(),
            document_key: required(&vars, "documentKey")?.to_string(),
            item_name: required(&vars, "itemName")?.to_string(),
            mime_type: required(&vars, "mimeType")?.to_string(),
            // Raw is the only format that can carry the retrieved item's
            // actual bytes back verbatim, so it is retrieval's default.
            format: format_or(&vars, ResponseFormat::Raw)?,
        }),
        "/ServerInfo" => HttpOperation::ServerInfo(InfoRequest {
            format: format_or(&vars, ResponseFormat::Xml)?,
        }),
        "/ServerIndexInfo" => HttpOperation::ServerIndexInfo(InfoRequest {
            format: format_or(&vars, ResponseFormat::Xml)?,
        }),
        "/IndexInfo" => HttpOperation::IndexInfo(IndexInfoRequest {
            index: required(&vars, "index")?.to_string(),
            format: format_or(&vars, ResponseFormat::Xml)?,
        }),
        "/IndexFieldInfo" => HttpOperation::IndexFieldInfo(IndexInfoRequest {
            index: required(&vars, "index")?.to_string(),
            format: format_or(&vars, ResponseFormat::Xml)?,
        }),
        "/IndexTermInfo" => HttpOperation::IndexTermInfo(IndexTermInfoRequest {
            index: required(&vars, "index")?.to_string(),
            term_match: match vars.get("termMatch") {
                Some(raw) => TermMatch::parse(raw).ok_or(HttpError::BadRequest)?,
                None => TermMatch::Regular,
            },
            term_case: match vars.get("termCase") {
                Some(raw) => TermCase::parse(raw).ok_or(HttpError::BadRequest)?,
                None => TermCase::Sensitive,
            },
            term: vars.get("term").cloned(),
            field: vars.get("field").cloned(),
            format: format_or(&vars, ResponseFormat::Xml)?,
        }),
        "/DocumentInfo" => HttpOperation::DocumentInfo(DocumentInfoRequest {
            index: required(&vars, "index")?.to_string(),
            document_key: required(&vars, "documentKey")?.to_string(),
            format: format_or(&vars, ResponseFormat::Xml)?,
        }),
        _ => return Err(HttpError::BadRequest),
    })
}

fn parse_u64(raw: Option<&String>) -> Result<Option<u64>, HttpError> {
    match raw {
        None => Ok(None),
        Some(s) => s.parse::<u64>().map(Some).map_err(|_| HttpError::BadRequest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_index_requires_index_and_defaults_format_to_xml() {
        let op = parse("/SearchIndex", "index=test&search=hello").unwrap();
        match op {
            HttpOperation::SearchIndex(req) => {
                assert_eq!(req.indexes, vec!["test"]);
                assert_eq!(req.format, ResponseFormat::Xml);
                assert_eq!(req.report, ReportMode::Formatted);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn search_index_missing_required_index_is_bad_request() {
        let err = parse("/SearchIndex", "search=hello").unwrap_err();
        assert!(matches!(err, HttpError::BadRequest));
    }

    #[test]
    fn retrieve_document_defaults_to_raw() {
        let op = parse(
            "/RetrieveDocument",
            "index=test&documentKey=k1&itemName=document&mimeType=text/plain",
        )
        .unwrap();
        match op {
            HttpOperation::RetrieveDocument(req) => assert_eq!(req.format, ResponseFormat::Raw),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_path_is_bad_request() {
        assert!(matches!(parse("/Nope", ""), Err(HttpError::BadRequest)));
    }
}
