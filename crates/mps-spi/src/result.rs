// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;

use crate::sort::{SortKey, SortType};

/// The well-known item name carrying a provider-emitted search report,
/// verbatim from `spi.h`'s `SPI_SEARCH_REPORT_ITEM_NAME`.
pub const SEARCH_REPORT_ITEM_NAME: &str = "document";
/// `spi.h`'s `SPI_SEARCH_REPORT_MIME_TYPE`.
pub const SEARCH_REPORT_MIME_TYPE: &str = "application/x-mps-search-report";
/// `spi.h`'s `SPI_SEARCH_REPORT_TITLE` / `SPI_SEARCH_REPORT_LANGUAGE_NAME`.
pub const SEARCH_REPORT_TITLE: &str = "Report for this search";
pub const SEARCH_REPORT_LANGUAGE_NAME: &str = "en";

/// One document item attached to a search result: a named, MIME-typed piece
/// of the document (e.g. its title text, a thumbnail, or the search report).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocumentItem {
    pub item_name: String,
    pub mime_type: String,
    pub length: u64,
    pub url: Option<String>,
    /// Inline payload; per §4.4 only the first item of a result carries
    /// this on the wire even if the provider supplies more.
    pub data: Option<Bytes>,
}

impl DocumentItem {
    pub fn is_search_report(&self) -> bool {
        self.item_name == SEARCH_REPORT_ITEM_NAME && self.mime_type == SEARCH_REPORT_MIME_TYPE
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub index_name: String,
    pub document_key: String,
    pub title: String,
    pub language: Option<String>,
    pub sort_key: SortKey,
    pub rank: u32,
    pub term_count: u32,
    /// YYYYMMDD, carried opaquely; the core never interprets it.
    pub ansi_date: u32,
    pub items: Vec<DocumentItem>,
}

impl SearchResult {
    pub fn has_search_report(&self) -> bool {
        self.items.iter().any(DocumentItem::is_search_report)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_results: u64,
    /// Inclusive start/end indices into the logical result space.
    pub start_index: u64,
    pub end_index: u64,
    pub sort_type: SortType,
    pub max_sort_key: Option<SortKey>,
    pub search_time_seconds: f64,
}

impl SearchResponse {
    /// §8 invariant 5: every result's sort-key variant matches the
    /// response's sort type.
    pub fn sort_keys_consistent(&self) -> bool {
        self.results
            .iter()
            .all(|r| self.sort_type.matches(&r.sort_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_search_report_item() {
        let item = DocumentItem {
            item_name: SEARCH_REPORT_ITEM_NAME.to_string(),
            mime_type: SEARCH_REPORT_MIME_TYPE.to_string(),
            length: 0,
            url: None,
            data: None,
        };
        assert!(item.is_search_report());
    }

    #[test]
    fn sort_keys_consistent_detects_mismatch() {
        let mut resp = SearchResponse {
            results: vec![SearchResult {
                index_name: "idx".into(),
                document_key: "k1".into(),
                title: "T".into(),
                language: None,
                sort_key: SortKey::Double(0.5),
                rank: 0,
                term_count: 0,
                ansi_date: 20260101,
                items: vec![],
            }],
            total_results: 1,
            start_index: 0,
            end_index: 0,
            sort_type: SortType::DoubleDesc,
            max_sort_key: None,
            search_time_seconds: 0.0,
        };
        assert!(resp.sort_keys_consistent());
        resp.sort_type = SortType::U32Asc;
        assert!(!resp.sort_keys_consistent());
    }
}
