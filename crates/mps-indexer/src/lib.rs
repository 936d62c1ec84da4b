// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Builds the reference on-disk index format (`mps_spi_memory::format`) from
//! a structured index stream (§6 `mps-indexer-cli`). The original storage
//! engine and its stream grammar are external to this port (§1 Non-goals);
//! this is a thin, original substitute just complete enough to make
//! `bin/mps-search-server` runnable against real indexer output.

pub mod error;
pub mod stream;

use std::collections::HashSet;
use std::io::{BufRead, Read};
use std::path::Path;

use mps_spi_memory::format::{
    documents_path, meta_path, StoredDocument, StoredItem, StoredMeta,
};

use error::IndexerError;
use stream::StreamRecord;

/// Mirrors the indexer CLI's tuning flags (§6): term-length bounds, the
/// stop-list source, and the in-memory size budget before the stream must
/// be flushed to disk.
#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub description: Option<String>,
    pub stoplist_name: Option<String>,
    pub stopfile_path: Option<String>,
    pub stemmer_name: Option<String>,
    pub minimum_term_length: usize,
    pub maximum_term_length: usize,
    pub maximum_memory_mb: u64,
    pub suppress: bool,
}

impl Default for IndexerOptions {
    fn default() -> IndexerOptions {
        IndexerOptions {
            description: None,
            stoplist_name: None,
            stopfile_path: None,
            stemmer_name: None,
            minimum_term_length: 1,
            maximum_term_length: 64,
            maximum_memory_mb: 512,
            suppress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub document_count: u64,
    pub bytes_consumed: u64,
}

/// A short built-in stop list for the names the reference stemmer/stoplist
/// plumbing recognizes without a `--stopfile` override. Real stop lists are
/// the storage engine's concern (§1 Non-goals); this exists so `--stoplist`
/// has an observable effect on a fresh checkout with no extra files.
fn builtin_stoplist(name: &str) -> &'static [&'static str] {
    match name {
        "english" => &[
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is",
            "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with",
        ],
        _ => &[],
    }
}

fn load_stopwords(options: &IndexerOptions) -> Result<HashSet<String>, IndexerError> {
    if let Some(path) = &options.stopfile_path {
        let raw = std::fs::read_to_string(path).map_err(|source| IndexerError::StopFileRead {
            path: path.clone(),
            source,
        })?;
        return Ok(raw.lines().map(|l| l.trim().to_lowercase()).filter(|l| !l.is_empty()).collect());
    }
    if let Some(name) = &options.stoplist_name {
        return Ok(builtin_stoplist(name).iter().map(|s| s.to_string()).collect());
    }
    Ok(HashSet::new())
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}

/// The text an index record contributes to the search term space: the raw
/// item bytes carry the document's real content (read back verbatim on
/// retrieval); this is a filtered, stemmer/stoplist-aware projection used
/// only for scoring.
fn filtered_text(text: &str, stopwords: &HashSet<String>, options: &IndexerOptions) -> String {
    tokenize(text)
        .filter(|t| t.len() >= options.minimum_term_length && t.len() <= options.maximum_term_length)
        .filter(|t| !stopwords.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stream_item_to_stored(item: stream::StreamItem) -> StoredItem {
    StoredItem {
        item_name: item.item_name,
        mime_type: item.mime_type,
        url: item.url,
        data: item.data,
    }
}

/// Reads a newline-delimited index stream from `reader`, applies the
/// configured term filtering, and writes `meta.json` + `documents.json`
/// into `index_dir` (creating it if needed). Returns once the stream is
/// exhausted or the memory budget in `options.maximum_memory_mb` is hit.
pub fn build_index(reader: impl Read, index_dir: &Path, options: &IndexerOptions) -> Result<IndexStats, IndexerError> {
    let stopwords = load_stopwords(options)?;
    let budget_bytes = options.maximum_memory_mb.saturating_mul(1_000_000);

    let mut meta = StoredMeta {
        description: options.description.clone(),
        stemmer_name: options.stemmer_name.clone(),
        stop_list_name: options.stoplist_name.clone(),
        ..StoredMeta::default()
    };
    let mut documents = Vec::new();
    let mut bytes_consumed: u64 = 0;
    let mut last_ansi_date: Option<u64> = None;

    let buffered = std::io::BufReader::new(reader);
    for (line_no, line) in buffered.lines().enumerate() {
        let line = line.map_err(IndexerError::StreamRead)?;
        if line.trim().is_empty() {
            continue;
        }
        bytes_consumed += line.len() as u64;
        if bytes_consumed > budget_bytes {
            return Err(IndexerError::MemoryBudgetExceeded {
                limit_mb: options.maximum_memory_mb,
            });
        }
        let record: StreamRecord = serde_json::from_str(&line).map_err(|source| IndexerError::StreamParse {
            line: line_no + 1,
            source,
        })?;
        match record {
            StreamRecord::Meta { description, language_code } => {
                if meta.description.is_none() {
                    meta.description = description;
                }
                meta.language_code = language_code;
            }
            StreamRecord::Document {
                document_key,
                title,
                language_code,
                ansi_date,
                text,
                items,
            } => {
                if document_key.is_empty() {
                    return Err(IndexerError::InvalidDocument("document_key is empty".to_string()));
                }
                last_ansi_date = Some(last_ansi_date.map_or(ansi_date as u64, |d| d.max(ansi_date as u64)));
                documents.push(StoredDocument {
                    document_key,
                    title,
                    language_code,
                    ansi_date,
                    text: filtered_text(&text, &stopwords, options),
                    items: items.into_iter().map(stream_item_to_stored).collect(),
                });
                if !options.suppress && documents.len() % 1000 == 0 {
                    tracing::info!(documents = documents.len(), "indexing progress");
                }
            }
        }
    }
    meta.last_update_ansi_date = last_ansi_date;

    std::fs::create_dir_all(index_dir).map_err(IndexerError::WriteIndex)?;
    let meta_json = serde_json::to_string_pretty(&meta).map_err(IndexerError::Serialize)?;
    std::fs::write(meta_path(index_dir), meta_json).map_err(IndexerError::WriteIndex)?;
    let documents_json = serde_json::to_string(&documents).map_err(IndexerError::Serialize)?;
    std::fs::write(documents_path(index_dir), documents_json).map_err(IndexerError::WriteIndex)?;

    Ok(IndexStats {
        document_count: documents.len() as u64,
        bytes_consumed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(lines: &[&str]) -> Cursor<Vec<u8>> {
        Cursor::new(lines.join("\n").into_bytes())
    }

    #[test]
    fn builds_index_directory_from_stream() {
        let tmp = tempfile::tempdir().unwrap();
        let index_dir = tmp.path().join("test");
        let input = stream(&[
            r#"{"record":"meta","description":"demo index"}"#,
            r#"{"record":"document","document_key":"k1","title":"Hello","ansi_date":20260101,"text":"Hello world, the quick fox"}"#,
        ]);
        let options = IndexerOptions {
            stoplist_name: Some("english".to_string()),
            ..IndexerOptions::default()
        };
        let stats = build_index(input, &index_dir, &options).unwrap();
        assert_eq!(stats.document_count, 1);

        let documents: Vec<StoredDocument> =
            serde_json::from_str(&std::fs::read_to_string(documents_path(&index_dir)).unwrap()).unwrap();
        assert_eq!(documents.len(), 1);
        assert!(!documents[0].text.contains("the"));
        assert!(documents[0].text.contains("hello"));

        let meta: StoredMeta = serde_json::from_str(&std::fs::read_to_string(meta_path(&index_dir)).unwrap()).unwrap();
        assert_eq!(meta.description.as_deref(), Some("demo index"));
        assert_eq!(meta.last_update_ansi_date, Some(20260101));
    }

    #[test]
    fn empty_document_key_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let input = stream(&[r#"{"record":"document","document_key":"","title":"x","ansi_date":20260101}"#]);
        let err = build_index(input, &tmp.path().join("test"), &IndexerOptions::default()).unwrap_err();
        assert!(matches!(err, IndexerError::InvalidDocument(_)));
    }

    #[test]
    fn memory_budget_is_enforced() {
        let tmp = tempfile::tempdir().unwrap();
        let big_text = "word ".repeat(1000);
        let input = stream(&[&format!(
            r#"{{"record":"document","document_key":"k1","title":"T","ansi_date":20260101,"text":"{big_text}"}}"#
        )]);
        let options = IndexerOptions {
            maximum_memory_mb: 0,
            ..IndexerOptions::default()
        };
        let err = build_index(input, &tmp.path().join("test"), &options).unwrap_err();
        assert!(matches!(err, IndexerError::MemoryBudgetExceeded { .. }));
    }
}
