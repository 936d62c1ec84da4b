// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A reference `SearchProvider` (§4.2) backed by plain JSON files on disk,
//! used by `bin/mps-search-server`'s default configuration and by
//! `mps-server`'s own integration tests. This is deliberately not the real
//! storage engine the SPI boundary insulates the core from (§1) — it
//! exists to make the server runnable end to end against the output of
//! `mps-indexer` without pulling in an external engine.

pub mod format;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use mps_spi::{
    ChunkType, DocumentInfo, DocumentItem, FieldInfo, IndexInfo, SearchProvider, SearchResponse,
    SearchResult, ServerIndexInfo, ServerInfo, Session, SortKey, SortType, SpiError, SpiResult,
    TermCase, TermInfo, TermMatch,
};

use format::{documents_path, meta_path, StoredDocument, StoredMeta};

/// One index's documents and descriptor, loaded once and cached for the
/// lifetime of the provider.
#[derive(Debug)]
pub struct LoadedIndex {
    pub name: String,
    pub meta: StoredMeta,
    pub documents: Vec<StoredDocument>,
}

impl LoadedIndex {
    fn load(index_dir: &Path, name: &str) -> SpiResult<LoadedIndex> {
        let meta: StoredMeta = match std::fs::read_to_string(meta_path(index_dir)) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|_| SpiError::OpenIndexFailed)?,
            Err(_) => StoredMeta::default(),
        };
        let documents_raw =
            std::fs::read_to_string(documents_path(index_dir)).map_err(|_| SpiError::OpenIndexFailed)?;
        let documents: Vec<StoredDocument> =
            serde_json::from_str(&documents_raw).map_err(|_| SpiError::OpenIndexFailed)?;
        Ok(LoadedIndex {
            name: name.to_string(),
            meta,
            documents,
        })
    }

    fn find(&self, document_key: &str) -> Option<&StoredDocument> {
        self.documents.iter().find(|d| d.document_key == document_key)
    }

    fn unique_term_count(&self) -> u64 {
        let mut terms = std::collections::HashSet::new();
        for doc in &self.documents {
            for term in tokenize(&doc.text) {
                terms.insert(term);
            }
        }
        terms.len() as u64
    }

    fn total_term_count(&self) -> u64 {
        self.documents.iter().map(|d| tokenize(&d.text).count() as u64).sum()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}

/// Matches `term` against a tokenized `field` per §4.4's `/IndexTermInfo`
/// `termMatch` selector. `Regex`/`Soundex`/`Metaphone`/`Phonix`/`Typo` all
/// fall back to a substring match — this provider is a reference
/// implementation, not a linguistic engine.
fn term_matches(mode: TermMatch, case: TermCase, candidate: &str, pattern: &str) -> bool {
    let (candidate, pattern) = match case {
        TermCase::Sensitive => (candidate.to_string(), pattern.to_string()),
        TermCase::Insensitive => (candidate.to_lowercase(), pattern.to_lowercase()),
    };
    match mode {
        TermMatch::Regular => candidate == pattern,
        TermMatch::Wildcard => wildcard_match(&pattern, &candidate),
        _ => candidate.contains(pattern.as_str()),
    }
}

fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        (Some(rest), _) if pattern.ends_with('*') => candidate.contains(&rest[..rest.len() - 1]),
        (Some(rest), _) => candidate.ends_with(rest),
        (None, Some(rest)) => candidate.starts_with(rest),
        (None, None) => candidate == pattern,
    }
}

/// The reference `SearchProvider`: loads and caches one `LoadedIndex` per
/// distinct index name the first time it's opened.
#[derive(Default)]
pub struct MemoryProvider {
    cache: Mutex<HashMap<String, Arc<LoadedIndex>>>,
}

impl MemoryProvider {
    pub fn new() -> MemoryProvider {
        MemoryProvider::default()
    }

    fn index_dir(session: &Session, name: &str) -> PathBuf {
        session.index_root.join(name)
    }
}

impl SearchProvider for MemoryProvider {
    type Index = Arc<LoadedIndex>;

    fn initialize_server(&self, session: &Session) -> SpiResult<()> {
        if !session.index_root.is_dir() {
            return Err(SpiError::InvalidIndexDirectory);
        }
        Ok(())
    }

    fn shutdown_server(&self, _session: &Session) -> SpiResult<()> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }

    fn open_index(&self, session: &Session, index_name: &str) -> SpiResult<Arc<LoadedIndex>> {
        if index_name.is_empty() || index_name.contains(['/', '\\']) {
            return Err(SpiError::InvalidIndexName);
        }
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(loaded) = cache.get(index_name) {
            tracing::debug!(index = index_name, "open_index cache hit");
            return Ok(Arc::clone(loaded));
        }
        let dir = Self::index_dir(session, index_name);
        if !dir.is_dir() {
            return Err(SpiError::InvalidIndexName);
        }
        let loaded = Arc::new(LoadedIndex::load(&dir, index_name)?);
        tracing::info!(index = index_name, documents = loaded.documents.len(), "loaded index from disk");
        cache.insert(index_name.to_string(), Arc::clone(&loaded));
        Ok(loaded)
    }

    fn close_index(&self, _session: &Session, _index: &Arc<LoadedIndex>) -> SpiResult<()> {
        Ok(())
    }

    fn search_index(
        &self,
        _session: &Session,
        indices: &[Arc<LoadedIndex>],
        language_code: Option<&str>,
        search_text: &str,
        _positive_feedback_text: Option<&str>,
        _negative_feedback_text: Option<&str>,
        start_index: u64,
        end_index: u64,
    ) -> SpiResult<SearchResponse> {
        if start_index > end_index {
            return Err(SpiError::InvalidSearchResultsRange);
        }
        let started = Instant::now();
        let query_terms: Vec<String> = tokenize(search_text).collect();

        let mut scored: Vec<(f64, &Arc<LoadedIndex>, &StoredDocument)> = Vec::new();
        for index in indices {
            for doc in &index.documents {
                if let Some(lang) = language_code {
                    if doc.language_code.as_deref().is_some_and(|l| l != lang) {
                        continue;
                    }
                }
                let score = if query_terms.is_empty() {
                    1.0
                } else {
                    let haystack: std::collections::HashSet<String> =
                        tokenize(&doc.title).chain(tokenize(&doc.text)).collect();
                    query_terms.iter().filter(|t| haystack.contains(t.as_str())).count() as f64
                };
                if score > 0.0 {
                    scored.push((score, index, doc));
                }
            }
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let total = scored.len() as u64;
        let max_sort_key = scored.first().map(|(score, ..)| SortKey::Double(*score));

        let window_start = (start_index as usize).min(scored.len());
        let window_end = if total == 0 {
            0
        } else {
            (end_index as usize).min(scored.len().saturating_sub(1))
        };
        let windowed = if window_start <= window_end && window_start < scored.len() {
            &scored[window_start..=window_end]
        } else {
            &[]
        };

        let results = windowed
            .iter()
            .map(|(score, index, doc)| SearchResult {
                index_name: index.name.clone(),
                document_key: doc.document_key.clone(),
                title: doc.title.clone(),
                language: doc.language_code.clone(),
                sort_key: SortKey::Double(*score),
                rank: (*score * 100.0) as u32,
                term_count: tokenize(&doc.text).count() as u32,
                ansi_date: doc.ansi_date,
                items: doc
                    .items
                    .iter()
                    .map(|item| DocumentItem {
                        item_name: item.item_name.clone(),
                        mime_type: item.mime_type.clone(),
                        length: item.data.as_ref().map(|d| d.len() as u64).unwrap_or(0),
                        url: item.url.clone(),
                        data: None,
                    })
                    .collect(),
            })
            .collect();

        Ok(SearchResponse {
            results,
            total_results: total,
            start_index,
            end_index: window_end as u64,
            sort_type: SortType::DoubleDesc,
            max_sort_key,
            search_time_seconds: started.elapsed().as_secs_f64(),
        })
    }

    fn retrieve_document(
        &self,
        _session: &Session,
        index: &Arc<LoadedIndex>,
        document_key: &str,
        item_name: &str,
        mime_type: &str,
        chunk_type: ChunkType,
        chunk_start: u32,
        chunk_end: u32,
    ) -> SpiResult<Vec<u8>> {
        let doc = index.find(document_key).ok_or(SpiError::InvalidDocumentKey)?;
        let item = doc
            .items
            .iter()
            .find(|i| i.item_name == item_name && i.mime_type == mime_type)
            .ok_or(SpiError::InvalidItemName)?;
        let bytes = item.data.as_ref().map(|b| b.to_vec()).unwrap_or_default();
        match chunk_type {
            ChunkType::Byte => {
                let start = (chunk_start as usize).min(bytes.len());
                let end = (chunk_end as usize).min(bytes.len()).max(start);
                Ok(bytes[start..end].to_vec())
            }
            ChunkType::Document | ChunkType::Unknown => Ok(bytes),
        }
    }

    fn get_server_info(&self, _session: &Session) -> SpiResult<ServerInfo> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        Ok(ServerInfo {
            name: Some("mps-search-server".to_string()),
            description: Some("Reference in-memory search server".to_string()),
            admin_name: None,
            admin_email: None,
            index_count: Some(cache.len() as u32),
            ranking_algorithm: Some("term-overlap".to_string()),
            weight_minimum: 0.0,
            weight_maximum: 1.0,
        })
    }

    fn get_server_index_info(&self, session: &Session) -> SpiResult<Vec<ServerIndexInfo>> {
        let mut infos = Vec::new();
        let entries = std::fs::read_dir(&session.index_root).map_err(|_| SpiError::InvalidIndexDirectory)?;
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let description = std::fs::read_to_string(meta_path(&entry.path()))
                .ok()
                .and_then(|raw| serde_json::from_str::<StoredMeta>(&raw).ok())
                .and_then(|m| m.description);
            infos.push(ServerIndexInfo { name, description });
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    fn get_index_info(&self, _session: &Session, index: &Arc<LoadedIndex>) -> SpiResult<IndexInfo> {
        Ok(IndexInfo {
            name: index.name.clone(),
            description: index.meta.description.clone(),
            language_code: index.meta.language_code.clone(),
            tokenizer_name: index.meta.tokenizer_name.clone(),
            stemmer_name: index.meta.stemmer_name.clone(),
            stop_list_name: index.meta.stop_list_name.clone(),
            document_count: Some(index.documents.len() as u32),
            unique_term_count: Some(index.unique_term_count()),
            total_term_count: Some(index.total_term_count()),
            unique_stop_term_count: None,
            total_stop_term_count: None,
            access_control: index.meta.access_control.into(),
            update_frequency: index.meta.update_frequency.into(),
            last_update_ansi_date: index.meta.last_update_ansi_date,
            case_sensitive: index.meta.case_sensitive,
        })
    }

    fn get_index_field_info(&self, _session: &Session, _index: &Arc<LoadedIndex>) -> SpiResult<Vec<FieldInfo>> {
        Ok(vec![
            FieldInfo {
                name: "title".to_string(),
                description: Some("document title".to_string()),
                field_type: None,
            },
            FieldInfo {
                name: "text".to_string(),
                description: Some("document body".to_string()),
                field_type: None,
            },
        ])
    }

    fn get_index_term_info(
        &self,
        _session: &Session,
        index: &Arc<LoadedIndex>,
        term_match: TermMatch,
        term_case: TermCase,
        term: Option<&str>,
        _field_name: Option<&str>,
    ) -> SpiResult<Vec<TermInfo>> {
        if let Some(pattern) = term {
            if pattern.is_empty() {
                return Err(SpiError::InvalidTerm);
            }
        }

        let mut counts: HashMap<String, (u32, std::collections::HashSet<&str>)> = HashMap::new();
        for doc in &index.documents {
            for t in tokenize(&doc.text) {
                let entry = counts.entry(t).or_insert((0, std::collections::HashSet::new()));
                entry.0 += 1;
                entry.1.insert(doc.document_key.as_str());
            }
        }

        let mut terms: Vec<TermInfo> = counts
            .into_iter()
            .filter(|(t, _)| match term {
                Some(pattern) => term_matches(term_match, term_case, t, pattern),
                None => true,
            })
            .map(|(t, (count, docs))| TermInfo {
                term: t,
                term_type: term_match,
                count: Some(count),
                document_count: Some(docs.len() as u32),
            })
            .collect();
        terms.sort_by(|a, b| a.term.cmp(&b.term));
        Ok(terms)
    }

    fn get_document_info(
        &self,
        _session: &Session,
        index: &Arc<LoadedIndex>,
        document_key: &str,
    ) -> SpiResult<DocumentInfo> {
        let doc = index.find(document_key).ok_or(SpiError::InvalidDocumentKey)?;
        Ok(DocumentInfo {
            index_name: index.name.clone(),
            document_key: doc.document_key.clone(),
            title: doc.title.clone(),
            language_code: doc.language_code.clone(),
            rank: None,
            term_count: Some(tokenize(&doc.text).count() as u32),
            ansi_date: Some(doc.ansi_date as u64),
            items: doc
                .items
                .iter()
                .map(|item| DocumentItem {
                    item_name: item.item_name.clone(),
                    mime_type: item.mime_type.clone(),
                    length: item.data.as_ref().map(|d| d.len() as u64).unwrap_or(0),
                    url: item.url.clone(),
                    data: None,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use format::{StoredItem, DOCUMENTS_FILE_NAME, META_FILE_NAME};

    fn write_fixture_index(root: &Path, name: &str, docs: &[StoredDocument]) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(META_FILE_NAME),
            serde_json::to_string(&StoredMeta::default()).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.join(DOCUMENTS_FILE_NAME), serde_json::to_string(docs).unwrap()).unwrap();
    }

    fn doc(key: &str, title: &str, text: &str) -> StoredDocument {
        StoredDocument {
            document_key: key.to_string(),
            title: title.to_string(),
            language_code: Some("en".to_string()),
            ansi_date: 20260101,
            text: text.to_string(),
            items: vec![StoredItem {
                item_name: "document".to_string(),
                mime_type: "text/plain".to_string(),
                url: None,
                data: Some(serde_bytes::ByteBuf::from(text.as_bytes().to_vec())),
            }],
        }
    }

    #[test]
    fn open_index_caches_across_calls() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture_index(tmp.path(), "test", &[doc("k1", "Hello", "hello world")]);
        let provider = MemoryProvider::new();
        let session = Session {
            index_root: tmp.path().to_path_buf(),
            configuration_path: tmp.path().to_path_buf(),
            temporary_path: tmp.path().to_path_buf(),
        };
        let first = provider.open_index(&session, "test").unwrap();
        let second = provider.open_index(&session, "test").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn search_ranks_by_term_overlap_and_windows_results() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture_index(
            tmp.path(),
            "test",
            &[
                doc("k1", "T1", "hello hello world"),
                doc("k2", "T2", "hello"),
                doc("k3", "T3", "nothing relevant here"),
            ],
        );
        let provider = MemoryProvider::new();
        let session = Session {
            index_root: tmp.path().to_path_buf(),
            configuration_path: tmp.path().to_path_buf(),
            temporary_path: tmp.path().to_path_buf(),
        };
        let index = provider.open_index(&session, "test").unwrap();
        let response = provider
            .search_index(&session, &[index], None, "hello world", None, None, 0, 0)
            .unwrap();
        assert_eq!(response.total_results, 2);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].document_key, "k1");
        assert!(response.sort_keys_consistent());
    }

    #[test]
    fn retrieve_document_returns_item_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture_index(tmp.path(), "test", &[doc("k1", "T1", "hello world")]);
        let provider = MemoryProvider::new();
        let session = Session {
            index_root: tmp.path().to_path_buf(),
            configuration_path: tmp.path().to_path_buf(),
            temporary_path: tmp.path().to_path_buf(),
        };
        let index = provider.open_index(&session, "test").unwrap();
        let bytes = provider
            .retrieve_document(&session, &index, "k1", "document", "text/plain", ChunkType::Unknown, 0, 0)
            .unwrap();
        assert_eq!(bytes, b"hello world");
    }

    #[test]
    fn unknown_index_name_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = MemoryProvider::new();
        let session = Session {
            index_root: tmp.path().to_path_buf(),
            configuration_path: tmp.path().to_path_buf(),
            temporary_path: tmp.path().to_path_buf(),
        };
        let err = provider.open_index(&session, "missing").unwrap_err();
        assert_eq!(err, SpiError::InvalidIndexName);
    }
}
