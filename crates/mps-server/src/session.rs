// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Session handler (C6): per-connection request handling for both wire
//! protocols, plus the open/close index pairing (invariant 2) and the
//! admission/post-processing glue each operation needs.

use mps_net::Transport;
use mps_spi::{Session, SearchProvider, SpiResult};
use mps_http::path::HttpOperation;
use mps_http::{format, response as http_response, HttpError};
use tracing::warn;

use crate::admission::{AdmissionClass, AdmissionController};
use crate::postproc;

/// Opens every named index before entering the per-request work and
/// guarantees each is closed on every return path (success, SPI error, or
/// panic unwind), satisfying invariant 2 without needing a matching
/// `close_index` call at each call site.
struct IndexGuard<'a, P: SearchProvider> {
    provider: &'a P,
    session: &'a Session,
    indices: Vec<P::Index>,
}

impl<'a, P: SearchProvider> Drop for IndexGuard<'a, P> {
    fn drop(&mut self) {
        for index in &self.indices {
            if let Err(err) = self.provider.close_index(self.session, index) {
                warn!(error = %err, "failed to close index");
            }
        }
    }
}

fn open_indices<'a, P: SearchProvider>(
    provider: &'a P,
    session: &'a Session,
    names: &[String],
) -> SpiResult<IndexGuard<'a, P>> {
    let mut indices = Vec::with_capacity(names.len());
    for name in names {
        match provider.open_index(session, name) {
            Ok(index) => indices.push(index),
            Err(err) => {
                for opened in &indices {
                    let _ = provider.close_index(session, opened);
                }
                return Err(err);
            }
        }
    }
    Ok(IndexGuard { provider, session, indices })
}

/// Handles one fully-received LWPS request and returns the response to
/// send. Never fails: provider/admission errors become `Response::Error`
/// frames, per §4.3's error-frame contract.
pub fn handle_lwps_request<P: SearchProvider>(
    provider: &P,
    session: &Session,
    admission: &AdmissionController,
    request: mps_lwps::Request,
) -> mps_lwps::Response {
    use mps_lwps::{Request, Response};

    match request {
        Request::Init { reference_id, .. } => {
            if let Err(err) = admission.check(AdmissionClass::Connection) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            Response::Init { reference_id }
        }

        Request::Search {
            indices,
            language,
            query,
            positive_feedback,
            negative_feedback,
            start,
            end,
            reference_id,
        } => {
            if let Err(err) = admission.check(AdmissionClass::Search) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            let guard = match open_indices(provider, session, &indices) {
                Ok(g) => g,
                Err(err) => return Response::error(err.code(), err.message(), reference_id),
            };
            match provider.search_index(
                session,
                &guard.indices,
                language.as_deref(),
                &query,
                positive_feedback.as_deref(),
                negative_feedback.as_deref(),
                start,
                end,
            ) {
                Err(err) => Response::error(err.code(), err.message(), reference_id),
                Ok(mut response) => {
                    // The provider already windowed `response.results` to
                    // [start,end] before returning it (its own absolute
                    // indexing); splicing again with that same absolute
                    // range here would double-window and, for any start>0,
                    // silently empty the response. Splice the provider's
                    // own output by its local bounds instead — this keeps
                    // splice's search-report-preserving behavior without
                    // re-trimming what the provider already trimmed.
                    let local_end = response.results.len().saturating_sub(1) as u64;
                    response.results = postproc::splice(response.results, 0, local_end);
                    postproc::sort(&mut response.results, response.sort_type);
                    Response::Search { response, reference_id }
                }
            }
        }

        Request::Retrieval {
            index,
            document_key,
            item_name,
            mime_type,
            chunk_type,
            chunk_start,
            chunk_end,
            reference_id,
        } => {
            if let Err(err) = admission.check(AdmissionClass::Retrieval) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&index)) {
                Ok(g) => g,
                Err(err) => return Response::error(err.code(), err.message(), reference_id),
            };
            match provider.retrieve_document(
                session,
                &guard.indices[0],
                &document_key,
                &item_name,
                &mime_type,
                chunk_type,
                chunk_start,
                chunk_end,
            ) {
                Ok(data) => Response::Retrieval { data, reference_id },
                Err(err) => Response::error(err.code(), err.message(), reference_id),
            }
        }

        Request::ServerInfo { reference_id } => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            match provider.get_server_info(session) {
                Ok(info) => Response::ServerInfo { info, reference_id },
                Err(err) => Response::error(err.code(), err.message(), reference_id),
            }
        }

        Request::ServerIndexInfo { reference_id } => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            match provider.get_server_index_info(session) {
                Ok(infos) => Response::ServerIndexInfo { infos, reference_id },
                Err(err) => Response::error(err.code(), err.message(), reference_id),
            }
        }

        Request::IndexInfo { index, reference_id } => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&index)) {
                Ok(g) => g,
                Err(err) => return Response::error(err.code(), err.message(), reference_id),
            };
            match provider.get_index_info(session, &guard.indices[0]) {
                Ok(info) => Response::IndexInfo { info, reference_id },
                Err(err) => Response::error(err.code(), err.message(), reference_id),
            }
        }

        Request::IndexFieldInfo { index, reference_id } => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&index)) {
                Ok(g) => g,
                Err(err) => return Response::error(err.code(), err.message(), reference_id),
            };
            match provider.get_index_field_info(session, &guard.indices[0]) {
                Ok(infos) => Response::IndexFieldInfo { infos, reference_id },
                Err(err) => Response::error(err.code(), err.message(), reference_id),
            }
        }

        Request::IndexTermInfo {
            index,
            term_match,
            term_case,
            term,
            field_name,
            reference_id,
        } => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&index)) {
                Ok(g) => g,
                Err(err) => return Response::error(err.code(), err.message(), reference_id),
            };
            match provider.get_index_term_info(
                session,
                &guard.indices[0],
                term_match,
                term_case,
                term.as_deref(),
                field_name.as_deref(),
            ) {
                Ok(infos) => Response::IndexTermInfo { infos, reference_id },
                Err(err) => Response::error(err.code(), err.message(), reference_id),
            }
        }

        Request::DocumentInfo {
            index,
            document_key,
            reference_id,
        } => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return Response::error(err.spi_error().code(), err.to_string(), reference_id);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&index)) {
                Ok(g) => g,
                Err(err) => return Response::error(err.code(), err.message(), reference_id),
            };
            match provider.get_document_info(session, &guard.indices[0], &document_key) {
                Ok(info) => Response::DocumentInfo { info, reference_id },
                Err(err) => Response::error(err.code(), err.message(), reference_id),
            }
        }
    }
}

/// Handles one fully-decoded HTTP operation and writes the response
/// (success or error) directly to `transport`. Only a genuine transport I/O
/// failure propagates as `Err`; SPI/admission failures are written as RSS
/// error bodies and return `Ok(())`.
pub fn handle_http_operation<P: SearchProvider>(
    transport: &mut Transport,
    provider: &P,
    session: &Session,
    admission: &AdmissionController,
    operation: HttpOperation,
) -> Result<(), HttpError> {
    match operation {
        HttpOperation::SearchIndex(req) => handle_search_index(transport, provider, session, admission, req),
        HttpOperation::RetrieveDocument(req) => {
            handle_retrieve_document(transport, provider, session, admission, req)
        }
        HttpOperation::ServerInfo(req) => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return write_admission_error(transport, err);
            }
            match provider.get_server_info(session) {
                Ok(info) => write_rendered(transport, "serverInfo", http_response::server_info_nodes(&info), req.format),
                Err(err) => write_spi_error(transport, &err),
            }
        }
        HttpOperation::ServerIndexInfo(req) => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return write_admission_error(transport, err);
            }
            match provider.get_server_index_info(session) {
                Ok(infos) => write_rendered(
                    transport,
                    "serverIndexInfo",
                    http_response::server_index_info_nodes(&infos),
                    req.format,
                ),
                Err(err) => write_spi_error(transport, &err),
            }
        }
        HttpOperation::IndexInfo(req) => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return write_admission_error(transport, err);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&req.index)) {
                Ok(g) => g,
                Err(err) => return write_spi_error(transport, &err),
            };
            match provider.get_index_info(session, &guard.indices[0]) {
                Ok(info) => write_rendered(transport, "indexInfo", http_response::index_info_nodes(&info), req.format),
                Err(err) => write_spi_error(transport, &err),
            }
        }
        HttpOperation::IndexFieldInfo(req) => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return write_admission_error(transport, err);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&req.index)) {
                Ok(g) => g,
                Err(err) => return write_spi_error(transport, &err),
            };
            match provider.get_index_field_info(session, &guard.indices[0]) {
                Ok(fields) => {
                    write_rendered(transport, "indexFieldInfo", http_response::field_info_nodes(&fields), req.format)
                }
                Err(err) => write_spi_error(transport, &err),
            }
        }
        HttpOperation::IndexTermInfo(req) => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return write_admission_error(transport, err);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&req.index)) {
                Ok(g) => g,
                Err(err) => return write_spi_error(transport, &err),
            };
            match provider.get_index_term_info(
                session,
                &guard.indices[0],
                req.term_match,
                req.term_case,
                req.term.as_deref(),
                req.field.as_deref(),
            ) {
                Ok(terms) => {
                    write_rendered(transport, "indexTermInfo", http_response::term_info_nodes(&terms), req.format)
                }
                Err(err) => write_spi_error(transport, &err),
            }
        }
        HttpOperation::DocumentInfo(req) => {
            if let Err(err) = admission.check(AdmissionClass::Information) {
                return write_admission_error(transport, err);
            }
            let guard = match open_indices(provider, session, std::slice::from_ref(&req.index)) {
                Ok(g) => g,
                Err(err) => return write_spi_error(transport, &err),
            };
            match provider.get_document_info(session, &guard.indices[0], &req.document_key) {
                Ok(info) => {
                    write_rendered(transport, "documentInfo", http_response::document_info_nodes(&info), req.format)
                }
                Err(err) => write_spi_error(transport, &err),
            }
        }
    }
}

fn handle_search_index<P: SearchProvider>(
    transport: &mut Transport,
    provider: &P,
    session: &Session,
    admission: &AdmissionController,
    req: mps_http::path::SearchIndexRequest,
) -> Result<(), HttpError> {
    use mps_http::path::ReportMode;

    if let Err(err) = admission.check(AdmissionClass::Search) {
        return write_admission_error(transport, err);
    }
    let guard = match open_indices(provider, session, &req.indexes) {
        Ok(g) => g,
        Err(err) => return write_spi_error(transport, &err),
    };
    let start = req.start.unwrap_or(0);
    // Absent limit defaults to a 50-result window (end = start+49); an
    // explicit limit=0 means unbounded, not a single-result window — both
    // per the original's start/limit-to-range translation.
    let end = match req.limit {
        None => start.saturating_add(49),
        Some(0) => u64::MAX,
        Some(limit) => start.saturating_add(limit.saturating_sub(1)),
    };

    let mut response = match provider.search_index(
        session,
        &guard.indices,
        req.language.as_deref(),
        req.search.as_deref().unwrap_or(""),
        req.positive_feedback.as_deref(),
        req.negative_feedback.as_deref(),
        start,
        end,
    ) {
        Ok(r) => r,
        Err(err) => return write_spi_error(transport, &err),
    };

    // As in the LWPS handler: the provider already windowed `response.results`
    // to [start,end] itself, so splice here must use the provider's own
    // local bounds, not the absolute start/end again.
    let local_end = response.results.len().saturating_sub(1) as u64;
    response.results = postproc::splice(response.results, 0, local_end);
    postproc::sort(&mut response.results, response.sort_type);

    let report_text = match req.report {
        ReportMode::None => {
            postproc::strip_search_reports(&mut response.results);
            None
        }
        ReportMode::Raw => None,
        ReportMode::Formatted => {
            let merged = postproc::merge_search_reports(provider, &response.results);
            postproc::strip_search_reports(&mut response.results);
            merged.map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        }
    };

    let nodes = http_response::search_response_nodes(
        req.search.as_deref(),
        req.positive_feedback.as_deref(),
        req.negative_feedback.as_deref(),
        &response,
        report_text,
    );
    write_rendered_with_extensions(transport, "searchResponse", nodes, req.format, req.extensions)
}

fn handle_retrieve_document<P: SearchProvider>(
    transport: &mut Transport,
    provider: &P,
    session: &Session,
    admission: &AdmissionController,
    req: mps_http::path::RetrieveDocumentRequest,
) -> Result<(), HttpError> {
    use mps_http::path::ResponseFormat;

    if let Err(err) = admission.check(AdmissionClass::Retrieval) {
        return write_admission_error(transport, err);
    }
    let guard = match open_indices(provider, session, std::slice::from_ref(&req.index)) {
        Ok(g) => g,
        Err(err) => return write_spi_error(transport, &err),
    };
    let bytes = match provider.retrieve_document(
        session,
        &guard.indices[0],
        &req.document_key,
        &req.item_name,
        &req.mime_type,
        mps_spi::ChunkType::Unknown,
        0,
        0,
    ) {
        Ok(b) => b,
        Err(err) => return write_spi_error(transport, &err),
    };

    if req.format == ResponseFormat::Raw {
        http_response::write_retrieve_document_raw(transport, &req.mime_type, &bytes)
    } else {
        let nodes = http_response::retrieve_document_nodes(&req.mime_type, &bytes);
        write_rendered(transport, "document", nodes, req.format)
    }
}

fn write_rendered(
    transport: &mut Transport,
    root: &'static str,
    nodes: Vec<format::Node>,
    format: mps_http::path::ResponseFormat,
) -> Result<(), HttpError> {
    write_rendered_with_extensions(transport, root, nodes, format, mps_http::path::Extensions::default())
}

fn write_rendered_with_extensions(
    transport: &mut Transport,
    root: &'static str,
    nodes: Vec<format::Node>,
    format: mps_http::path::ResponseFormat,
    extensions: mps_http::path::Extensions,
) -> Result<(), HttpError> {
    let body = http_response::render_body(root, &nodes, format, extensions)?;
    http_response::write_response(transport, 200, "OK", format.content_type(), &body)
}

fn write_spi_error(transport: &mut Transport, err: &mps_spi::SpiError) -> Result<(), HttpError> {
    http_response::write_error(transport, 500, "Internal Server Error", &err.message())
}

fn write_admission_error(
    transport: &mut Transport,
    err: crate::admission::AdmissionError,
) -> Result<(), HttpError> {
    http_response::write_error(transport, 503, "Service Unavailable", &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mps_spi::{
        ChunkType, DocumentInfo, FieldInfo, IndexInfo, ServerIndexInfo, ServerInfo, SortType, SpiError, SpiResult,
        TermCase, TermInfo, TermMatch,
    };
    use mps_spi::{SearchResponse, SearchResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A provider that records every open/close call (to verify pairing) and
    /// otherwise returns canned, empty-ish responses.
    #[derive(Default)]
    struct RecordingProvider {
        open_count: AtomicUsize,
        close_count: AtomicUsize,
        fail_open_for: Mutex<Option<String>>,
    }

    impl SearchProvider for RecordingProvider {
        type Index = String;

        fn initialize_server(&self, _session: &Session) -> SpiResult<()> {
            Ok(())
        }

        fn shutdown_server(&self, _session: &Session) -> SpiResult<()> {
            Ok(())
        }

        fn open_index(&self, _session: &Session, index_name: &str) -> SpiResult<String> {
            if self.fail_open_for.lock().unwrap().as_deref() == Some(index_name) {
                return Err(SpiError::OpenIndexFailed);
            }
            self.open_count.fetch_add(1, Ordering::SeqCst);
            Ok(index_name.to_string())
        }

        fn close_index(&self, _session: &Session, _index: &String) -> SpiResult<()> {
            self.close_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn search_index(
            &self,
            _session: &Session,
            indices: &[String],
            _language_code: Option<&str>,
            _search_text: &str,
            _positive_feedback_text: Option<&str>,
            _negative_feedback_text: Option<&str>,
            _start_index: u64,
            _end_index: u64,
        ) -> SpiResult<SearchResponse> {
            let results = indices
                .iter()
                .enumerate()
                .map(|(i, name)| SearchResult {
                    index_name: name.clone(),
                    document_key: format!("k{i}"),
                    title: format!("title {i}"),
                    language: None,
                    sort_key: mps_spi::SortKey::Double(i as f64),
                    rank: 0,
                    term_count: 0,
                    ansi_date: 20260101,
                    items: vec![],
                })
                .collect::<Vec<_>>();
            let total = results.len() as u64;
            Ok(SearchResponse {
                results,
                total_results: total,
                start_index: 0,
                end_index: total.saturating_sub(1),
                sort_type: SortType::NoSort,
                max_sort_key: None,
                search_time_seconds: 0.0,
            })
        }

        fn retrieve_document(
            &self,
            _session: &Session,
            _index: &String,
            _document_key: &str,
            _item_name: &str,
            _mime_type: &str,
            _chunk_type: ChunkType,
            _chunk_start: u32,
            _chunk_end: u32,
        ) -> SpiResult<Vec<u8>> {
            Ok(b"raw bytes".to_vec())
        }

        fn get_server_info(&self, _session: &Session) -> SpiResult<ServerInfo> {
            Ok(ServerInfo::default())
        }

        fn get_server_index_info(&self, _session: &Session) -> SpiResult<Vec<ServerIndexInfo>> {
            Ok(vec![])
        }

        fn get_index_info(&self, _session: &Session, index: &String) -> SpiResult<IndexInfo> {
            Ok(IndexInfo {
                name: index.clone(),
                description: None,
                language_code: None,
                tokenizer_name: None,
                stemmer_name: None,
                stop_list_name: None,
                document_count: None,
                unique_term_count: None,
                total_term_count: None,
                unique_stop_term_count: None,
                total_stop_term_count: None,
                access_control: mps_spi::IndexAccess::Public,
                update_frequency: mps_spi::IndexUpdateFrequency::Daily,
                last_update_ansi_date: None,
                case_sensitive: false,
            })
        }

        fn get_index_field_info(&self, _session: &Session, _index: &String) -> SpiResult<Vec<FieldInfo>> {
            Ok(vec![])
        }

        fn get_index_term_info(
            &self,
            _session: &Session,
            _index: &String,
            _term_match: TermMatch,
            _term_case: TermCase,
            _term: Option<&str>,
            _field_name: Option<&str>,
        ) -> SpiResult<Vec<TermInfo>> {
            Ok(vec![])
        }

        fn get_document_info(&self, _session: &Session, _index: &String, document_key: &str) -> SpiResult<DocumentInfo> {
            Ok(DocumentInfo {
                index_name: "idx".into(),
                document_key: document_key.to_string(),
                title: "T".into(),
                language_code: None,
                rank: None,
                term_count: None,
                ansi_date: None,
                items: vec![],
            })
        }
    }

    fn test_session() -> Session {
        Session {
            index_root: "/tmp/index".into(),
            configuration_path: "/tmp/config".into(),
            temporary_path: "/tmp/tmp".into(),
        }
    }

    fn disabled_admission() -> AdmissionController {
        AdmissionController::new(crate::admission::AdmissionLimits {
            connection: 0.0,
            search: 0.0,
            retrieval: 0.0,
            information: 0.0,
        })
    }

    #[test]
    fn lwps_search_opens_and_closes_every_requested_index() {
        let provider = RecordingProvider::default();
        let session = test_session();
        let admission = disabled_admission();
        let request = mps_lwps::Request::Search {
            indices: vec!["a".into(), "b".into()],
            language: None,
            query: "hello".into(),
            positive_feedback: None,
            negative_feedback: None,
            start: 0,
            end: 10,
            reference_id: "ref1".into(),
        };
        let response = handle_lwps_request(&provider, &session, &admission, request);
        match response {
            mps_lwps::Response::Search { response, reference_id } => {
                assert_eq!(reference_id, "ref1");
                assert_eq!(response.results.len(), 2);
            }
            other => panic!("expected Search response, got {other:?}"),
        }
        assert_eq!(provider.open_count.load(Ordering::SeqCst), 2);
        assert_eq!(provider.close_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn lwps_init_never_touches_the_provider() {
        let provider = RecordingProvider::default();
        let session = test_session();
        let admission = disabled_admission();
        let request = mps_lwps::Request::Init {
            username: "u".into(),
            password: "p".into(),
            reference_id: "init-1".into(),
        };
        let response = handle_lwps_request(&provider, &session, &admission, request);
        assert_eq!(response.reference_id(), "init-1");
        assert_eq!(provider.open_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn lwps_search_rejected_under_admission_limit_still_closes_no_index() {
        let provider = RecordingProvider::default();
        let session = test_session();
        let admission = AdmissionController::new(crate::admission::AdmissionLimits::uniform(0.0001));
        let request = mps_lwps::Request::Search {
            indices: vec!["a".into()],
            language: None,
            query: "hello".into(),
            positive_feedback: None,
            negative_feedback: None,
            start: 0,
            end: 10,
            reference_id: "ref2".into(),
        };
        // A max this low only rejects if the host's load average could be
        // read and is nonzero; skip the assertion on hosts where it can't.
        let response = handle_lwps_request(&provider, &session, &admission, request);
        if let mps_lwps::Response::Error { code, reference_id, .. } = response {
            assert_eq!(code, SpiError::ExceededLoadMaximum.code());
            assert_eq!(reference_id, "ref2");
            assert_eq!(provider.open_count.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn open_indices_closes_already_opened_on_later_failure() {
        let provider = RecordingProvider::default();
        *provider.fail_open_for.lock().unwrap() = Some("second".to_string());
        let session = test_session();
        let names = vec!["first".to_string(), "second".to_string()];
        let err = open_indices(&provider, &session, &names).unwrap_err();
        assert_eq!(err, SpiError::OpenIndexFailed);
        assert_eq!(provider.open_count.load(Ordering::SeqCst), 1);
        assert_eq!(provider.close_count.load(Ordering::SeqCst), 1);
    }

    fn tcp_transport_pair() -> (Transport, std::thread::JoinHandle<Vec<u8>>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || {
            use std::io::Read;
            let mut s = std::net::TcpStream::connect(addr).unwrap();
            let mut buf = Vec::new();
            s.read_to_end(&mut buf).unwrap();
            buf
        });
        let (stream, _) = listener.accept().unwrap();
        (Transport::from_tcp_stream(stream), client)
    }

    #[test]
    fn http_retrieve_document_raw_writes_item_bytes_verbatim() {
        let provider = RecordingProvider::default();
        let session = test_session();
        let admission = disabled_admission();
        let (mut transport, client) = tcp_transport_pair();
        let req = mps_http::path::RetrieveDocumentRequest {
            index: "idx".into(),
            document_key: "doc1".into(),
            item_name: "document".into(),
            mime_type: "text/plain".into(),
            format: mps_http::path::ResponseFormat::Raw,
        };
        handle_retrieve_document(&mut transport, &provider, &session, &admission, req).unwrap();
        transport.close();
        let received = client.join().unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.contains("200 OK"));
        assert!(text.contains("text/plain"));
        assert!(text.ends_with("raw bytes"));
        assert_eq!(provider.close_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn http_search_index_report_none_strips_report_items() {
        let provider = RecordingProvider::default();
        let session = test_session();
        let admission = disabled_admission();
        let (mut transport, client) = tcp_transport_pair();
        let req = mps_http::path::SearchIndexRequest {
            indexes: vec!["idx".into()],
            language: None,
            search: Some("hello".into()),
            positive_feedback: None,
            negative_feedback: None,
            start: None,
            limit: None,
            report: mps_http::path::ReportMode::None,
            format: mps_http::path::ResponseFormat::Xml,
            extensions: mps_http::path::Extensions::default(),
        };
        handle_search_index(&mut transport, &provider, &session, &admission, req).unwrap();
        transport.close();
        let received = client.join().unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.contains("200 OK"));
        assert!(text.contains("<search>hello</search>"));
        assert!(!text.contains("searchReport"));
    }
}
