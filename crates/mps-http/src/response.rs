// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Response assembly: the §4.4 header block, the per-format body encoders
//! built on top of `format::Node`, and the always-RSS error body used for
//! both admission rejections and SPI failures.

use std::time::{SystemTime, UNIX_EPOCH};

use mps_net::Transport;
use mps_spi::{DocumentInfo, DocumentItem, FieldInfo, IndexInfo, ServerIndexInfo, ServerInfo, TermInfo};

use crate::error::HttpError;
use crate::format::{self, base64_leaf, leaf, opt_leaf, Node, ObjectSyntax};
use crate::path::{Extensions, ResponseFormat};

const SERVER_NAME: &str = "mps-search-server";

/// Writes the full response — header block then body — to `transport`.
/// `content_type` overrides `format`'s default, used for raw retrieval
/// where the real content type comes from the retrieved item.
pub fn write_response(
    transport: &mut Transport,
    status: u16,
    reason: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), HttpError> {
    let head = header_block(status, reason, content_type, Some(body.len()));
    transport.write_buffered(head.as_bytes());
    transport.write_buffered(body);
    transport.send()?;
    Ok(())
}

fn header_block(status: u16, reason: &str, content_type: &str, content_length: Option<usize>) -> String {
    let date = http_date_now();
    let mut head = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Date: {date}\r\n\
         Server: {SERVER_NAME}\r\n\
         Last-Modified: {date}\r\n\
         Connection: close\r\n\
         Content-Type: {content_type}\r\n"
    );
    if let Some(len) = content_length {
        head.push_str(&format!("Content-Length: {len}\r\n"));
    }
    head.push_str("\r\n");
    head
}

/// Minimal RFC 7231 `HTTP-date` formatter (no floating dependency on a date
/// crate the rest of the stack doesn't already pull in); implements Howard
/// Hinnant's days-from-civil/civil-from-days algorithm for the calendar math.
fn http_date_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let days = secs.div_euclid(86_400);
    let time_of_day = secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    let weekday = (days.rem_euclid(7) + 4).rem_euclid(7); // 1970-01-01 was a Thursday (4)
    let weekday_name = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"][weekday as usize];
    let month_name = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ][(month - 1) as usize];
    let hour = time_of_day / 3600;
    let minute = (time_of_day % 3600) / 60;
    let second = time_of_day % 60;
    format!("{weekday_name}, {day:02} {month_name} {year:04} {hour:02}:{minute:02}:{second:02} GMT")
}

fn civil_from_days(z: i64) -> (i64, i64, i64) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as i64;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as i64;
    let year = if month <= 2 { y + 1 } else { y };
    (year, month, day)
}

/// Dispatches a built `Node` tree to the format the client asked for.
/// `format == Raw` is never passed here; raw bodies bypass the tree
/// entirely (see `write_retrieve_document_raw`).
pub fn render_body(root: &'static str, nodes: &[Node], format: ResponseFormat, extensions: Extensions) -> Result<Vec<u8>, HttpError> {
    let text = match format {
        ResponseFormat::Rss => format::render_rss(root, nodes, extensions),
        ResponseFormat::Xml => format::render_xml(root, nodes),
        ResponseFormat::Json => format::render_object(root, nodes, ObjectSyntax::Json),
        ResponseFormat::Ruby => format::render_object(root, nodes, ObjectSyntax::Ruby),
        ResponseFormat::Python => format::render_object(root, nodes, ObjectSyntax::Python),
        ResponseFormat::Raw => return Err(HttpError::Internal("raw format has no node rendering".into())),
        ResponseFormat::Mxg => return Err(HttpError::NotImplemented),
    };
    Ok(text.into_bytes())
}

/// Writes a retrieved document's raw bytes back verbatim with its real
/// MIME type, per Scenario 2.
pub fn write_retrieve_document_raw(transport: &mut Transport, mime_type: &str, bytes: &[u8]) -> Result<(), HttpError> {
    write_response(transport, 200, "OK", mime_type, bytes)
}

/// Always wraps in RSS regardless of the request's requested format,
/// matching §7's "(HTTP path) wrapped in an RSS error body" rule.
pub fn write_error(transport: &mut Transport, status: u16, reason: &str, message: &str) -> Result<(), HttpError> {
    let nodes = vec![leaf("message", message)];
    let body = format::render_rss("error", &nodes, Extensions::default());
    write_response(transport, status, reason, "application/rss+xml", body.as_bytes())
}

pub fn document_item_nodes(items: &[DocumentItem]) -> Node {
    let item_lists: Vec<Vec<Node>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut fields = vec![
                leaf("itemName", &item.item_name),
                leaf("mimeType", &item.mime_type),
                leaf("length", item.length),
            ];
            if let Some(node) = opt_leaf("url", &item.url) {
                fields.push(node);
            }
            // only the first item of a result carries inline data on the
            // wire, per §4.4.
            if i == 0 {
                if let Some(data) = &item.data {
                    fields.push(base64_leaf("data", data));
                }
            }
            fields
        })
        .collect();
    Node::Items("item", item_lists)
}

pub fn search_result_nodes(result: &mps_spi::SearchResult) -> Vec<Node> {
    let mut fields = vec![
        leaf("indexName", &result.index_name),
        leaf("documentKey", &result.document_key),
        leaf("title", &result.title),
        leaf("sortKey", sort_key_text(&result.sort_key)),
        leaf("rank", result.rank),
        leaf("termCount", result.term_count),
        leaf("ansiDate", result.ansi_date),
    ];
    if let Some(node) = opt_leaf("language", &result.language) {
        fields.push(node);
    }
    fields.push(document_item_nodes(&result.items));
    fields
}

fn sort_key_text(key: &mps_spi::SortKey) -> String {
    match key {
        mps_spi::SortKey::Double(v) => v.to_string(),
        mps_spi::SortKey::Float(v) => v.to_string(),
        mps_spi::SortKey::U32(v) => v.to_string(),
        mps_spi::SortKey::U64(v) => v.to_string(),
        mps_spi::SortKey::Str(v) => v.clone(),
    }
}

/// Builds the `<searchResponse>` tree: request echo, totals, ordered
/// results, and the optional trailing search-report element, per §4.4.
pub fn search_response_nodes(
    echoed_search: Option<&str>,
    echoed_positive_feedback: Option<&str>,
    echoed_negative_feedback: Option<&str>,
    response: &mps_spi::SearchResponse,
    report_text: Option<String>,
) -> Vec<Node> {
    let mut nodes = Vec::new();
    if let Some(s) = echoed_search {
        nodes.push(leaf("search", s));
    }
    if let Some(s) = echoed_positive_feedback {
        nodes.push(leaf("positiveFeedback", s));
    }
    if let Some(s) = echoed_negative_feedback {
        nodes.push(leaf("negativeFeedback", s));
    }
    nodes.push(leaf("totalResults", response.total_results));
    nodes.push(leaf("startIndex", response.start_index));
    nodes.push(leaf("endIndex", response.end_index));
    nodes.push(leaf("sortType", response.sort_type.wire_token()));
    if let Some(max_key) = &response.max_sort_key {
        nodes.push(leaf("maxSortKey", sort_key_text(max_key)));
    }
    nodes.push(leaf("searchTime", response.search_time_seconds));
    nodes.push(Node::Items(
        "searchResult",
        response.results.iter().map(search_result_nodes).collect(),
    ));
    if let Some(text) = report_text {
        nodes.push(Node::Group("searchReport", vec![leaf("text", text)]));
    }
    nodes
}

pub fn retrieve_document_nodes(mime_type: &str, bytes: &[u8]) -> Vec<Node> {
    vec![
        leaf("mimeType", mime_type),
        base64_leaf("data", bytes),
        leaf("length", bytes.len()),
    ]
}

pub fn server_info_nodes(info: &ServerInfo) -> Vec<Node> {
    let mut nodes = Vec::new();
    if let Some(n) = opt_leaf("name", &info.name) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("description", &info.description) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("adminName", &info.admin_name) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("adminEmail", &info.admin_email) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("indexCount", &info.index_count) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("rankingAlgorithm", &info.ranking_algorithm) {
        nodes.push(n);
    }
    nodes.push(leaf("weightMinimum", info.weight_minimum));
    nodes.push(leaf("weightMaximum", info.weight_maximum));
    nodes
}

pub fn server_index_info_nodes(indexes: &[ServerIndexInfo]) -> Vec<Node> {
    vec![Node::Items(
        "index",
        indexes
            .iter()
            .map(|idx| {
                let mut fields = vec![leaf("name", &idx.name)];
                if let Some(n) = opt_leaf("description", &idx.description) {
                    fields.push(n);
                }
                fields
            })
            .collect(),
    )]
}

pub fn index_info_nodes(info: &IndexInfo) -> Vec<Node> {
    let mut nodes = vec![leaf("name", &info.name)];
    if let Some(n) = opt_leaf("description", &info.description) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("languageCode", &info.language_code) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("tokenizerName", &info.tokenizer_name) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("stemmerName", &info.stemmer_name) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("stopListName", &info.stop_list_name) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("documentCount", &info.document_count) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("uniqueTermCount", &info.unique_term_count) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("totalTermCount", &info.total_term_count) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("lastUpdateAnsiDate", &info.last_update_ansi_date) {
        nodes.push(n);
    }
    nodes.push(leaf("caseSensitive", info.case_sensitive));
    nodes
}

pub fn field_info_nodes(fields: &[FieldInfo]) -> Vec<Node> {
    vec![Node::Items(
        "field",
        fields
            .iter()
            .map(|f| {
                let mut fs = vec![leaf("name", &f.name)];
                if let Some(n) = opt_leaf("description", &f.description) {
                    fs.push(n);
                }
                if let Some(n) = opt_leaf("fieldType", &f.field_type) {
                    fs.push(n);
                }
                fs
            })
            .collect(),
    )]
}

pub fn term_info_nodes(terms: &[TermInfo]) -> Vec<Node> {
    vec![Node::Items(
        "term",
        terms
            .iter()
            .map(|t| {
                let mut fs = vec![leaf("term", &t.term)];
                if let Some(n) = opt_leaf("count", &t.count) {
                    fs.push(n);
                }
                if let Some(n) = opt_leaf("documentCount", &t.document_count) {
                    fs.push(n);
                }
                fs
            })
            .collect(),
    )]
}

pub fn document_info_nodes(info: &DocumentInfo) -> Vec<Node> {
    let mut nodes = vec![
        leaf("indexName", &info.index_name),
        leaf("documentKey", &info.document_key),
        leaf("title", &info.title),
    ];
    if let Some(n) = opt_leaf("languageCode", &info.language_code) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("rank", &info.rank) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("termCount", &info.term_count) {
        nodes.push(n);
    }
    if let Some(n) = opt_leaf("ansiDate", &info.ansi_date) {
        nodes.push(n);
    }
    nodes.push(document_item_nodes(&info.items));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use mps_spi::{SearchResponse, SearchResult, SortKey, SortType};

    #[test]
    fn search_response_renders_scenario_one_fields() {
        let response = SearchResponse {
            results: vec![
                SearchResult {
                    index_name: "test".into(),
                    document_key: "k1".into(),
                    title: "T1".into(),
                    language: None,
                    sort_key: SortKey::Double(0.8),
                    rank: 0,
                    term_count: 0,
                    ansi_date: 20260101,
                    items: vec![],
                },
                SearchResult {
                    index_name: "test".into(),
                    document_key: "k2".into(),
                    title: "T2".into(),
                    language: None,
                    sort_key: SortKey::Double(0.4),
                    rank: 0,
                    term_count: 0,
                    ansi_date: 20260101,
                    items: vec![],
                },
            ],
            total_results: 2,
            start_index: 0,
            end_index: 1,
            sort_type: SortType::DoubleDesc,
            max_sort_key: Some(SortKey::Double(0.8)),
            search_time_seconds: 0.001,
        };
        let nodes = search_response_nodes(Some("hello"), None, None, &response, None);
        let xml = format::render_xml("searchResponse", &nodes);
        assert!(xml.contains("<search>hello</search>"));
        assert!(xml.contains("<totalResults>2</totalResults>"));
        assert!(xml.contains("<sortType>double:desc</sortType>"));
        let first = xml.find("<searchResult>").unwrap();
        let second = xml[first + 1..].find("<searchResult>").unwrap();
        assert!(xml[first..first + second].contains("k1"));
    }

    #[test]
    fn write_error_always_uses_rss_content_type() {
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
        let mut transport = Transport::from_tcp_stream(stream);
        write_error(&mut transport, 503, "Service Unavailable", "load is too high").unwrap();
        transport.close();
        let received = client.join().unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.contains("503 Service Unavailable"));
        assert!(text.contains("application/rss+xml"));
        assert!(text.contains("load is too high"));
    }
}
