// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Result post-processing (C9): splicing a result array to an inclusive
//! window while preserving search-report items, sorting by the response's
//! sort-key variant, and folding per-index search-report bodies into one
//! human-readable block.

use mps_spi::{compare_keys, SearchProvider, SearchResult, SortType};
use tracing::warn;

/// Trims `results` to the inclusive window `[start_index, end_index]`,
/// keeping any search-report item regardless of where it falls in that
/// window by shifting it into the retained prefix (§4.9). `start_index`/
/// `end_index` are positions within `results` itself — the array the
/// caller is splicing, not the absolute range originally sent to the SPI —
/// so a caller whose provider already windowed its response to that
/// absolute range must pass the provider's own local bounds here (typically
/// `0..results.len()-1`), not the original query's start/end again.
pub fn splice(results: Vec<SearchResult>, start_index: u64, end_index: u64) -> Vec<SearchResult> {
    if results.is_empty() {
        return results;
    }
    let (reports, others): (Vec<SearchResult>, Vec<SearchResult>) =
        results.into_iter().partition(SearchResult::has_search_report);

    let mut retained = Vec::new();
    if start_index <= end_index && (start_index as usize) < others.len() {
        let start = start_index as usize;
        let end = (end_index as usize).min(others.len() - 1);
        retained = others.into_iter().skip(start).take(end - start + 1).collect();
    }

    let mut spliced = reports;
    spliced.extend(retained);
    spliced
}

/// Sorts `results` in place per `sort_type`. "No sort" leaves order
/// untouched, matching §4.9's contract; every other variant is a total
/// order over the matching `SortKey` projection, so an unstable sort
/// satisfies it.
pub fn sort(results: &mut [SearchResult], sort_type: SortType) {
    if sort_type == SortType::NoSort {
        return;
    }
    results.sort_unstable_by(|a, b| compare_keys(sort_type, &a.sort_key, &b.sort_key));
}

/// Pulls the raw search-report bytes out of every result that carries one,
/// in result order.
pub fn extract_search_reports(results: &[SearchResult]) -> Vec<Vec<u8>> {
    results
        .iter()
        .flat_map(|r| r.items.iter())
        .filter(|item| item.is_search_report())
        .filter_map(|item| item.data.as_ref())
        .map(|bytes| bytes.to_vec())
        .collect()
}

/// Removes search-report document items from every result's item list,
/// the behavior `/SearchIndex`'s `report=none` and `report=formatted`
/// (§4.4) selectors both want once any report content has been extracted.
pub fn strip_search_reports(results: &mut [SearchResult]) {
    for result in results.iter_mut() {
        result.items.retain(|item| !item.is_search_report());
    }
}

/// Folds every per-result search-report body into one block via the
/// provider's `merge_and_format_search_reports`. A provider failure here is
/// a warning, not an error (§4.9) — callers get `None` and proceed without
/// a merged report rather than failing the whole response.
pub fn merge_search_reports<P: SearchProvider + ?Sized>(
    provider: &P,
    results: &[SearchResult],
) -> Option<Vec<u8>> {
    let reports = extract_search_reports(results);
    if reports.is_empty() {
        return None;
    }
    match provider.merge_and_format_search_reports(&reports) {
        Ok(merged) => Some(merged),
        Err(err) => {
            warn!(error = %err, "failed to merge search reports");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mps_spi::{DocumentItem, SortKey};
    use mps_spi::result::{SEARCH_REPORT_ITEM_NAME, SEARCH_REPORT_MIME_TYPE};

    fn result(key: f64, report: bool) -> SearchResult {
        let mut items = Vec::new();
        if report {
            items.push(DocumentItem {
                item_name: SEARCH_REPORT_ITEM_NAME.to_string(),
                mime_type: SEARCH_REPORT_MIME_TYPE.to_string(),
                length: 0,
                url: None,
                data: Some(bytes::Bytes::from_static(b"report")),
            });
        }
        SearchResult {
            index_name: "idx".into(),
            document_key: format!("k{key}"),
            title: "T".into(),
            language: None,
            sort_key: SortKey::Double(key),
            rank: 0,
            term_count: 0,
            ansi_date: 20260101,
            items,
        }
    }

    #[test]
    fn splice_keeps_window_and_preserves_reports_outside_it() {
        let results = vec![result(0.1, false), result(0.2, true), result(0.3, false), result(0.4, false)];
        let spliced = splice(results, 0, 1);
        // the report item (originally at position 1, outside [0,1] among
        // non-report entries) is shifted into the prefix.
        assert_eq!(spliced.len(), 3);
        assert!(spliced[0].has_search_report());
    }

    #[test]
    fn splice_is_idempotent_when_window_starts_at_zero() {
        let results = vec![result(0.1, false), result(0.2, false), result(0.3, false)];
        let once = splice(results, 0, 1);
        let twice = splice(once.clone(), 0, 1);
        assert_eq!(once.len(), twice.len());
        assert_eq!(once[0].document_key, twice[0].document_key);
        assert_eq!(once[1].document_key, twice[1].document_key);
    }

    #[test]
    fn splice_empties_when_window_is_empty() {
        let results = vec![result(0.1, false)];
        let spliced = splice(results, 5, 2);
        assert!(spliced.is_empty());
    }

    #[test]
    fn sort_orders_by_key_and_direction() {
        let mut results = vec![result(0.1, false), result(0.9, false), result(0.5, false)];
        sort(&mut results, SortType::DoubleDesc);
        let keys: Vec<f64> = results
            .iter()
            .map(|r| match r.sort_key {
                SortKey::Double(v) => v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, vec![0.9, 0.5, 0.1]);
    }

    #[test]
    fn sort_no_sort_leaves_order_untouched() {
        let mut results = vec![result(0.9, false), result(0.1, false)];
        sort(&mut results, SortType::NoSort);
        assert_eq!(results[0].document_key, "k0.9");
    }
}
