// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The structured index-stream format `mps-indexer-cli` reads from stdin or
//! `--stream=path` (§6). Newline-delimited JSON: an optional leading `meta`
//! record followed by any number of `document` records. Not a port of
//! anything in the original source tree — the original's stream grammar
//! isn't part of this port's corpus, so this is a documented, original
//! design (see DESIGN.md).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "lowercase")]
pub enum StreamRecord {
    Meta {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        language_code: Option<String>,
    },
    Document {
        document_key: String,
        title: String,
        #[serde(default)]
        language_code: Option<String>,
        ansi_date: u32,
        #[serde(default)]
        text: String,
        #[serde(default)]
        items: Vec<StreamItem>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamItem {
    pub item_name: String,
    pub mime_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub data: Option<serde_bytes::ByteBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_record_round_trips() {
        let record = StreamRecord::Document {
            document_key: "k1".to_string(),
            title: "T".to_string(),
            language_code: Some("en".to_string()),
            ansi_date: 20260101,
            text: "hello world".to_string(),
            items: vec![],
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: StreamRecord = serde_json::from_str(&json).unwrap();
        match back {
            StreamRecord::Document { document_key, .. } => assert_eq!(document_key, "k1"),
            _ => panic!("expected document record"),
        }
    }

    #[test]
    fn meta_record_is_tagged_distinctly() {
        let json = r#"{"record":"meta","description":"demo"}"#;
        let record: StreamRecord = serde_json::from_str(json).unwrap();
        matches!(record, StreamRecord::Meta { .. });
    }
}
