// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Descriptive records returned by SPI introspection operations, mirroring
//! `spi.h`'s `spiServerInfo` / `spiServerIndexInfo` / `spiIndexInfo` /
//! `spiFieldInfo` / `spiTermInfo` / `spiDocumentInfo` structs.

use crate::result::DocumentItem;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub index_count: Option<u32>,
    pub ranking_algorithm: Option<String>,
    pub weight_minimum: f64,
    pub weight_maximum: f64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerIndexInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IndexAccess {
    Unknown,
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IndexUpdateFrequency {
    Unknown,
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Never,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub description: Option<String>,
    pub language_code: Option<String>,
    pub tokenizer_name: Option<String>,
    pub stemmer_name: Option<String>,
    pub stop_list_name: Option<String>,
    pub document_count: Option<u32>,
    pub unique_term_count: Option<u64>,
    pub total_term_count: Option<u64>,
    pub unique_stop_term_count: Option<u64>,
    pub total_stop_term_count: Option<u64>,
    pub access_control: IndexAccess,
    pub update_frequency: IndexUpdateFrequency,
    pub last_update_ansi_date: Option<u64>,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub description: Option<String>,
    pub field_type: Option<u32>,
}

/// How a term query should match index terms, from the HTTP
/// `/IndexTermInfo` `termMatch` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TermMatch {
    #[default]
    Regular,
    Stop,
    Wildcard,
    Soundex,
    Metaphone,
    Phonix,
    Typo,
    Regex,
}

impl TermMatch {
    pub fn parse(s: &str) -> Option<TermMatch> {
        Some(match s {
            "regular" => TermMatch::Regular,
            "stop" => TermMatch::Stop,
            "wildcard" => TermMatch::Wildcard,
            "soundex" => TermMatch::Soundex,
            "metaphone" => TermMatch::Metaphone,
            "phonix" => TermMatch::Phonix,
            "typo" => TermMatch::Typo,
            "regex" => TermMatch::Regex,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TermCase {
    #[default]
    Sensitive,
    Insensitive,
}

impl TermCase {
    pub fn parse(s: &str) -> Option<TermCase> {
        Some(match s {
            "sensitive" => TermCase::Sensitive,
            "insensitive" => TermCase::Insensitive,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TermInfo {
    pub term: String,
    pub term_type: TermMatch,
    pub count: Option<u32>,
    pub document_count: Option<u32>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocumentInfo {
    pub index_name: String,
    pub document_key: String,
    pub title: String,
    pub language_code: Option<String>,
    pub rank: Option<u32>,
    pub term_count: Option<u32>,
    pub ansi_date: Option<u64>,
    pub items: Vec<DocumentItem>,
}
