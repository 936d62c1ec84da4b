// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The on-disk shape of one index directory: a `meta.json` descriptor plus a
//! `documents.json` array. `mps-indexer` writes this shape from a structured
//! index stream; this crate only ever reads it back. Kept deliberately
//! simple — this is a reference provider, not the real storage engine the
//! SPI boundary insulates the core from (§1).

use std::path::Path;

use mps_spi::{IndexAccess, IndexUpdateFrequency};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMeta {
    pub description: Option<String>,
    pub language_code: Option<String>,
    pub tokenizer_name: Option<String>,
    pub stemmer_name: Option<String>,
    pub stop_list_name: Option<String>,
    #[serde(default)]
    pub access_control: StoredAccess,
    #[serde(default)]
    pub update_frequency: StoredFrequency,
    pub last_update_ansi_date: Option<u64>,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Default for StoredMeta {
    fn default() -> Self {
        StoredMeta {
            description: None,
            language_code: None,
            tokenizer_name: None,
            stemmer_name: None,
            stop_list_name: None,
            access_control: StoredAccess::default(),
            update_frequency: StoredFrequency::default(),
            last_update_ansi_date: None,
            case_sensitive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum StoredAccess {
    #[default]
    Unknown,
    Public,
    Private,
}

impl From<StoredAccess> for IndexAccess {
    fn from(a: StoredAccess) -> IndexAccess {
        match a {
            StoredAccess::Unknown => IndexAccess::Unknown,
            StoredAccess::Public => IndexAccess::Public,
            StoredAccess::Private => IndexAccess::Private,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum StoredFrequency {
    #[default]
    Unknown,
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Never,
}

impl From<StoredFrequency> for IndexUpdateFrequency {
    fn from(f: StoredFrequency) -> IndexUpdateFrequency {
        match f {
            StoredFrequency::Unknown => IndexUpdateFrequency::Unknown,
            StoredFrequency::Always => IndexUpdateFrequency::Always,
            StoredFrequency::Hourly => IndexUpdateFrequency::Hourly,
            StoredFrequency::Daily => IndexUpdateFrequency::Daily,
            StoredFrequency::Weekly => IndexUpdateFrequency::Weekly,
            StoredFrequency::Monthly => IndexUpdateFrequency::Monthly,
            StoredFrequency::Never => IndexUpdateFrequency::Never,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub item_name: String,
    pub mime_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub data: Option<serde_bytes::ByteBuf>,
}

/// One indexed document: a `text` body the provider tokenizes at search
/// time (split on whitespace, lower-cased) plus the item list a retrieval
/// request reads back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub document_key: String,
    pub title: String,
    #[serde(default)]
    pub language_code: Option<String>,
    pub ansi_date: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub items: Vec<StoredItem>,
}

pub const META_FILE_NAME: &str = "meta.json";
pub const DOCUMENTS_FILE_NAME: &str = "documents.json";

pub fn meta_path(index_dir: &Path) -> std::path::PathBuf {
    index_dir.join(META_FILE_NAME)
}

pub fn documents_path(index_dir: &Path) -> std::path::PathBuf {
    index_dir.join(DOCUMENTS_FILE_NAME)
}
