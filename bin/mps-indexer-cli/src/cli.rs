// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Flags for the offline indexer CLI (§6 CLI (indexer)).
#[derive(Debug, Parser)]
#[command(
    name = "mps-indexer-cli",
    about = "Builds an MPS index directory from a structured index stream",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    #[arg(short = 'h', long, action = ArgAction::Help, global = true, help = "Print help")]
    pub help: Option<bool>,

    #[arg(long, action = ArgAction::Version, help = "Print version")]
    pub version: Option<bool>,

    #[arg(long, default_value = ".")]
    pub configuration_directory: PathBuf,

    #[arg(long, default_value = ".")]
    pub index_directory: PathBuf,

    #[arg(long, default_value_os_t = std::env::temp_dir())]
    pub temporary_directory: PathBuf,

    #[arg(long)]
    pub index: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub stoplist: Option<String>,

    /// Overrides `--stoplist` when given.
    #[arg(long)]
    pub stopfile: Option<String>,

    #[arg(long)]
    pub stemmer: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub minimum_term_length: usize,

    #[arg(long, default_value_t = 64)]
    pub maximum_term_length: usize,

    /// Defaults to standard input when not given.
    #[arg(long)]
    pub stream: Option<PathBuf>,

    #[arg(long, default_value_t = 512)]
    pub maximum_memory: u64,

    /// Suppresses progress logging.
    #[arg(long)]
    pub suppress: bool,

    #[arg(long)]
    pub locale: Option<String>,

    #[arg(long, default_value = "stderr")]
    pub log: String,

    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub level: u8,
}
