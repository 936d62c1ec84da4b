// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Flags for the online MPS search server (§6 CLI (server)). `--help`/`-?`/
/// `--usage` and `--version` are all accepted, matching the three spellings
/// the original command line recognized.
#[derive(Debug, Parser)]
#[command(
    name = "mps-search-server",
    about = "Online MPS search server",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    #[arg(short = 'h', long, action = ArgAction::Help, global = true, help = "Print help")]
    pub help: Option<bool>,

    #[arg(short = '?', long = "usage", action = ArgAction::Help, global = true, hide = true)]
    pub usage: Option<bool>,

    #[arg(long, action = ArgAction::Version, help = "Print version")]
    pub version: Option<bool>,

    /// `proto:host:port`, repeatable. With none given the server serves a
    /// single stdio session instead of binding any listener.
    #[arg(long, action = ArgAction::Append)]
    pub socket: Vec<String>,

    #[arg(long, default_value_t = 60000)]
    pub timeout: u64,

    #[arg(long, default_value = ".")]
    pub configuration_directory: PathBuf,

    #[arg(long, default_value = ".")]
    pub index_directory: PathBuf,

    #[arg(long, default_value_os_t = std::env::temp_dir())]
    pub temporary_directory: PathBuf,

    /// Requires super-user privileges to actually change identity.
    #[arg(long)]
    pub user: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub children: usize,

    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    #[arg(long)]
    pub thread_stack_size: Option<u64>,

    #[arg(long, default_value_t = 200)]
    pub sessions: usize,

    #[arg(long, default_value_t = 250)]
    pub startup_interval: u64,

    #[arg(long)]
    pub daemon: bool,

    #[arg(long)]
    pub process_id_file: Option<PathBuf>,

    /// Validate configuration and exit without serving anything.
    #[arg(long)]
    pub check: bool,

    #[arg(long, default_value_t = 5.0)]
    pub max_load: f64,

    #[arg(long)]
    pub max_connection_load: Option<f64>,

    #[arg(long)]
    pub max_search_load: Option<f64>,

    #[arg(long)]
    pub max_retrieval_load: Option<f64>,

    #[arg(long)]
    pub max_information_load: Option<f64>,

    #[arg(long)]
    pub locale: Option<String>,

    /// `path|stderr|stdout`.
    #[arg(long, default_value = "stderr")]
    pub log: String,

    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub level: u8,
}
