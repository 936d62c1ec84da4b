// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CLI entry point for the offline indexer (§6 CLI (indexer)).

mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;

use mps_indexer::{build_index, IndexerOptions};

use cli::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::install(&args.log, args.level)?;

    let options = IndexerOptions {
        description: args.description.clone(),
        stoplist_name: args.stoplist.clone(),
        stopfile_path: args.stopfile.clone(),
        stemmer_name: args.stemmer.clone(),
        minimum_term_length: args.minimum_term_length,
        maximum_term_length: args.maximum_term_length,
        maximum_memory_mb: args.maximum_memory,
        suppress: args.suppress,
    };

    let index_dir = args.index_directory.join(&args.index);

    let stats = match &args.stream {
        Some(path) => {
            let file = std::fs::File::open(path).with_context(|| format!("failed to open --stream file {}", path.display()))?;
            build_index(file, &index_dir, &options)?
        }
        None => build_index(std::io::stdin(), &index_dir, &options)?,
    };

    if !args.suppress {
        tracing::info!(
            index = %args.index,
            documents = stats.document_count,
            bytes = stats.bytes_consumed,
            "index build complete"
        );
    }
    Ok(())
}
