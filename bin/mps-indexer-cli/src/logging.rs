// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wires `--log`/`--level` into a `tracing-subscriber` fmt layer. `--log`
//! selects the writer (`stderr`, `stdout`, or a file path); `--level` is the
//! original's `0..4` severity scale, mapped onto `tracing::Level`.

use std::io;

use anyhow::Context;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

fn level_filter(level: u8) -> Level {
    match level {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn install(log: &str, level: u8) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter(level).to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match log {
        "stderr" => {
            builder.with_writer(io::stderr).init();
        }
        "stdout" => {
            builder.with_writer(io::stdout).init();
        }
        path => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open --log file {path:?}"))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            FILE_GUARD.set(guard).ok();
            builder.with_writer(non_blocking).init();
        }
    }
    Ok(())
}
