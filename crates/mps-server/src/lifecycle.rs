// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Server lifecycle (C8): the three worker shapes (stdio, forked pool,
//! threaded pool, combinable), startup-interval pacing, signal handling, and
//! PID file management. Forking is grounded on `ddcommon::unix_utils::fork`'s
//! `alt_fork()` shape, simplified to the plain `libc::fork()` form — the
//! server core has no need for `alt_fork`'s ptrace-aware `clone()` flags,
//! that being a crashtracker-specific concern. Signal handling goes straight
//! through `libc::signal` rather than `tokio::signal`, since the core is
//! synchronous by design.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use mps_net::{Listener, NetError};
use mps_spi::{SearchProvider, Session};
use tracing::{error, info, warn};

use crate::admission::AdmissionController;
use crate::state::{self, WorkerHandle};

/// Which of the three worker shapes to run, and how many of each. `children
/// == 0` and `threads == 0` both mean "just one, in this process" — the
/// stdio shape has neither and is selected separately since it never binds a
/// listener at all.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPlan {
    pub children: usize,
    pub threads: usize,
}

impl WorkerPlan {
    pub fn single_process() -> WorkerPlan {
        WorkerPlan { children: 0, threads: 0 }
    }
}

/// Everything a worker loop needs that isn't already carried on `Listener`/
/// `SearchProvider`: how many client sessions to serve before recycling (§4.6
/// step bound), the accept/request timeouts, and the startup-interval pacing
/// value new workers are launched with.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub session_count: usize,
    pub request_timeout: Option<Duration>,
    pub accept_timeout: Option<Duration>,
    pub startup_interval: Duration,
    pub pid_file: Option<PathBuf>,
    /// `--thread-stack-size` in bytes; `None` uses the platform default.
    pub thread_stack_size: Option<usize>,
}

/// Writes the PID file at construction and removes it on drop, covering
/// every exit path (normal return, `?`, or panic unwind) with one write/one
/// removal, per §4.8's "written at startup and removed on normal exit".
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn create(path: PathBuf) -> anyhow::Result<PidFile> {
        use anyhow::Context;
        let pid = std::process::id();
        fs::write(&path, pid.to_string())
            .with_context(|| format!("failed to write PID file at {}", path.display()))?;
        Ok(PidFile { path })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(error = %err, path = %self.path.display(), "failed to remove PID file");
        }
    }
}

/// Installs the process-wide signal dispositions described in §4.8:
/// `SIGTERM`/`SIGINT` flip the shared termination flag (non-fatal: the
/// worker finishes its current client, then the loop bound notices the flag
/// and exits), `SIGHUP` is ignored, and in pool mode `SIGCHLD` is left at its
/// default disposition so `waitpid` in the forked-pool supervisor keeps
/// working. Must be called once, on the main thread, before any worker
/// thread is spawned — non-main threads inherit the disposition but never
/// install their own, matching "signal handling executes only on the main
/// thread/process".
pub fn install_signal_handlers(pool_mode: bool) {
    unsafe {
        libc::signal(libc::SIGTERM, request_termination_on_signal as libc::sighandler_t);
        libc::signal(libc::SIGINT, request_termination_on_signal as libc::sighandler_t);
        libc::signal(libc::SIGHUP, libc::SIG_IGN);
        if pool_mode {
            libc::signal(libc::SIGCHLD, libc::SIG_DFL);
        }
    }
}

extern "C" fn request_termination_on_signal(_signum: libc::c_int) {
    state::shared().termination_requested.store(true, Ordering::SeqCst);
}

/// The stdio worker shape: initialize SPI once, serve exactly one
/// serve-client loop over stdio, then shut SPI down. No listener, no
/// admission-class-Connection check (there is nothing to admit — stdio has
/// exactly one peer).
pub fn run_stdio_worker<P: SearchProvider>(
    provider: &P,
    session: &Session,
    admission: &AdmissionController,
    config: &LifecycleConfig,
) -> anyhow::Result<()> {
    provider.initialize_server(session)?;
    let listener = Listener::stdio();
    let handle = Arc::new(WorkerHandle::new());
    state::shared().register_worker(&handle);
    run_worker_loop(&listener, provider, session, admission, config, &handle);
    provider.shutdown_server(session)?;
    Ok(())
}

/// The session-serving loop common to every worker shape (§4.6): accept one
/// client, dispatch exactly one request/response, close the client side, and
/// repeat until `session_count` sessions have been served (0 = unbounded) or
/// termination was requested — whichever comes first. Always finishes the
/// client currently in flight before checking termination, per §4.8's
/// "worker finishes current client then exits" contract.
pub fn run_worker_loop<P: SearchProvider>(
    listener: &Listener,
    provider: &P,
    session: &Session,
    admission: &AdmissionController,
    config: &LifecycleConfig,
    handle: &WorkerHandle,
) {
    let mut served = 0usize;
    loop {
        match listener.accept_and_receive(config.accept_timeout, config.request_timeout) {
            Ok(mut transport) => {
                if let Err(err) = crate::dispatch_one(&mut transport, provider, session, admission) {
                    crate::log_dispatch_error(&err);
                }
                transport.close();
                served += 1;
            }
            Err(NetError::TimedOut) => {
                warn!("accept timed out waiting for a client");
            }
            Err(NetError::Closed) => {}
            Err(err) => {
                warn!(error = %err, "accept failed");
            }
        }

        if config.session_count != 0 && served >= config.session_count {
            break;
        }
        if state::shared().termination_requested() {
            break;
        }
    }
    handle.active.store(false, Ordering::SeqCst);
}

/// The threaded-pool shape (§4.8 item 3): spawns `plan.threads` detached
/// worker threads, each with its own duplicated listener and server session,
/// then acts as the supervisor — waking roughly every 100ms to count live
/// threads via `state::Shared::live_worker_count` and top back up to the
/// target, pacing new spawns by the startup interval (scaled by thread
/// count) while still in the warm-up window.
pub fn run_threaded_pool<P: SearchProvider + 'static>(
    listener: Listener,
    provider: Arc<P>,
    session: Session,
    admission: Arc<AdmissionController>,
    config: LifecycleConfig,
    plan: WorkerPlan,
) -> anyhow::Result<()> {
    provider.initialize_server(&session)?;
    let target = plan.threads.max(1);
    let mut warm_up_remaining = target;

    for _ in 0..target {
        spawn_worker_thread(&listener, &provider, &session, &admission, &config)?;
        if warm_up_remaining > 0 {
            std::thread::sleep(config.startup_interval);
            warm_up_remaining -= 1;
        }
    }

    loop {
        std::thread::sleep(Duration::from_millis(100));
        if state::shared().termination_requested() {
            break;
        }
        let live = state::shared().live_worker_count();
        if live < target {
            for _ in live..target {
                if let Err(err) = spawn_worker_thread(&listener, &provider, &session, &admission, &config) {
                    error!(error = %err, "failed to spawn replacement worker thread");
                }
                std::thread::sleep(config.startup_interval);
            }
        }
    }

    provider.shutdown_server(&session)?;
    Ok(())
}

fn spawn_worker_thread<P: SearchProvider + 'static>(
    listener: &Listener,
    provider: &Arc<P>,
    session: &Session,
    admission: &Arc<AdmissionController>,
    config: &LifecycleConfig,
) -> anyhow::Result<()> {
    let listener = listener.try_clone()?;
    let provider = Arc::clone(provider);
    let session = session.clone();
    let admission = Arc::clone(admission);
    let config = config.clone();
    let handle = Arc::new(WorkerHandle::new());
    state::shared().register_worker(&handle);
    state::shared().thread_count.fetch_add(1, Ordering::SeqCst);

    let mut builder = std::thread::Builder::new().name("mps-worker".into());
    if let Some(stack_size) = config.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }
    builder
        .spawn(move || {
            run_worker_loop(&listener, provider.as_ref(), &session, &admission, &config, &handle);
            state::shared().thread_count.fetch_sub(1, Ordering::SeqCst);
        })
        .map(|_| ())
        .map_err(anyhow::Error::from)
}

/// The forked-pool shape (§4.8 item 2): the parent forks until `plan.children`
/// children are alive, reaps exited children with `waitpid`, and replaces
/// them FIFO, subject to the same startup-interval pacing as the threaded
/// pool. Each child runs `child_main` — typically a single-process worker
/// loop or, when `plan.threads > 0`, a threaded pool of its own.
pub fn run_forked_pool(
    plan: WorkerPlan,
    startup_interval: Duration,
    mut child_main: impl FnMut() -> ! ,
) -> anyhow::Result<()> {
    let target = plan.children.max(1);
    let mut live_children: Vec<libc::pid_t> = Vec::with_capacity(target);

    for i in 0..target {
        spawn_child(&mut live_children, &mut child_main)?;
        if i + 1 < target {
            std::thread::sleep(startup_interval);
        }
    }

    loop {
        if state::shared().termination_requested() {
            for pid in &live_children {
                unsafe {
                    libc::kill(*pid, libc::SIGTERM);
                }
            }
            for pid in &live_children {
                unsafe {
                    let mut status = 0;
                    libc::waitpid(*pid, &mut status, 0);
                }
            }
            break;
        }

        let mut status = 0;
        let reaped = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if reaped > 0 {
            live_children.retain(|&pid| pid != reaped);
            info!(pid = reaped, "forked worker exited, spawning replacement");
            std::thread::sleep(startup_interval);
            spawn_child(&mut live_children, &mut child_main)?;
        } else {
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    Ok(())
}

fn spawn_child(live_children: &mut Vec<libc::pid_t>, child_main: &mut impl FnMut() -> !) -> anyhow::Result<()> {
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        anyhow::bail!("fork() failed");
    }
    if pid == 0 {
        child_main();
    }
    live_children.push(pid);
    Ok(())
}

/// Creates the PID file (if configured) for the lifetime of the returned
/// guard; dropping it removes the file. Call once from the top-level process
/// (never from a forked child, which would race the parent's removal).
pub fn maybe_create_pid_file(path: Option<&Path>) -> anyhow::Result<Option<impl Drop>> {
    match path {
        Some(p) => Ok(Some(PidFile::create(p.to_path_buf())?)),
        None => Ok(None),
    }
}
