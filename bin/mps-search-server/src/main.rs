// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CLI entry point for the online MPS search server (§6 CLI (server)).
//! Parses flags, builds the listening sockets, and hands off to
//! `mps_server::lifecycle`'s worker shapes.

mod cli;
mod logging;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use mps_net::{EndpointSpec, Listener, SocketProtocol};
use mps_server::admission::{AdmissionController, AdmissionLimits};
use mps_server::lifecycle::{self, LifecycleConfig, WorkerPlan};
use mps_spi::{SearchProvider, Session};
use mps_spi_memory::MemoryProvider;

use cli::Args;

fn parse_socket_spec(raw: &str) -> anyhow::Result<EndpointSpec> {
    let parts: Vec<&str> = raw.splitn(3, ':').collect();
    let (protocol, host, port) = match parts.as_slice() {
        [port] => ("tcp", "", *port),
        [proto_or_host, port] => {
            if *proto_or_host == "tcp" || *proto_or_host == "udp" {
                (*proto_or_host, "", *port)
            } else {
                ("tcp", *proto_or_host, *port)
            }
        }
        [proto, host, port] => (*proto, *host, *port),
        _ => bail!("malformed --socket value {raw:?}, expected proto:host:port"),
    };
    let protocol = match protocol {
        "tcp" => SocketProtocol::Tcp,
        "udp" => SocketProtocol::Udp,
        other => bail!("unknown socket protocol {other:?}, expected tcp or udp"),
    };
    let host = if host.is_empty() {
        None
    } else {
        Some(host.parse::<IpAddr>().with_context(|| format!("invalid socket host {host:?}"))?)
    };
    let port = port.parse::<u16>().with_context(|| format!("invalid socket port {port:?}"))?;
    Ok(EndpointSpec { protocol, host, port })
}

fn build_admission_limits(args: &Args) -> AdmissionLimits {
    let mut limits = AdmissionLimits::uniform(args.max_load);
    if let Some(v) = args.max_connection_load {
        limits.connection = v;
    }
    if let Some(v) = args.max_search_load {
        limits.search = v;
    }
    if let Some(v) = args.max_retrieval_load {
        limits.retrieval = v;
    }
    if let Some(v) = args.max_information_load {
        limits.information = v;
    }
    limits
}

/// Drops to an unprivileged user after binding any sub-1025 ports, per
/// `--user`'s "requires super-user to change". Best-effort: failures are
/// fatal since continuing to run as the original (often root) user would
/// silently widen the blast radius of a compromised worker.
fn drop_privileges(user: &str) -> anyhow::Result<()> {
    use std::ffi::CString;
    let name = CString::new(user).context("--user contains a NUL byte")?;
    let passwd = unsafe { libc::getpwnam(name.as_ptr()) };
    if passwd.is_null() {
        bail!("--user {user:?} is not a known account");
    }
    let (uid, gid) = unsafe { ((*passwd).pw_uid, (*passwd).pw_gid) };
    unsafe {
        if libc::setgid(gid) != 0 {
            bail!("setgid({gid}) failed while dropping privileges for --user {user:?}");
        }
        if libc::setuid(uid) != 0 {
            bail!("setuid({uid}) failed while dropping privileges for --user {user:?}");
        }
    }
    Ok(())
}

/// `--daemon`: detach from the controlling terminal via the classic
/// double-fork-and-`setsid` sequence, redirecting the standard streams to
/// `/dev/null`. Must run before any worker thread is spawned — `fork()`
/// only duplicates the calling thread.
fn daemonize() -> anyhow::Result<()> {
    let devnull = std::ffi::CString::new("/dev/null").expect("static path has no interior NUL");
    unsafe {
        let pid = libc::fork();
        if pid < 0 {
            bail!("fork() failed while daemonizing");
        }
        if pid > 0 {
            std::process::exit(0);
        }
        if libc::setsid() < 0 {
            bail!("setsid() failed while daemonizing");
        }
        let pid = libc::fork();
        if pid < 0 {
            bail!("second fork() failed while daemonizing");
        }
        if pid > 0 {
            std::process::exit(0);
        }
        libc::close(0);
        libc::close(1);
        libc::close(2);
        let fd = libc::open(devnull.as_ptr(), libc::O_RDWR);
        if fd >= 0 {
            libc::dup2(fd, 0);
            libc::dup2(fd, 1);
            libc::dup2(fd, 2);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::install(&args.log, args.level)?;

    let session = Session {
        index_root: args.index_directory.clone(),
        configuration_path: args.configuration_directory.clone(),
        temporary_path: args.temporary_directory.clone(),
    };
    let admission = Arc::new(AdmissionController::new(build_admission_limits(&args)));
    let provider = Arc::new(MemoryProvider::new());

    if args.check {
        provider
            .initialize_server(&session)
            .context("configuration check failed")?;
        provider.shutdown_server(&session).ok();
        println!("configuration OK");
        return Ok(());
    }

    let sockets = args
        .socket
        .iter()
        .map(|s| parse_socket_spec(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Bind while still privileged (ports <= 1024 require it), then drop down
    // to --user for everything the server actually does with the sockets.
    let listeners = sockets
        .iter()
        .map(Listener::bind)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to bind --socket endpoint")?;

    if let Some(user) = &args.user {
        drop_privileges(user)?;
    }

    // Daemonize before installing signal handlers or writing the PID file, so
    // both reflect the final backgrounded process rather than the pre-fork
    // parent (`fork()` only duplicates the calling thread, and dispositions
    // set beforehand would apply to a PID that's about to exit).
    if args.daemon {
        daemonize()?;
    }

    let pool_mode = args.children > 0 || args.threads > 0;
    lifecycle::install_signal_handlers(pool_mode);
    let _pid_file = lifecycle::maybe_create_pid_file(args.process_id_file.as_deref())?;

    let request_timeout = if args.timeout == 0 { None } else { Some(Duration::from_millis(args.timeout)) };
    let config = LifecycleConfig {
        session_count: args.sessions,
        request_timeout,
        accept_timeout: request_timeout,
        startup_interval: Duration::from_millis(args.startup_interval),
        pid_file: args.process_id_file.clone(),
        thread_stack_size: args.thread_stack_size.map(|mb| (mb * 1024 * 1024) as usize),
    };
    let plan = WorkerPlan {
        children: args.children,
        threads: args.threads,
    };

    if listeners.is_empty() {
        return lifecycle::run_stdio_worker(provider.as_ref(), &session, &admission, &config);
    }

    run_listeners(listeners, provider, session, admission, config, plan)
}

fn run_listeners(
    listeners: Vec<Listener>,
    provider: Arc<MemoryProvider>,
    session: Session,
    admission: Arc<AdmissionController>,
    config: LifecycleConfig,
    plan: WorkerPlan,
) -> anyhow::Result<()> {
    if listeners.len() == 1 {
        let listener = listeners.into_iter().next().unwrap();
        return run_one_listener(listener, provider, session, admission, config, plan);
    }

    let mut handles = Vec::new();
    for listener in listeners {
        let provider = Arc::clone(&provider);
        let session = session.clone();
        let admission = Arc::clone(&admission);
        let config = config.clone();
        handles.push(std::thread::spawn(move || {
            run_one_listener(listener, provider, session, admission, config, plan)
        }));
    }
    for handle in handles {
        handle.join().expect("listener thread panicked")?;
    }
    Ok(())
}

fn run_one_listener(
    listener: Listener,
    provider: Arc<MemoryProvider>,
    session: Session,
    admission: Arc<AdmissionController>,
    config: LifecycleConfig,
    plan: WorkerPlan,
) -> anyhow::Result<()> {
    if plan.children > 0 {
        let startup_interval = config.startup_interval;
        return lifecycle::run_forked_pool(plan, startup_interval, move || {
            let result = if plan.threads > 0 {
                lifecycle::run_threaded_pool(
                    listener.try_clone().expect("listener clone in forked child"),
                    Arc::clone(&provider),
                    session.clone(),
                    Arc::clone(&admission),
                    config.clone(),
                    plan,
                )
            } else {
                provider.initialize_server(&session).expect("initialize_server in forked child");
                let handle = Arc::new(mps_server::state::WorkerHandle::new());
                mps_server::state::shared().register_worker(&handle);
                lifecycle::run_worker_loop(&listener, provider.as_ref(), &session, &admission, &config, &handle);
                provider.shutdown_server(&session)
            };
            if let Err(err) = result {
                tracing::error!(error = %err, "forked worker exited with error");
                std::process::exit(1);
            }
            std::process::exit(0);
        });
    }

    if plan.threads > 0 {
        return lifecycle::run_threaded_pool(listener, provider, session, admission, config, plan);
    }

    provider.initialize_server(&session)?;
    let handle = Arc::new(mps_server::state::WorkerHandle::new());
    mps_server::state::shared().register_worker(&handle);
    lifecycle::run_worker_loop(&listener, provider.as_ref(), &session, &admission, &config, &handle);
    provider.shutdown_server(&session)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_triple() {
        let spec = parse_socket_spec("udp:127.0.0.1:8080").unwrap();
        assert_eq!(spec.protocol, SocketProtocol::Udp);
        assert_eq!(spec.port, 8080);
        assert!(spec.host.is_some());
    }

    #[test]
    fn defaults_protocol_to_tcp_and_host_to_none() {
        let spec = parse_socket_spec("1729").unwrap();
        assert_eq!(spec.protocol, SocketProtocol::Tcp);
        assert_eq!(spec.port, 1729);
        assert!(spec.host.is_none());
    }

    #[test]
    fn rejects_unknown_protocol() {
        assert!(parse_socket_spec("sctp:127.0.0.1:80").is_err());
    }
}
