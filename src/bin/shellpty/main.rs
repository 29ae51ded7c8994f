//! shellpty entrypoint: run one program on a pseudoterminal and relay bytes
//! between it and the host terminal.
//!
//! # Architecture
//!
//! - Input thread: reads stdin and queues chunks for the PTY
//! - Relay loop: polls the non-blocking master, feeds pending input when it
//!   has room and copies output to stdout
//! - Reaper: collects the child's exit status once the session is closed

mod reap;
mod relay;

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use shellpty::config::AppConfig;
use shellpty::pty_session::spawn_reader_thread;
use shellpty::terminal_restore::TerminalRestoreGuard;
use shellpty::{init_tracing, PtySession};
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> Result<ExitCode> {
    let config = AppConfig::parse_args()?;
    init_tracing(&config);
    tracing::info!(command = %config.command, "=== shellpty started ===");

    let mut session = PtySession::new();
    session
        .start(&config.command)
        .with_context(|| format!("failed to start '{}'", config.command))?;
    let child_pid = session
        .child_pid()
        .context("PTY session opened without a child")?;

    // Past this point the child is running: every exit path closes and reaps it.
    let guard = TerminalRestoreGuard::new();
    let outcome = relay_session(&mut session, &guard, &config);
    session.close();
    if guard.is_raw() {
        guard.restore();
    }

    let status = reap::wait_for_exit(child_pid, Duration::from_millis(config.reap_timeout_ms));
    let end = outcome?;
    tracing::info!(?end, ?status, "=== shellpty finished ===");
    Ok(reap::exit_code(status))
}

/// Raw mode, the stdin thread and the relay loop for an open session.
fn relay_session(
    session: &mut PtySession,
    guard: &TerminalRestoreGuard,
    config: &AppConfig,
) -> Result<relay::RelayEnd> {
    if io::stdin().is_terminal() {
        guard
            .enable_raw_mode()
            .context("failed to put the terminal in raw mode")?;
    }

    let (input_tx, input_rx) = bounded(config.input_channel_capacity);
    // Left detached: it stays blocked on stdin until the process exits.
    let _input_thread = spawn_reader_thread(io::stdin(), input_tx);

    let stdout = io::stdout();
    relay::run_relay(
        session,
        &input_rx,
        &mut stdout.lock(),
        Duration::from_millis(config.poll_interval_ms),
    )
}
