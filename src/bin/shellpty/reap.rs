use std::io;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

const UNCOLLECTED_EXIT_CODE: u8 = 1;

enum ChildState {
    Exited(libc::c_int),
    Running,
    Gone,
}

/// Reap the child, escalating to SIGTERM if it outlives `timeout` after hangup.
///
/// Returns the raw wait status, or `None` if the child could not be collected.
pub(crate) fn wait_for_exit(child_pid: libc::pid_t, timeout: Duration) -> Option<libc::c_int> {
    match poll_exit(child_pid, timeout) {
        ChildState::Exited(status) => return Some(status),
        ChildState::Gone => return None,
        ChildState::Running => {}
    }
    // SAFETY: child_pid is a live child of this process that has not been reaped.
    if unsafe { libc::kill(child_pid, libc::SIGTERM) } != 0 {
        tracing::debug!(
            pid = child_pid,
            error = %io::Error::last_os_error(),
            "SIGTERM to child failed"
        );
    }
    match poll_exit(child_pid, timeout) {
        ChildState::Exited(status) => Some(status),
        ChildState::Running => {
            tracing::warn!(pid = child_pid, "child still running after SIGTERM; leaving it");
            None
        }
        ChildState::Gone => None,
    }
}

fn poll_exit(child_pid: libc::pid_t, timeout: Duration) -> ChildState {
    let start = Instant::now();
    let mut status = 0;
    loop {
        // SAFETY: waitpid with WNOHANG only inspects/reaps our own child.
        let ret = unsafe { libc::waitpid(child_pid, &mut status, libc::WNOHANG) };
        if ret > 0 {
            return ChildState::Exited(status);
        }
        if ret < 0 {
            tracing::debug!(
                pid = child_pid,
                error = %io::Error::last_os_error(),
                "waitpid failed"
            );
            return ChildState::Gone;
        }
        if start.elapsed() >= timeout {
            return ChildState::Running;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Map a wait status to the host's exit code, shell style (128 + signal).
///
/// A child that was never collected is reported as a failure.
pub(crate) fn exit_code(status: Option<libc::c_int>) -> ExitCode {
    ExitCode::from(exit_code_value(status))
}

fn exit_code_value(status: Option<libc::c_int>) -> u8 {
    match status {
        Some(status) if libc::WIFEXITED(status) => libc::WEXITSTATUS(status) as u8,
        Some(status) if libc::WIFSIGNALED(status) => {
            128u8.saturating_add(libc::WTERMSIG(status) as u8)
        }
        _ => UNCOLLECTED_EXIT_CODE,
    }
}
