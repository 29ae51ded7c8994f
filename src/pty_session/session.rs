use super::error::PtyError;
use super::mode::{TerminalMode, WindowSize};
use super::pty::{
    close_fd, read_fd, set_nonblocking, spawn_pty_child, wait_ready, write_fd, Readiness,
};
use std::ffi::CString;
use std::io;
use std::os::fd::{AsFd, OwnedFd};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// A child process running behind a pseudoterminal, driven through the master side.
///
/// The session is either closed or open. Only `start` opens it and only
/// `close` (or drop) releases the master, so the handle is valid exactly while
/// the session is open and is never duplicated.
///
/// Calls on one session must be serialized by the caller. `read` and `write`
/// block by default. Callers that feed input and drain output from one thread
/// should switch to [`set_nonblocking`](Self::set_nonblocking) and wait with
/// [`poll_ready`](Self::poll_ready): a blocked write cannot make progress while
/// the child is itself blocked on unread output.
///
/// The child is never waited on here. If `execve` fails in the child it prints
/// a diagnostic to the terminal and exits, which the host only observes as a
/// short burst of output followed by end-of-stream.
#[derive(Debug, Default)]
pub struct PtySession {
    state: SessionState,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Closed,
    Open(OpenPty),
}

#[derive(Debug)]
struct OpenPty {
    master: OwnedFd,
    child_pid: libc::pid_t,
}

impl PtySession {
    /// A closed session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `command` (no arguments, empty environment) on a fresh PTY and open the session.
    ///
    /// Fails with `AlreadyOpen` without touching the running child if the
    /// session is open. On any other failure the session stays closed and
    /// holds nothing.
    pub fn start(&mut self, command: &str) -> Result<(), PtyError> {
        if self.is_open() {
            return Err(PtyError::AlreadyOpen);
        }
        let command = validate_command(command)?;

        let (master, child_pid) = spawn_pty_child(
            &command,
            TerminalMode::standard(),
            WindowSize::DEFAULT,
        )
        .map_err(PtyError::AllocationFailed)?;

        debug!(pid = child_pid, command = ?command, "started PTY session");
        self.state = SessionState::Open(OpenPty { master, child_pid });
        Ok(())
    }

    /// Release the master side. Closing a closed session does nothing.
    pub fn close(&mut self) {
        if let SessionState::Open(open) = std::mem::take(&mut self.state) {
            let pid = open.child_pid;
            match close_fd(open.master) {
                Ok(()) => debug!(pid, "closed PTY session"),
                Err(err) => warn!(pid, error = %err, "closing PTY master failed"),
            }
        }
    }

    /// One blocking read from the master into `buf`.
    ///
    /// Returns the number of bytes read, which may be short. An empty `buf`
    /// returns `Ok(0)` without a syscall. Once the child has exited, Linux
    /// reports `EIO` (see [`PtyError::is_hangup`]) while other systems return `Ok(0)`.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, PtyError> {
        let open = self.open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = read_fd(open.master.as_fd(), buf)?;
        trace!(pid = open.child_pid, bytes = n, "PTY read");
        Ok(n)
    }

    /// One blocking write of `buf` to the master; may accept fewer bytes than offered.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, PtyError> {
        let open = self.open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = write_fd(open.master.as_fd(), buf)?;
        trace!(pid = open.child_pid, bytes = n, "PTY write");
        Ok(n)
    }

    /// Wait up to `timeout` until a `read` would not block.
    pub fn poll_readable(&self, timeout: Duration) -> Result<bool, PtyError> {
        Ok(self.poll_ready(false, timeout)?.readable)
    }

    /// Wait up to `timeout` for output, or for room to write when `want_write` is set.
    pub fn poll_ready(&self, want_write: bool, timeout: Duration) -> Result<Readiness, PtyError> {
        let open = self.open()?;
        Ok(wait_ready(open.master.as_fd(), want_write, timeout)?)
    }

    /// Switch the master between blocking and non-blocking I/O.
    ///
    /// In non-blocking mode `read` and `write` fail with a `WouldBlock`
    /// `IoError` instead of waiting (see [`should_retry_io_error`](super::should_retry_io_error)).
    pub fn set_nonblocking(&mut self, enabled: bool) -> Result<(), PtyError> {
        let open = self.open()?;
        set_nonblocking(open.master.as_fd(), enabled)?;
        debug!(pid = open.child_pid, enabled, "PTY master blocking mode changed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    /// Pid of the running child while the session is open.
    pub fn child_pid(&self) -> Option<libc::pid_t> {
        match &self.state {
            SessionState::Open(open) => Some(open.child_pid),
            SessionState::Closed => None,
        }
    }

    fn open(&self) -> Result<&OpenPty, PtyError> {
        match &self.state {
            SessionState::Open(open) => Ok(open),
            SessionState::Closed => Err(PtyError::NotOpen),
        }
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Read for PtySession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PtySession::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Write for PtySession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PtySession::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Owned C copy of the command; rejects what `execve` could never run.
pub(super) fn validate_command(command: &str) -> Result<CString, PtyError> {
    if command.trim().is_empty() {
        return Err(PtyError::InvalidCommand("command is empty".to_string()));
    }
    CString::new(command)
        .map_err(|_| PtyError::InvalidCommand(format!("command contains NUL byte: {command:?}")))
}
