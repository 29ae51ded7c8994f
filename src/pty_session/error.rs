use std::io;
use thiserror::Error;

/// Failures reported by [`PtySession`](super::PtySession).
#[derive(Debug, Error)]
pub enum PtyError {
    /// `start` was called on a session that is still open.
    #[error("PTY session is already open")]
    AlreadyOpen,

    /// `read`, `write` or `poll_readable` was called on a closed session.
    #[error("PTY session is not open")]
    NotOpen,

    /// The command cannot be handed to `execve`.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Allocating the pseudoterminal pair or forking the child failed.
    #[error("failed to allocate PTY: {0}")]
    AllocationFailed(#[source] io::Error),

    /// The master side reported an OS error.
    #[error("PTY I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl PtyError {
    /// True when the error means the slave side hung up (child exited).
    ///
    /// Linux reports `EIO` on the master once every slave descriptor is closed.
    pub fn is_hangup(&self) -> bool {
        match self {
            PtyError::IoError(err) => err.raw_os_error() == Some(libc::EIO),
            _ => false,
        }
    }
}

impl From<PtyError> for io::Error {
    fn from(err: PtyError) -> Self {
        match err {
            PtyError::IoError(inner) => inner,
            PtyError::AllocationFailed(inner) => inner,
            PtyError::NotOpen => io::Error::new(io::ErrorKind::NotConnected, err),
            PtyError::AlreadyOpen => io::Error::new(io::ErrorKind::AlreadyExists, err),
            PtyError::InvalidCommand(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
        }
    }
}
