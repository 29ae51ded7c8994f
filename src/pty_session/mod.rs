//! Single pseudoterminal session: spawn a program on a PTY and move bytes
//! through its master side.

mod error;
mod io;
mod mode;
mod pty;
mod session;


pub use error::PtyError;
pub use io::{should_retry_io_error, spawn_reader_thread};
pub use mode::{ControlChars, TerminalMode, WindowSize};
pub use pty::Readiness;
pub use session::PtySession;
