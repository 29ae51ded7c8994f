pub mod config;
pub mod pty_session;
mod telemetry;
pub mod terminal_restore;

pub use pty_session::{PtyError, PtySession};
pub use telemetry::{init_tracing, tracing_log_path};
