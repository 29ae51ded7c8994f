use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, TryRecvError};
use shellpty::pty_session::{should_retry_io_error, PtyError, PtySession, TerminalMode};
use std::io::Write;
use std::time::Duration;

/// Why the relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelayEnd {
    /// `read` returned 0.
    EndOfStream,
    /// `read` failed with `EIO`: every slave descriptor is gone.
    Hangup,
}

/// Shuttle bytes until the child side of the PTY goes away.
///
/// The master is switched to non-blocking mode and polled for output and, while
/// input is pending, for room to write. Output is drained on every wakeup, so a
/// child that echoes everything it is fed never stalls the input side.
pub(crate) fn run_relay<W: Write>(
    session: &mut PtySession,
    input_rx: &Receiver<Vec<u8>>,
    output: &mut W,
    poll_interval: Duration,
) -> Result<RelayEnd> {
    session
        .set_nonblocking(true)
        .context("failed to make the PTY master non-blocking")?;
    let mut buffer = [0u8; 4096];
    let mut pending = PendingInput::default();
    loop {
        pending.refill(input_rx);
        let ready = session.poll_ready(pending.has_data(), poll_interval)?;
        if ready.writable {
            pending.write_to(session)?;
        }
        if ready.readable {
            if let Some(end) = drain_output(session, &mut buffer, output)? {
                return Ok(end);
            }
        }
    }
}

/// Read until the master would block. Returns the end reason once the child is gone.
fn drain_output<W: Write>(
    session: &mut PtySession,
    buffer: &mut [u8],
    output: &mut W,
) -> Result<Option<RelayEnd>> {
    loop {
        match session.read(buffer) {
            Ok(0) => return Ok(Some(RelayEnd::EndOfStream)),
            Ok(n) => {
                output
                    .write_all(&buffer[..n])
                    .context("failed to write PTY output")?;
                output.flush().context("failed to flush PTY output")?;
            }
            Err(err) if err.is_hangup() => return Ok(Some(RelayEnd::Hangup)),
            Err(PtyError::IoError(err)) if should_retry_io_error(&err) => return Ok(None),
            Err(err) => return Err(err).context("PTY read failed"),
        }
    }
}

/// Host input waiting for room in the PTY. Holds at most one channel chunk, so
/// a slow child backs up into the bounded channel and then the stdin thread.
#[derive(Debug, Default)]
struct PendingInput {
    data: Vec<u8>,
    offset: usize,
    closed: bool,
}

impl PendingInput {
    fn has_data(&self) -> bool {
        self.offset < self.data.len()
    }

    fn refill(&mut self, input_rx: &Receiver<Vec<u8>>) {
        if self.closed || self.has_data() {
            return;
        }
        self.offset = 0;
        match input_rx.try_recv() {
            Ok(chunk) => self.data = chunk,
            Err(TryRecvError::Empty) => self.data.clear(),
            Err(TryRecvError::Disconnected) => {
                // Host input ended; a canonical-mode reader needs VEOF to notice.
                self.data = vec![TerminalMode::standard().eof_char()];
                self.closed = true;
            }
        }
    }

    fn write_to(&mut self, session: &mut PtySession) -> Result<()> {
        if !self.has_data() {
            return Ok(());
        }
        match session.write(&self.data[self.offset..]) {
            Ok(n) => self.offset = (self.offset + n).min(self.data.len()),
            Err(err) if err.is_hangup() => self.discard(),
            Err(PtyError::IoError(err)) if should_retry_io_error(&err) => {}
            Err(err) => return Err(err).context("PTY write failed"),
        }
        Ok(())
    }

    /// The child hung up; nothing will read further input.
    fn discard(&mut self) {
        self.data.clear();
        self.offset = 0;
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn relay_forwards_input_and_stops_when_child_exits() {
        let mut session = PtySession::new();
        session.start("/bin/cat").unwrap();
        let pid = session.child_pid().unwrap();

        let (tx, rx) = bounded(4);
        tx.send(b"ping\n".to_vec()).unwrap();
        drop(tx);

        let mut output = Vec::new();
        let end = run_relay(&mut session, &rx, &mut output, Duration::from_millis(20)).unwrap();
        assert!(matches!(end, RelayEnd::Hangup | RelayEnd::EndOfStream));
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("ping\r\n"), "output: {text:?}");

        session.close();
        let status = crate::reap::wait_for_exit(pid, Duration::from_secs(2));
        assert!(status.is_some());
    }

    #[test]
    fn relay_survives_input_larger_than_pty_buffers() {
        let mut session = PtySession::new();
        session.start("/bin/cat").unwrap();
        let pid = session.child_pid().unwrap();

        // Far more than the line discipline and master buffers hold together.
        let lines = 3000;
        let (tx, rx) = bounded(8);
        let feeder = std::thread::spawn(move || {
            for i in 0..lines {
                let line = format!("{i:06} abcdefghijklmnopqrstuvwxyz0123\n");
                if tx.send(line.into_bytes()).is_err() {
                    break;
                }
            }
        });

        let mut output = Vec::new();
        let end = run_relay(&mut session, &rx, &mut output, Duration::from_millis(20)).unwrap();
        feeder.join().unwrap();
        assert!(matches!(end, RelayEnd::Hangup | RelayEnd::EndOfStream));
        let text = String::from_utf8_lossy(&output);
        let last = format!("{:06} abcdefghijklmnopqrstuvwxyz0123\r\n", lines - 1);
        assert!(text.contains(&last), "missing final line, got {} bytes", output.len());

        session.close();
        assert!(crate::reap::wait_for_exit(pid, Duration::from_secs(2)).is_some());
    }

    #[test]
    fn relay_on_closed_session_fails() {
        let mut session = PtySession::new();
        let (_tx, rx) = bounded::<Vec<u8>>(1);
        let mut output = Vec::new();
        assert!(run_relay(&mut session, &rx, &mut output, Duration::from_millis(1)).is_err());
    }
}
