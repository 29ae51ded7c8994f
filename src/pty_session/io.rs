use crossbeam_channel::Sender;
use std::io::{self, ErrorKind, Read};
use std::thread;
use std::time::Duration;
use tracing::debug;

pub fn should_retry_io_error(err: &io::Error) -> bool {
    err.kind() == ErrorKind::Interrupted || err.kind() == ErrorKind::WouldBlock
}

/// Continuously read from `reader` and forward chunks to the receiving side.
///
/// The thread exits on end-of-stream, on a non-retryable error, or once the
/// receiver is gone. Dropping the sender is how the receiver learns the
/// stream ended.
pub fn spawn_reader_thread<R>(mut reader: R, tx: Sender<Vec<u8>>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = [0u8; 4096];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buffer[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err) if should_retry_io_error(&err) => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(err) => {
                    debug!(error = %err, "input reader stopped");
                    break;
                }
            }
        }
    })
}
