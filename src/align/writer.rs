//! Single-writer serialization of per-query alignment output, optionally
//! reordered into query-id-ascending order.
//!
//! One dedicated thread owns the real writer and receives lines over an
//! `mpsc` channel, so many `rayon` workers can call `write` concurrently
//! without interleaving output. Each message is tagged with the query's
//! position in the (sorted) query-id list it was dispatched from and, by
//! default, out-of-order arrivals are buffered so they drain in
//! ascending order before being handed to the channel. `--unordered`
//! skips the reorder buffer entirely.

use std::collections::BinaryHeap;
use std::cmp::Reverse;
use std::io::Write;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// A clonable handle to the output writer thread. Every clone shares the
/// same channel; only the original (returned by [`AlignmentWriter::spawn`])
/// carries the thread handle, and [`AlignmentWriter::finish`] must be
/// called on it to flush and propagate any I/O error.
pub struct AlignmentWriter {
    sender: Sender<Message>,
    thread: Option<JoinHandle<std::io::Result<()>>>,
}

enum Message {
    Record { index: usize, lines: Vec<String> },
    Flush,
}

impl Clone for AlignmentWriter {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone(), thread: None }
    }
}

impl AlignmentWriter {
    /// Spawns the writer thread. `ordered` selects whether records are
    /// buffered until their index is the next expected one (ascending
    /// order, starting from 0) or written immediately as they arrive.
    pub fn spawn<W>(mut writer: W, ordered: bool) -> Self
    where
        W: Write + Send + 'static, {
        let (sender, receiver) = mpsc::channel::<Message>();

        let thread = thread::spawn(move || -> std::io::Result<()> {
            let mut pending: BinaryHeap<Reverse<(usize, Vec<String>)>> = BinaryHeap::new();
            let mut next_index = 0usize;

            while let Ok(message) = receiver.recv() {
                match message {
                    Message::Record { index, lines } => {
                        if !ordered {
                            for line in lines {
                                writeln!(writer, "{line}")?;
                            }
                            continue;
                        }

                        pending.push(Reverse((index, lines)));
                        while let Some(Reverse((idx, _))) = pending.peek()
                            && *idx == next_index
                        {
                            let Reverse((_, lines)) = pending.pop().unwrap();
                            for line in lines {
                                writeln!(writer, "{line}")?;
                            }
                            next_index += 1;
                        }
                    }
                    Message::Flush => break,
                }
            }

            // Anything still pending means a gap in the index sequence
            // (should not happen: callers dispatch every index exactly
            // once), but drain it in ascending order regardless rather
            // than silently dropping output.
            while let Some(Reverse((_, lines))) = pending.pop() {
                for line in lines {
                    writeln!(writer, "{line}")?;
                }
            }

            writer.flush()
        });

        Self { sender, thread: Some(thread) }
    }

    /// Submits the lines produced for the query at `index` in the
    /// caller's dispatch order.
    pub fn write(&self, index: usize, lines: Vec<String>) {
        // The receiver only disappears once `finish` has signalled the
        // writer thread to stop, at which point no further calls happen.
        let _ = self.sender.send(Message::Record { index, lines });
    }

    /// Signals the writer thread to flush and exit, then joins it,
    /// propagating any I/O error encountered while writing.
    pub fn finish(self) -> std::io::Result<()> {
        let Some(thread) = self.thread else { return Ok(()) };
        let _ = self.sender.send(Message::Flush);
        thread.join().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn reorders_out_of_order_arrivals_by_index() {
        let shared = Arc::new(Mutex::new(Vec::new()));
        let writer = AlignmentWriter::spawn(SharedBuf(shared.clone()), true);

        writer.write(2, vec!["c".to_string()]);
        writer.write(0, vec!["a".to_string()]);
        writer.write(1, vec!["b".to_string()]);

        writer.finish().unwrap();
        let output = String::from_utf8(shared.lock().unwrap().clone()).unwrap();
        assert_eq!(output, "a\nb\nc\n");
    }

    #[test]
    fn unordered_mode_writes_as_received() {
        let shared = Arc::new(Mutex::new(Vec::new()));
        let writer = AlignmentWriter::spawn(SharedBuf(shared.clone()), false);
        writer.write(5, vec!["x".to_string()]);
        writer.write(1, vec!["y".to_string()]);
        writer.finish().unwrap();

        let output = String::from_utf8(shared.lock().unwrap().clone()).unwrap();
        assert_eq!(output, "x\ny\n");
    }
}
