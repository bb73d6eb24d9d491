//! Three one-way channels from the installer to whoever is watching it:
//! progress text, errors, and a single completion signal.
//!
//! The installer owns the [`ProgressSender`] for the whole run. Dropping it
//! fires the completion signal and then closes all three channels, so a
//! consumer that has seen completion can stop reading.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError},
        Arc,
    },
    time::Duration,
};

use tracing::warn;

use crate::error::InstallerError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What happens when the output buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backpressure {
    /// Stall the producer until the consumer catches up.
    #[default]
    Block,
    /// Discard the line and count it.
    DropNewest,
}

/// Channel sizing. Errors always block, they are never dropped.
#[derive(Debug, Clone, Copy)]
pub struct ChannelOptions {
    pub output_capacity: usize,
    pub error_capacity: usize,
    pub output_policy: Backpressure,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            output_capacity: 50,
            error_capacity: 10,
            output_policy: Backpressure::Block,
        }
    }
}

pub fn channel(options: ChannelOptions) -> (ProgressSender, ProgressReceiver) {
    let (output_tx, output_rx) = mpsc::sync_channel(options.output_capacity);
    let (errors_tx, errors_rx) = mpsc::sync_channel(options.error_capacity);
    let (done_tx, done_rx) = mpsc::sync_channel(1);

    let sender = ProgressSender {
        output: OutputSink {
            tx: output_tx,
            policy: options.output_policy,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        errors: errors_tx,
        done: Some(done_tx),
    };
    let receiver = ProgressReceiver {
        output: output_rx,
        errors: errors_rx,
        done: done_rx,
    };
    (sender, receiver)
}

// ── Producer side ─────────────────────────────────────────────────────────────

/// Cloneable handle for progress text. Subprocess relays hold one per stream.
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: SyncSender<String>,
    policy: Backpressure,
    dropped: Arc<AtomicU64>,
}

impl OutputSink {
    /// Sends one line. A vanished consumer is not an error for the producer.
    pub fn send(&self, line: impl Into<String>) {
        let line = line.into();
        match self.policy {
            Backpressure::Block => {
                let _ = self.tx.send(line);
            }
            Backpressure::DropNewest => match self.tx.try_send(line) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            },
        }
    }

    /// Lines discarded under [`Backpressure::DropNewest`].
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct ProgressSender {
    output: OutputSink,
    errors: SyncSender<InstallerError>,
    done: Option<SyncSender<()>>,
}

impl ProgressSender {
    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn say(&self, line: impl Into<String>) {
        self.output.send(line);
    }

    pub fn report(&self, err: InstallerError) {
        if let Err(mpsc::SendError(err)) = self.errors.send(err) {
            warn!(error = %err, "error reported after the consumer went away");
        }
    }

    /// Ends the run: completion fires, then every channel closes.
    pub fn finish(self) {}
}

impl Drop for ProgressSender {
    fn drop(&mut self) {
        let dropped = self.output.dropped();
        if dropped > 0 {
            warn!(dropped, "progress lines were discarded under backpressure");
        }
        if let Some(done) = self.done.take() {
            // Capacity one and sent once, so this never blocks.
            let _ = done.try_send(());
        }
    }
}

// ── Consumer side ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ProgressEvent {
    Output(String),
    Error(InstallerError),
}

#[derive(Debug)]
pub struct ProgressReceiver {
    pub output: Receiver<String>,
    pub errors: Receiver<InstallerError>,
    pub done: Receiver<()>,
}

impl ProgressReceiver {
    /// Reads all three channels until completion, handing every line and
    /// error to `handle`. Returns once the installer has fully terminated.
    pub fn drain(self, mut handle: impl FnMut(ProgressEvent)) {
        loop {
            while let Ok(err) = self.errors.try_recv() {
                handle(ProgressEvent::Error(err));
            }

            match self.output.recv_timeout(POLL_INTERVAL) {
                Ok(line) => handle(ProgressEvent::Output(line)),
                Err(RecvTimeoutError::Timeout) => {}
                // Completion is always sent before the output end closes.
                Err(RecvTimeoutError::Disconnected) => std::thread::yield_now(),
            }

            match self.done.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
        }

        // Everything sent before completion is still buffered.
        for line in self.output.try_iter() {
            handle(ProgressEvent::Output(line));
        }
        for err in self.errors.try_iter() {
            handle(ProgressEvent::Error(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn drop_fires_completion_then_closes() {
        let (tx, rx) = channel(ChannelOptions::default());
        tx.say("hello");
        tx.finish();

        assert_eq!(rx.done.recv(), Ok(()));
        assert!(rx.done.recv().is_err());
        assert_eq!(rx.output.recv().unwrap(), "hello");
        assert!(rx.output.recv().is_err());
        assert!(rx.errors.recv().is_err());
    }

    #[test]
    fn drain_collects_everything_sent_before_completion() {
        let (tx, rx) = channel(ChannelOptions {
            output_capacity: 2,
            error_capacity: 1,
            output_policy: Backpressure::Block,
        });

        let producer = thread::spawn(move || {
            for i in 0..100 {
                tx.say(format!("line {}", i));
                if i % 25 == 0 {
                    tx.report(InstallerError::InvalidConfig(format!("e{}", i)));
                }
            }
        });

        let mut lines = Vec::new();
        let mut errors = Vec::new();
        rx.drain(|event| match event {
            ProgressEvent::Output(l) => lines.push(l),
            ProgressEvent::Error(e) => errors.push(e.to_string()),
        });
        producer.join().unwrap();

        assert_eq!(lines.len(), 100);
        assert_eq!(lines[0], "line 0");
        assert_eq!(lines[99], "line 99");
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn drop_policy_counts_discarded_lines() {
        let (tx, rx) = channel(ChannelOptions {
            output_capacity: 1,
            error_capacity: 1,
            output_policy: Backpressure::DropNewest,
        });
        tx.say("kept");
        tx.say("lost");
        tx.say("lost too");
        assert_eq!(tx.output().dropped(), 2);
        drop(tx);

        let lines: Vec<String> = rx.output.try_iter().collect();
        assert_eq!(lines, vec!["kept"]);
    }
}
