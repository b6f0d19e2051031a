//! Per-sink worker threads
//!
//! Each queued sink gets a lane: an unbounded channel plus one thread that
//! owns the sink. The dispatcher drops a batch into the channel and moves
//! on. The lane writes batches strictly in arrival order, so two batches
//! for the same sink can never interleave, and a slow or failing sink only
//! ever delays its own lane.

use super::config::SharedConfig;
use super::error::{LoggerError, Result};
use super::log_entry::LogEntry;
use super::metrics::PipelineMetrics;
use super::sink::BatchSink;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LANE_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) enum LaneMessage {
    Batch(Vec<LogEntry>),
    /// Write the batch, flush the sink, then acknowledge
    Flush {
        batch: Vec<LogEntry>,
        ack: Sender<()>,
    },
    Close,
}

/// Cloneable sending side of a lane
#[derive(Clone)]
pub(crate) struct LaneHandle {
    name: Arc<str>,
    sender: Sender<LaneMessage>,
}

impl LaneHandle {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Fire-and-forget hand-off. `false` once the lane is gone.
    pub(crate) fn submit(&self, batch: Vec<LogEntry>) -> bool {
        self.sender.send(LaneMessage::Batch(batch)).is_ok()
    }

    /// Hand off a batch and wait until the sink has written and flushed it.
    pub(crate) fn submit_and_wait(&self, batch: Vec<LogEntry>, timeout: Duration) -> Result<()> {
        let (ack, acked) = bounded(1);
        self.sender
            .send(LaneMessage::Flush { batch, ack })
            .map_err(|_| LoggerError::sink_unavailable(self.name()))?;
        acked
            .recv_timeout(timeout)
            .map_err(|_| LoggerError::sink_unavailable(self.name()))
    }
}

pub(crate) struct SinkLane {
    handle: LaneHandle,
    thread: Option<thread::JoinHandle<()>>,
}

impl SinkLane {
    /// Start a lane for `sink`. With `coalesce`, batches that arrive within
    /// the configured display refresh interval are merged before delivery.
    pub(crate) fn spawn(
        sink: Box<dyn BatchSink>,
        metrics: Arc<PipelineMetrics>,
        coalesce: Option<Arc<SharedConfig>>,
    ) -> Result<Self> {
        let name: Arc<str> = Arc::from(sink.name());
        let (sender, receiver) = unbounded();
        let thread_name = format!("log-sink-{}", name);

        let worker = LaneWorker {
            sink,
            receiver,
            metrics,
            coalesce,
        };
        let thread = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|e| LoggerError::thread_spawn(thread_name, e))?;

        Ok(Self {
            handle: LaneHandle { name, sender },
            thread: Some(thread),
        })
    }

    pub(crate) fn handle(&self) -> LaneHandle {
        self.handle.clone()
    }

    /// Ask the worker to finish queued batches and exit, waiting up to `timeout`.
    ///
    /// Returns `false` if the worker did not stop in time or had panicked.
    pub(crate) fn close(&mut self, timeout: Duration) -> bool {
        let Some(thread) = self.thread.take() else {
            return true;
        };
        let _ = self.handle.sender.send(LaneMessage::Close);

        let start = Instant::now();
        loop {
            if thread.is_finished() {
                if let Err(e) = thread.join() {
                    eprintln!(
                        "[LOGGER ERROR] Sink lane '{}' panicked during shutdown: {}",
                        self.handle.name(),
                        panic_message(&e)
                    );
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Sink lane '{}' did not finish within {:?}. \
                     Some entries may be lost.",
                    self.handle.name(),
                    timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for SinkLane {
    fn drop(&mut self) {
        self.close(LANE_CLOSE_TIMEOUT);
    }
}

struct LaneWorker {
    sink: Box<dyn BatchSink>,
    receiver: Receiver<LaneMessage>,
    metrics: Arc<PipelineMetrics>,
    coalesce: Option<Arc<SharedConfig>>,
}

impl LaneWorker {
    fn run(mut self) {
        let mut pending: Option<LaneMessage> = None;

        loop {
            let message = match pending.take() {
                Some(message) => message,
                None => match self.receiver.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            match message {
                LaneMessage::Batch(mut batch) => {
                    if let Some(window) = self.coalesce_window() {
                        pending = self.gather(&mut batch, window);
                    }
                    self.deliver(&batch);
                }
                LaneMessage::Flush { batch, ack } => {
                    self.deliver(&batch);
                    let _ = ack.send(());
                }
                LaneMessage::Close => break,
            }
        }
    }

    fn coalesce_window(&self) -> Option<Duration> {
        self.coalesce
            .as_ref()
            .map(|config| config.display_refresh_interval())
    }

    /// Merge batches arriving before the window closes. A non-batch message
    /// ends the window early and is handed back to the caller.
    fn gather(&self, batch: &mut Vec<LogEntry>, window: Duration) -> Option<LaneMessage> {
        let deadline = Instant::now() + window;
        loop {
            match self.receiver.recv_deadline(deadline) {
                Ok(LaneMessage::Batch(more)) => batch.extend(more),
                Ok(other) => return Some(other),
                Err(_) => return None,
            }
        }
    }

    /// Write and flush one batch, isolating errors and panics from the lane.
    fn deliver(&mut self, batch: &[LogEntry]) {
        if batch.is_empty() {
            return;
        }

        let sink = &mut self.sink;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sink.write_batch(batch)?;
            sink.flush()
        }));

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.metrics.record_sink_failure();
                eprintln!(
                    "[LOGGER ERROR] Sink '{}' failed, {} entries discarded: {}",
                    self.sink.name(),
                    batch.len(),
                    e
                );
            }
            Err(panic_info) => {
                self.metrics.record_sink_panic();
                eprintln!(
                    "[LOGGER CRITICAL] Sink '{}' panicked: {}. \
                     Other sinks continue to function.",
                    self.sink.name(),
                    panic_message(&panic_info)
                );
            }
        }
    }
}

pub(crate) fn panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LoggerConfig;
    use crate::core::log_level::LogLevel;
    use parking_lot::Mutex;

    struct RecordingSink {
        batches: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl BatchSink for RecordingSink {
        fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
            self.batches
                .lock()
                .push(entries.iter().map(|e| e.raw_message().to_string()).collect());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct PanickingSink;

    impl BatchSink for PanickingSink {
        fn write_batch(&mut self, _entries: &[LogEntry]) -> Result<()> {
            panic!("sink exploded");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn batch(messages: &[&str]) -> Vec<LogEntry> {
        messages
            .iter()
            .map(|m| LogEntry::new(LogLevel::Info, *m))
            .collect()
    }

    #[test]
    fn test_batches_arrive_in_order() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let mut lane = SinkLane::spawn(
            Box::new(RecordingSink {
                batches: Arc::clone(&batches),
            }),
            Arc::new(PipelineMetrics::new()),
            None,
        )
        .expect("lane spawns");

        let handle = lane.handle();
        assert!(handle.submit(batch(&["a", "b"])));
        assert!(handle.submit(batch(&["c"])));
        handle
            .submit_and_wait(batch(&["d"]), Duration::from_secs(5))
            .expect("flush acknowledged");

        assert_eq!(
            *batches.lock(),
            vec![vec!["a", "b"], vec!["c"], vec!["d"]]
        );
        assert!(lane.close(Duration::from_secs(5)));
        assert!(!handle.submit(batch(&["late"])));
    }

    #[test]
    fn test_panicking_sink_is_isolated() {
        let metrics = Arc::new(PipelineMetrics::new());
        let mut lane = SinkLane::spawn(Box::new(PanickingSink), Arc::clone(&metrics), None)
            .expect("lane spawns");

        let handle = lane.handle();
        handle.submit(batch(&["first"]));
        handle
            .submit_and_wait(batch(&["second"]), Duration::from_secs(5))
            .expect("lane survives the panic");

        assert_eq!(metrics.sink_panics(), 2);
        assert!(lane.close(Duration::from_secs(5)));
    }

    #[test]
    fn test_coalescing_merges_close_batches() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let config = Arc::new(SharedConfig::new(
            LoggerConfig::default().with_display_refresh_interval(Duration::from_millis(200)),
        ));
        let mut lane = SinkLane::spawn(
            Box::new(RecordingSink {
                batches: Arc::clone(&batches),
            }),
            Arc::new(PipelineMetrics::new()),
            Some(config),
        )
        .expect("lane spawns");

        let handle = lane.handle();
        handle.submit(batch(&["a"]));
        handle.submit(batch(&["b"]));
        assert!(lane.close(Duration::from_secs(5)));

        assert_eq!(*batches.lock(), vec![vec!["a", "b"]]);
    }
}
