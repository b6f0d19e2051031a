//! Background batch dispatcher
//!
//! One thread drains the ingest queue in adaptive batches, splits each batch
//! by route and hands the partitions to the sink lanes without waiting on
//! them. Between cycles it sleeps for an interval that shrinks as the queue
//! grows, and wakes immediately when asked to stop.

use super::config::SharedConfig;
use super::error::{LoggerError, Result};
use super::lane::{panic_message, LaneHandle};
use super::log_entry::LogEntry;
use super::metrics::PipelineMetrics;
use super::queue::IngestQueue;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on how far a burst can stretch one batch, as a multiple of
/// the configured batch size
pub const BURST_BATCH_MULTIPLIER: usize = 8;

/// How long a flush waits for the file sink to acknowledge its write
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of entries to drain for the observed queue depth.
///
/// At or below `base` this is just `base`. Deeper queues get larger batches,
/// capped at `base * BURST_BATCH_MULTIPLIER`.
pub fn adaptive_batch_size(depth: usize, base: usize) -> usize {
    let base = base.max(1);
    if depth <= base {
        base
    } else {
        depth.min(base.saturating_mul(BURST_BATCH_MULTIPLIER))
    }
}

/// Sleep before the next cycle for the observed queue depth.
///
/// An empty queue sleeps the full `idle` interval. Otherwise the interval is
/// divided by `1 + 4 * depth / base` and never drops below `floor`.
pub fn adaptive_interval(depth: usize, base: usize, idle: Duration, floor: Duration) -> Duration {
    if depth == 0 {
        return idle;
    }
    let base = base.max(1) as u64;
    let divisor = 1 + (depth as u64).saturating_mul(4) / base;
    let divisor = u32::try_from(divisor).unwrap_or(u32::MAX);
    (idle / divisor).max(floor)
}

/// Phase of the dispatcher thread, for liveness probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DispatcherState {
    /// Sleeping between cycles
    Idle = 0,
    /// Pulling and handing off a batch
    Draining = 1,
    /// The loop has exited
    Stopped = 2,
}

impl DispatcherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DispatcherState::Idle,
            1 => DispatcherState::Draining,
            _ => DispatcherState::Stopped,
        }
    }
}

impl std::fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DispatcherState::Idle => "idle",
            DispatcherState::Draining => "draining",
            DispatcherState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Queue, configuration and lane hand-offs shared by the logger and the
/// dispatcher thread
pub(crate) struct Pipeline {
    pub(crate) queue: IngestQueue,
    pub(crate) config: Arc<SharedConfig>,
    pub(crate) metrics: Arc<PipelineMetrics>,
    file_lane: Option<LaneHandle>,
    display_lane: Option<LaneHandle>,
    /// Held across drain + hand-off so a flush cannot overtake a batch
    dispatch_lock: Mutex<()>,
}

impl Pipeline {
    pub(crate) fn new(
        queue: IngestQueue,
        config: Arc<SharedConfig>,
        metrics: Arc<PipelineMetrics>,
        file_lane: Option<LaneHandle>,
        display_lane: Option<LaneHandle>,
    ) -> Self {
        Self {
            queue,
            config,
            metrics,
            file_lane,
            display_lane,
            dispatch_lock: Mutex::new(()),
        }
    }

    pub(crate) fn has_file_sink(&self) -> bool {
        self.file_lane.is_some()
    }

    pub(crate) fn has_display_sink(&self) -> bool {
        self.display_lane.is_some()
    }

    /// Run one drain cycle and return the queue depth left behind.
    pub(crate) fn dispatch_cycle(&self) -> usize {
        let _guard = self.dispatch_lock.lock();

        let depth = self.queue.len();
        if depth == 0 {
            return 0;
        }

        let batch = self
            .queue
            .drain(adaptive_batch_size(depth, self.config.batch_size()));
        if !batch.is_empty() {
            self.metrics.record_batch(batch.len());
            let (file, display) = self.partition(batch);
            if let Some(lane) = &self.file_lane {
                self.hand_off(lane, file);
            }
            if let Some(lane) = &self.display_lane {
                self.hand_off(lane, display);
            }
        }

        self.queue.len()
    }

    /// Swap out everything queued and wait until the file sink has written
    /// it, along with every batch handed to it earlier.
    ///
    /// The display partition is forwarded without waiting.
    pub(crate) fn flush_all(&self, timeout: Duration) -> Result<()> {
        let _guard = self.dispatch_lock.lock();

        let batch = self.queue.take_all();
        if !batch.is_empty() {
            self.metrics.record_batch(batch.len());
        }
        let (file, display) = self.partition(batch);

        if let Some(lane) = &self.display_lane {
            self.hand_off(lane, display);
        }
        match &self.file_lane {
            Some(lane) => lane.submit_and_wait(file, timeout),
            None => Ok(()),
        }
    }

    /// Split a batch by route. Entries routed to both sinks are cloned into
    /// the display partition; partitions without a lane stay empty.
    fn partition(&self, batch: Vec<LogEntry>) -> (Vec<LogEntry>, Vec<LogEntry>) {
        let want_file = self.has_file_sink();
        let want_display = self.has_display_sink();

        let mut file = Vec::with_capacity(if want_file { batch.len() } else { 0 });
        let mut display = Vec::new();
        for entry in batch {
            let to_file = want_file && entry.route_to_file();
            let to_display = want_display && entry.route_to_display();
            match (to_file, to_display) {
                (true, true) => {
                    display.push(entry.clone());
                    file.push(entry);
                }
                (true, false) => file.push(entry),
                (false, true) => display.push(entry),
                (false, false) => {}
            }
        }
        (file, display)
    }

    fn hand_off(&self, lane: &LaneHandle, batch: Vec<LogEntry>) {
        if batch.is_empty() {
            return;
        }
        let count = batch.len();
        if !lane.submit(batch) {
            self.metrics.record_sink_failure();
            eprintln!(
                "[LOGGER ERROR] {}, {} entries discarded",
                LoggerError::sink_unavailable(lane.name()),
                count
            );
        }
    }
}

#[derive(Debug)]
struct DispatcherStatus {
    state: AtomicU8,
    started: Instant,
    heartbeat_ms: AtomicU64,
}

impl DispatcherStatus {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(DispatcherState::Idle as u8),
            started: Instant::now(),
            heartbeat_ms: AtomicU64::new(0),
        }
    }

    fn set(&self, state: DispatcherState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn beat(&self) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.heartbeat_ms.store(elapsed, Ordering::Relaxed);
    }

    fn heartbeat_age(&self) -> Duration {
        let last = Duration::from_millis(self.heartbeat_ms.load(Ordering::Relaxed));
        self.started.elapsed().saturating_sub(last)
    }
}

/// Owner of the dispatcher thread
pub(crate) struct DispatcherHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
    status: Arc<DispatcherStatus>,
}

impl DispatcherHandle {
    pub(crate) fn spawn(pipeline: Arc<Pipeline>) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let status = Arc::new(DispatcherStatus::new());
        let thread_status = Arc::clone(&status);

        let thread = thread::Builder::new()
            .name("log-dispatcher".to_string())
            .spawn(move || run(pipeline, thread_status, shutdown_rx))
            .map_err(|e| LoggerError::thread_spawn("log-dispatcher", e))?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
            status,
        })
    }

    pub(crate) fn state(&self) -> DispatcherState {
        self.status.state()
    }

    pub(crate) fn heartbeat_age(&self) -> Duration {
        self.status.heartbeat_age()
    }

    pub(crate) fn is_alive(&self) -> bool {
        match &self.thread {
            Some(thread) => !thread.is_finished() && self.state() != DispatcherState::Stopped,
            None => false,
        }
    }

    /// Signal the loop and wait up to `timeout` for it to exit.
    ///
    /// The loop finishes the batch it is handing off before it stops.
    pub(crate) fn stop(&mut self, timeout: Duration) -> bool {
        drop(self.shutdown.take());

        let Some(thread) = self.thread.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if thread.is_finished() {
                if let Err(e) = thread.join() {
                    eprintln!(
                        "[LOGGER ERROR] Dispatcher thread panicked during shutdown: {}",
                        panic_message(&e)
                    );
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Dispatcher thread did not finish within {:?} timeout. \
                     Queued entries are left for the final flush.",
                    timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

fn run(pipeline: Arc<Pipeline>, status: Arc<DispatcherStatus>, shutdown: Receiver<()>) {
    loop {
        status.beat();
        if !pipeline.queue.is_empty() {
            status.set(DispatcherState::Draining);
        }

        let cycle = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pipeline.dispatch_cycle()
        }));
        let depth = match cycle {
            Ok(depth) => depth,
            Err(panic_info) => {
                pipeline.metrics.record_dispatcher_panic();
                eprintln!(
                    "[LOGGER CRITICAL] Dispatcher cycle panicked: {}. Continuing with the next cycle.",
                    panic_message(&panic_info)
                );
                pipeline.queue.len()
            }
        };
        status.set(DispatcherState::Idle);

        let config = &pipeline.config;
        let sleep = adaptive_interval(
            depth,
            config.batch_size(),
            config.drain_interval(),
            config.min_drain_interval(),
        );
        match shutdown.recv_timeout(sleep) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    status.set(DispatcherState::Stopped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LoggerConfig;
    use crate::core::lane::SinkLane;
    use crate::core::log_entry::Routes;
    use crate::core::log_level::LogLevel;
    use crate::core::sink::BatchSink;

    #[derive(Clone, Default)]
    struct Collected(Arc<Mutex<Vec<String>>>);

    impl Collected {
        fn messages(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    struct CollectingSink {
        name: &'static str,
        out: Collected,
    }

    impl BatchSink for CollectingSink {
        fn write_batch(&mut self, entries: &[LogEntry]) -> Result<()> {
            self.out
                .0
                .lock()
                .extend(entries.iter().map(|e| e.raw_message().to_string()));
            Ok(())
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    struct Harness {
        pipeline: Arc<Pipeline>,
        file: Collected,
        display: Collected,
        lanes: Vec<SinkLane>,
    }

    impl Harness {
        fn new(config: LoggerConfig) -> Self {
            let metrics = Arc::new(PipelineMetrics::new());
            let file = Collected::default();
            let display = Collected::default();
            let file_lane = SinkLane::spawn(
                Box::new(CollectingSink {
                    name: "file",
                    out: file.clone(),
                }),
                Arc::clone(&metrics),
                None,
            )
            .expect("file lane");
            let display_lane = SinkLane::spawn(
                Box::new(CollectingSink {
                    name: "display",
                    out: display.clone(),
                }),
                Arc::clone(&metrics),
                None,
            )
            .expect("display lane");

            let pipeline = Arc::new(Pipeline::new(
                IngestQueue::unbounded(Arc::clone(&metrics)),
                Arc::new(SharedConfig::new(config)),
                metrics,
                Some(file_lane.handle()),
                Some(display_lane.handle()),
            ));
            Self {
                pipeline,
                file,
                display,
                lanes: vec![file_lane, display_lane],
            }
        }

        fn push(&self, message: &str, routes: Routes) {
            self.pipeline
                .queue
                .enqueue(LogEntry::new(LogLevel::Info, message).with_routes(routes));
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            for lane in &mut self.lanes {
                lane.close(Duration::from_secs(5));
            }
        }
    }

    #[test]
    fn test_adaptive_batch_size() {
        assert_eq!(adaptive_batch_size(0, 200), 200);
        assert_eq!(adaptive_batch_size(200, 200), 200);
        assert_eq!(adaptive_batch_size(500, 200), 500);
        assert_eq!(adaptive_batch_size(10_000, 200), 1600);
        assert_eq!(adaptive_batch_size(5, 0), 5);
    }

    #[test]
    fn test_adaptive_interval() {
        let idle = Duration::from_millis(500);
        let floor = Duration::from_millis(10);

        assert_eq!(adaptive_interval(0, 200, idle, floor), idle);
        assert_eq!(adaptive_interval(10, 200, idle, floor), idle);
        assert_eq!(
            adaptive_interval(200, 200, idle, floor),
            Duration::from_millis(100)
        );
        assert_eq!(adaptive_interval(100_000, 200, idle, floor), floor);
    }

    #[test]
    fn test_deeper_queue_never_sleeps_longer() {
        let idle = Duration::from_millis(500);
        let floor = Duration::from_millis(10);
        let mut previous = idle;
        for depth in [1, 50, 200, 400, 1000, 5000] {
            let next = adaptive_interval(depth, 200, idle, floor);
            assert!(next <= previous, "depth {} slept {:?}", depth, next);
            previous = next;
        }
    }

    #[test]
    fn test_cycle_routes_partitions() {
        let harness = Harness::new(LoggerConfig::default());
        harness.push("both", Routes::all());
        harness.push("file", Routes::file_only());
        harness.push("display", Routes::display_only());

        assert_eq!(harness.pipeline.dispatch_cycle(), 0);
        harness
            .pipeline
            .flush_all(DEFAULT_FLUSH_TIMEOUT)
            .expect("flush");

        assert_eq!(harness.file.messages(), vec!["both", "file"]);
        // display hand-off is not awaited
        let deadline = Instant::now() + Duration::from_secs(5);
        while harness.display.messages().len() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(harness.display.messages(), vec!["both", "display"]);
    }

    #[test]
    fn test_cycle_respects_batch_size() {
        let harness = Harness::new(LoggerConfig::default().with_batch_size(10));
        for i in 0..15 {
            harness.push(&i.to_string(), Routes::all());
        }

        assert_eq!(harness.pipeline.dispatch_cycle(), 0);
        for i in 15..200 {
            harness.push(&i.to_string(), Routes::all());
        }
        assert_eq!(harness.pipeline.dispatch_cycle(), 200 - 15 - 80);
    }

    #[test]
    fn test_flush_all_is_idempotent() {
        let harness = Harness::new(LoggerConfig::default());
        for i in 0..5 {
            harness.push(&i.to_string(), Routes::file_only());
        }

        harness.pipeline.flush_all(DEFAULT_FLUSH_TIMEOUT).expect("first flush");
        harness.pipeline.flush_all(DEFAULT_FLUSH_TIMEOUT).expect("second flush");

        assert!(harness.pipeline.queue.is_empty());
        assert_eq!(harness.file.messages(), vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_dispatcher_thread_drains_and_stops() {
        let harness = Harness::new(
            LoggerConfig::default().with_drain_interval(Duration::from_millis(20)),
        );
        let mut dispatcher =
            DispatcherHandle::spawn(Arc::clone(&harness.pipeline)).expect("dispatcher spawns");
        assert!(dispatcher.is_alive());

        for i in 0..50 {
            harness.push(&i.to_string(), Routes::file_only());
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        while !harness.pipeline.queue.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(harness.pipeline.queue.is_empty());

        assert!(dispatcher.stop(Duration::from_secs(5)));
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
        assert!(!dispatcher.is_alive());

        harness.pipeline.flush_all(DEFAULT_FLUSH_TIMEOUT).expect("flush");
        let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(harness.file.messages(), expected);
    }
}
