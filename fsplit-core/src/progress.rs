use std::sync::{
    atomic::{AtomicU64, Ordering},
    mpsc::{self, RecvTimeoutError, Sender},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Observer for long-running operations. Split reports
/// `(bytes_written, total_bytes)`, merge reports `(chunks_merged, chunk_count)`.
///
/// Purely advisory: nothing a sink does can change the outcome.
pub trait ProgressSink {
    fn report(&self, done: u64, total: u64);
}

/// Discards every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _done: u64, _total: u64) {}
}

impl<F: Fn(u64, u64)> ProgressSink for F {
    fn report(&self, done: u64, total: u64) {
        self(done, total)
    }
}

/// Shared counters plus an optional ticker thread that logs the current
/// stage every `interval`. Clones share the same counters.
#[derive(Clone)]
pub struct Progress {
    enabled: bool,
    interval: Duration,
    pub stage: Arc<Mutex<String>>,
    pub done: Arc<AtomicU64>,
    pub total: Arc<AtomicU64>,
    ticker: Arc<Mutex<Option<Ticker>>>,
}

struct Ticker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            interval: Duration::from_secs(2),
            stage: Arc::new(Mutex::new(String::new())),
            done: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn set_stage(&self, s: &str) {
        if !self.enabled {
            return;
        }
        if let Ok(mut stage) = self.stage.lock() {
            *stage = s.to_string();
        }
    }

    pub fn snapshot(&self) -> (u64, u64) {
        (self.done.load(Ordering::Relaxed), self.total.load(Ordering::Relaxed))
    }

    /// Spawn the ticker. A no-op when disabled or already running.
    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        let Ok(mut slot) = self.ticker.lock() else {
            return;
        };
        if slot.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let this = self.clone();
        let handle = thread::spawn(move || {
            let t0 = Instant::now();
            // Wakes early when the sender is dropped by `stop`.
            while let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(this.interval) {
                this.log_line(t0);
            }
        });
        *slot = Some(Ticker { stop_tx, handle });
    }

    /// Stop the ticker and wait for its thread, so no line is logged after
    /// this returns.
    pub fn stop(&self) {
        let ticker = self.ticker.lock().ok().and_then(|mut slot| slot.take());
        if let Some(Ticker { stop_tx, handle }) = ticker {
            drop(stop_tx);
            if handle.join().is_err() {
                tracing::warn!("progress ticker panicked");
            }
        }
    }

    fn log_line(&self, t0: Instant) {
        let stage = self.stage.lock().map(|s| s.clone()).unwrap_or_default();
        let (done, total) = self.snapshot();
        let pct = if total > 0 { (done as f64 / total as f64) * 100.0 } else { 100.0 };
        tracing::info!(
            target: "fsplit::progress",
            elapsed_s = t0.elapsed().as_secs(),
            stage = %stage,
            done,
            total,
            "{} {:>3}%",
            stage,
            pct as i32
        );
    }
}

impl ProgressSink for Progress {
    fn report(&self, done: u64, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(done, Ordering::Relaxed);
    }
}
