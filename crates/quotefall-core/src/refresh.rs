//! Periodic portfolio-wide quote refresh.
//!
//! A cancellable timer task resolves every tracked symbol on a fixed
//! interval. Ticks never overlap: an atomic in-flight flag makes a tick that
//! fires while the previous batch is still running a no-op, so concurrent
//! outbound request volume stays bounded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::resolver::{QuoteResolver, Resolution};
use crate::Symbol;

/// Source of the symbols each refresh batch should resolve.
pub trait SymbolFeed: Send + Sync {
    fn symbols(&self) -> Vec<Symbol>;
}

/// Consumer of completed refresh batches.
pub trait RefreshSink: Send + Sync {
    fn apply(&self, batch: Vec<Resolution>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(45),
        }
    }
}

/// Counters for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshStats {
    pub completed: u64,
    pub skipped: u64,
}

struct RefreshShared {
    resolver: Arc<QuoteResolver>,
    feed: Arc<dyn SymbolFeed>,
    sink: Arc<dyn RefreshSink>,
    in_flight: AtomicBool,
    completed: AtomicU64,
    skipped: AtomicU64,
}

impl RefreshShared {
    /// Run one batch unless one is already in flight. Returns whether the
    /// batch ran.
    async fn run_batch(&self) -> bool {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("refresh tick skipped, previous batch still in flight");
            return false;
        }

        let symbols = self.feed.symbols();
        if symbols.is_empty() {
            self.in_flight.store(false, Ordering::SeqCst);
            return true;
        }

        tracing::debug!(count = symbols.len(), "refresh batch started");
        let batch = self.resolver.resolve_many(&symbols).await;
        self.sink.apply(batch);

        self.completed.fetch_add(1, Ordering::SeqCst);
        self.in_flight.store(false, Ordering::SeqCst);
        true
    }

    fn stats(&self) -> RefreshStats {
        RefreshStats {
            completed: self.completed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }
}

/// Owner of the spawned timer task.
///
/// Dropping the handle aborts the timer, so a torn-down consumer can never
/// leak a ticking refresh loop. A batch already in flight when the handle is
/// dropped is left to finish and its results are applied once, harmlessly.
pub struct RefreshHandle {
    shared: Arc<RefreshShared>,
    task: tokio::task::JoinHandle<()>,
}

impl RefreshHandle {
    /// Run a batch immediately, outside the timer cadence. Subject to the
    /// same overlap guard; returns whether the batch ran.
    pub async fn run_once(&self) -> bool {
        self.shared.run_batch().await
    }

    pub fn stats(&self) -> RefreshStats {
        self.shared.stats()
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the periodic refresh task.
pub fn spawn_refresh(
    resolver: Arc<QuoteResolver>,
    feed: Arc<dyn SymbolFeed>,
    sink: Arc<dyn RefreshSink>,
    config: RefreshConfig,
) -> RefreshHandle {
    let shared = Arc::new(RefreshShared {
        resolver,
        feed,
        sink,
        in_flight: AtomicBool::new(false),
        completed: AtomicU64::new(0),
        skipped: AtomicU64::new(0),
    });

    let task = tokio::spawn({
        let shared = Arc::clone(&shared);
        async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so spawning does not
            // double up with the initial resolution most callers do anyway.
            interval.tick().await;

            loop {
                interval.tick().await;
                let shared = Arc::clone(&shared);
                // The batch runs off the timer task so a slow batch delays
                // nothing; the in-flight flag keeps at most one running.
                tokio::spawn(async move {
                    shared.run_batch().await;
                });
            }
        }
    });

    RefreshHandle { shared, task }
}
