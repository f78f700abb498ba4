use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use forgeroute_core::OrderId;
use forgeroute_routing::{AssignmentOutcome, RoutingEngine, RoutingError};

/// Default number of expired orders handled per tick.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    /// Released orders picked up again because their re-route never landed.
    pub retried: usize,
    pub reassigned: usize,
    pub fell_back: usize,
    /// Orders that were skipped: someone else changed them first, or the
    /// timeout could not be applied.
    pub skipped: usize,
    pub failed: usize,
}

/// Time out every assignment whose window has elapsed and re-route it, then
/// retry orders a previous re-route left without a seller.
///
/// Orders are handled one at a time; a failure is logged and the sweep moves
/// on to the next order.
pub fn sweep_once(engine: &RoutingEngine, limit: usize) -> SweepReport {
    let mut report = SweepReport::default();
    let mut handled = HashSet::new();

    match engine.expired_orders(limit) {
        Ok(expired) => {
            for order_id in expired {
                handled.insert(order_id);
                report.record(order_id, "expired", engine.expire(order_id));
            }
        }
        Err(err) => warn!(error = %err, "expiry sweep: listing expired assignments failed"),
    }

    match engine.stranded_orders(limit) {
        Ok(stranded) => {
            // Orders that just failed above wait for the next tick.
            for order_id in stranded.into_iter().filter(|id| !handled.contains(id)) {
                report.retried += 1;
                report.record(order_id, "stranded", engine.assign(order_id));
            }
        }
        Err(err) => warn!(error = %err, "expiry sweep: listing stranded orders failed"),
    }

    if report.examined > 0 {
        info!(
            examined = report.examined,
            retried = report.retried,
            reassigned = report.reassigned,
            fell_back = report.fell_back,
            skipped = report.skipped,
            failed = report.failed,
            "expiry sweep finished"
        );
    }
    report
}

impl SweepReport {
    fn record(&mut self, order_id: OrderId, kind: &str, result: Result<AssignmentOutcome, RoutingError>) {
        self.examined += 1;
        match result {
            Ok(AssignmentOutcome::Assigned { seller_id, attempt, .. }) => {
                debug!(order = %order_id, kind, seller = %seller_id, attempt, "order reassigned");
                self.reassigned += 1;
            }
            Ok(AssignmentOutcome::FellBackToAdmin { reason, .. }) => {
                debug!(order = %order_id, kind, reason = reason.as_str(), "order fell back to admin");
                self.fell_back += 1;
            }
            Ok(outcome) => {
                debug!(order = %order_id, kind, reason = %outcome.reason(), "order skipped");
                self.skipped += 1;
            }
            Err(err) => {
                warn!(order = %order_id, kind, error = %err, "expiry sweep: order failed");
                self.failed += 1;
            }
        }
    }
}

/// Handle to stop and join the sweeper thread.
#[derive(Debug)]
pub struct ExpirySweeperHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ExpirySweeperHandle {
    /// Request graceful shutdown and wait for the sweeper to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Periodic assignment-timeout job.
///
/// - Sweeps once per `interval`
/// - Handles at most `batch_size` orders per sweep
/// - Supports graceful shutdown
#[derive(Debug, Clone, Copy)]
pub struct ExpirySweeper {
    interval: Duration,
    batch_size: usize,
}

impl ExpirySweeper {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Spawn the sweeper on a named OS thread.
    pub fn spawn(self, name: &str, engine: Arc<RoutingEngine>) -> std::io::Result<ExpirySweeperHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_name = name.to_string();

        let join = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || self.run(&thread_name, &engine, shutdown_rx))?;

        Ok(ExpirySweeperHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }

    fn run(self, name: &str, engine: &RoutingEngine, shutdown_rx: mpsc::Receiver<()>) {
        info!(worker = name, interval_secs = self.interval.as_secs(), "expiry sweeper started");
        let poll = Duration::from_millis(250);
        let mut next_tick = Instant::now() + self.interval;

        loop {
            match shutdown_rx.try_recv() {
                Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
                Err(mpsc::TryRecvError::Empty) => {}
            }

            let now = Instant::now();
            if now >= next_tick {
                sweep_once(engine, self.batch_size);
                next_tick = Instant::now() + self.interval;
                continue;
            }

            thread::sleep(poll.min(next_tick - now));
        }
        info!(worker = name, "expiry sweeper stopped");
    }
}
