//! Poll loop - runs a triage pass every `poll_interval` seconds
//!
//! The first pass happens immediately. Passes are blocking filesystem work
//! and never overlap: a pass that outlasts the interval is followed by the
//! next one right away. A shutdown request is honored between passes.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::store::{DocumentReader, DocumentWriter};
use crate::triage::TriageController;

/// Pass counts of one loop run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub passes: u64,
    pub failed_passes: u64,
}

pub struct PollLoop<S> {
    controller: TriageController<S>,
    period: Duration,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<S: DocumentReader + DocumentWriter> PollLoop<S> {
    pub fn new(controller: TriageController<S>) -> Self {
        let period = Duration::from_secs(controller.config().poll_interval.max(1));
        Self::with_period(controller, period)
    }

    pub fn with_period(controller: TriageController<S>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            controller,
            period,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Sender that stops the loop after the in-flight pass
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run until a shutdown request arrives. Requires the multi-threaded
    /// runtime.
    pub async fn run(&mut self) -> LoopStats {
        info!(interval_secs = self.period.as_secs(), "Poll loop started");

        let mut stats = LoopStats::default();
        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    info!("Poll loop shutting down");
                    break;
                }
                _ = tick.tick() => {
                    stats.passes += 1;
                    let controller = &mut self.controller;
                    match tokio::task::block_in_place(|| controller.run_pass()) {
                        Ok(report) => debug!(examined = report.examined, "Pass finished"),
                        Err(e) => {
                            stats.failed_passes += 1;
                            error!(error = %e, "Triage pass failed, retrying next interval");
                        }
                    }
                }
            }
        }

        info!(passes = stats.passes, failed = stats.failed_passes, "Poll loop stopped");
        stats
    }
}
