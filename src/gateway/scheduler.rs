//! Monitoring loop: poll every active contact once per interval.

use super::Gateway;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What one monitoring cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Skipped entirely because a bulk send holds the gate.
    pub suspended: bool,
    pub polled: usize,
    /// Inbound messages answered.
    pub answered: usize,
    /// Contacts whose poll failed.
    pub failed: usize,
}

impl Gateway {
    pub(super) fn bulk_in_progress(&self) -> bool {
        self.bulk_gate.load(Ordering::SeqCst) > 0
    }

    /// Background task driving monitoring cycles until `shutdown` flips.
    ///
    /// While a bulk send is in progress the loop does not poll at all; it
    /// sleeps for the gate recheck interval and looks again.
    pub(super) async fn monitor_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let pause = if self.bulk_in_progress() {
                debug!("monitoring: bulk send in progress, suspended");
                self.settings.gate_recheck
            } else {
                self.run_cycle().await;
                self.settings.poll_interval
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("monitoring loop exited");
    }

    /// Run one monitoring cycle while holding the transport.
    ///
    /// Contacts are processed sequentially in insertion order. A failure on
    /// one contact is logged and counted; the rest are still processed.
    pub(super) async fn run_cycle(&self) -> CycleReport {
        let _transport = self.transport_lock.lock().await;
        let mut report = CycleReport::default();

        if self.bulk_in_progress() {
            report.suspended = true;
            return report;
        }
        let cycle = self.stats.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        let contacts = self.state.lock().await.active_contacts();
        for contact in &contacts {
            if self.bulk_in_progress() {
                debug!("monitoring: bulk send waiting, ending cycle early");
                break;
            }
            // Paused or removed since the snapshot was taken.
            if !self.state.lock().await.is_active(contact) {
                continue;
            }

            report.polled += 1;
            match self.process_contact(contact).await {
                Ok(answered) => report.answered += answered,
                Err(e) => {
                    report.failed += 1;
                    self.stats.poll_failures.fetch_add(1, Ordering::Relaxed);
                    warn!("monitoring: poll failed for {contact}: {e}");
                }
            }
        }

        debug!(
            "monitoring: cycle {cycle} polled={} answered={} failed={}",
            report.polled, report.answered, report.failed
        );
        report
    }

    /// Run exactly one monitoring cycle from the calling context.
    pub async fn check_now(&self) -> CycleReport {
        info!("manual check requested");
        self.run_cycle().await
    }
}
