//! Gateway: the monitoring scheduler connecting transport, responder, and lead store.
//!
//! Owns all per-contact state (ledger, conversations, monitoring set) and
//! serializes every use of the transport: a background poll cycle, a bulk
//! send, and a manual check never overlap.

mod bulk;
mod leads;
mod monitoring;
mod pipeline;
mod scheduler;
mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use bulk::{BulkOutcome, BulkRecipient};

use bulk::{DailyQuota, Pacing};
use monitoring::MonitorState;
use outreach_core::{
    config::Config,
    error::OutreachError,
    traits::{ContactDirectory, Responder, Transport},
    Contact,
};
use outreach_memory::{DeliveryLog, Store};
use stats::{Stats, StatsSnapshot};
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Runtime knobs, resolved from [`Config`] once at start-up.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub poll_interval: Duration,
    /// Sleep between gate checks while a bulk send holds the transport.
    pub gate_recheck: Duration,
    pub stop_timeout: Duration,
    pub history_cap: usize,
    pub context_turns: usize,
    pub ledger_cap: usize,
    pub daily_limit: u32,
    pub pacing: Pacing,
    pub system_prompt: String,
    pub fallback_reply: String,
}

impl GatewaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.monitor.poll_interval_secs),
            gate_recheck: Duration::from_millis(config.monitor.gate_recheck_ms),
            stop_timeout: Duration::from_secs(config.monitor.stop_timeout_secs),
            history_cap: config.monitor.history_cap,
            context_turns: config.monitor.context_turns,
            ledger_cap: config.monitor.ledger_cap,
            daily_limit: config.bulk.daily_limit,
            pacing: Pacing::from_config(&config.bulk),
            system_prompt: config.responder.resolve_system_prompt(),
            fallback_reply: config.responder.fallback_reply.clone(),
        }
    }
}

/// Handle on the spawned monitoring loop.
struct Runner {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// The central gateway driving outreach conversations.
pub struct Gateway {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) responder: Arc<dyn Responder>,
    pub(crate) store: Store,
    pub(crate) deliveries: DeliveryLog,
    pub(crate) directory: Option<Arc<dyn ContactDirectory>>,
    pub(crate) settings: GatewaySettings,
    /// Ledger, conversations, and the monitoring set.
    pub(crate) state: Mutex<MonitorState>,
    /// Held for the whole of a poll cycle, a bulk send, or a contact enrollment.
    pub(crate) transport_lock: Mutex<()>,
    /// Number of bulk sends in progress. The loop does not poll while non-zero.
    pub(crate) bulk_gate: AtomicUsize,
    pub(crate) quota: std::sync::Mutex<DailyQuota>,
    pub(crate) stats: Stats,
    runner: std::sync::Mutex<Option<Runner>>,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        transport: Arc<dyn Transport>,
        responder: Arc<dyn Responder>,
        store: Store,
        directory: Option<Arc<dyn ContactDirectory>>,
        settings: GatewaySettings,
    ) -> Self {
        let deliveries = DeliveryLog::new(store.pool().clone());
        let state = MonitorState::new(settings.ledger_cap, settings.history_cap);
        let quota = DailyQuota::new(settings.daily_limit, chrono::Local::now().date_naive());
        Self {
            transport,
            responder,
            store,
            deliveries,
            directory,
            settings,
            state: Mutex::new(state),
            transport_lock: Mutex::new(()),
            bulk_gate: AtomicUsize::new(0),
            quota: std::sync::Mutex::new(quota),
            stats: Stats::default(),
            runner: std::sync::Mutex::new(None),
        }
    }

    /// Canonicalize a raw phone string the way the transport addresses chats.
    pub fn normalize(&self, raw: &str) -> Result<Contact, OutreachError> {
        self.transport.normalize(raw)
    }

    /// Spawn the monitoring loop. Returns `false` if it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut runner = self.runner.lock().unwrap_or_else(PoisonError::into_inner);
        if runner.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            warn!("monitoring already running");
            return false;
        }

        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(self.clone().monitor_loop(rx));
        *runner = Some(Runner { shutdown, handle });
        info!(
            "monitoring started | transport: {} | responder: {} | interval: {:?}",
            self.transport.name(),
            self.responder.name(),
            self.settings.poll_interval
        );
        true
    }

    /// Signal the loop to exit and wait (bounded) for it.
    ///
    /// The loop is never aborted: if it is mid transport call when the
    /// timeout expires it is left to finish that call and exit on its own.
    /// Returns `false` if the loop was not running.
    pub async fn stop(&self) -> bool {
        let runner = self
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Runner { shutdown, handle }) = runner else {
            return false;
        };

        let _ = shutdown.send(true);
        match tokio::time::timeout(self.settings.stop_timeout, handle).await {
            Ok(Ok(())) => info!("monitoring stopped"),
            Ok(Err(e)) => error!("monitoring task ended abnormally: {e}"),
            Err(_) => warn!(
                "monitoring loop did not stop within {:?}, leaving it to exit after its current call",
                self.settings.stop_timeout
            ),
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Add a contact to the monitoring set (Unmonitored → Active).
    ///
    /// Resets its conversation and initializes its ledger from the current
    /// chat snapshot. Adding a contact that is already monitored is a no-op.
    pub async fn add_contact(&self, raw: &str) -> Result<Contact, OutreachError> {
        let contact = self.normalize(raw)?;
        let _transport = self.transport_lock.lock().await;
        self.enroll(&contact, None).await;
        Ok(contact)
    }

    /// Drop a contact from monitoring along with its ledger and conversation.
    pub async fn remove_contact(&self, raw: &str) -> Result<bool, OutreachError> {
        let contact = self.normalize(raw)?;
        let removed = self.state.lock().await.remove(&contact);
        if removed {
            info!("monitoring: removed {contact}");
        }
        Ok(removed)
    }

    /// Stop polling a contact while keeping its state.
    pub async fn pause_contact(&self, raw: &str) -> Result<bool, OutreachError> {
        let contact = self.normalize(raw)?;
        let changed = self.state.lock().await.set_paused(&contact, true);
        if changed {
            info!("monitoring: paused {contact}");
        }
        Ok(changed)
    }

    /// Resume polling a paused contact. Its ledger is not re-initialized.
    pub async fn resume_contact(&self, raw: &str) -> Result<bool, OutreachError> {
        let contact = self.normalize(raw)?;
        let changed = self.state.lock().await.set_paused(&contact, false);
        if changed {
            info!("monitoring: resumed {contact}");
        }
        Ok(changed)
    }

    /// Monitored contacts in insertion order with their paused flag.
    pub async fn monitored_contacts(&self) -> Vec<(Contact, bool)> {
        self.state.lock().await.contacts()
    }

    /// Current counters plus conversation and monitoring-set sizes.
    pub async fn stats(&self) -> StatsSnapshot {
        let state = self.state.lock().await;
        self.stats.snapshot(
            state.conversations.len(),
            state.monitored_count(),
            state.active_contacts().len(),
            state.receipt_totals(),
        )
    }
}
