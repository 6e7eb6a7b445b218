use std::sync::Mutex;
use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use super::{expiry::PaymentExpiry, settlement::Settlement};

/// Fixed-interval background driver for the settlement and expiry sweeps.
///
/// One tokio task runs both sweeps sequentially each tick, so a tick can
/// never overlap itself; ticks that come due while a sweep is still running
/// are skipped. The sweeps' own idempotence guards cover manual invocations
/// racing the timer.
pub struct AuctionScheduler {
    settlement: Settlement,
    expiry: PaymentExpiry,
    startup_delay: Duration,
    period: Duration,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AuctionScheduler {
    pub fn new(
        settlement: Settlement,
        expiry: PaymentExpiry,
        startup_delay: Duration,
        period: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            settlement,
            expiry,
            startup_delay,
            period,
            shutdown,
            handle: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let settlement = self.settlement.clone();
        let expiry = self.expiry.clone();
        let mut shutdown = self.shutdown.subscribe();
        let start = Instant::now() + self.startup_delay;
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(
                "Auction scheduler started (period: {:?}, startup delay pending)",
                period
            );
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => run_sweeps(&settlement, &expiry).await,
                }
            }
            tracing::info!("Auction scheduler stopped");
        });
        *self.handle.lock().unwrap() = Some(handle);
    }

    /// Run one sweep pass synchronously, outside the timer. Used by tests
    /// and the manual trigger endpoints.
    pub async fn run_once(&self) {
        run_sweeps(&self.settlement, &self.expiry).await;
    }

    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_sweeps(settlement: &Settlement, expiry: &PaymentExpiry) {
    tracing::info!("Running scheduled auction processing");
    if let Err(e) = settlement.sweep_ended().await {
        tracing::error!("Error in scheduled auction settlement: {}", e);
    }
    if let Err(e) = expiry.sweep().await {
        tracing::error!("Error in scheduled payment expiry: {}", e);
    }
}
