use std::{env, sync::Arc, time::Duration};

use aws_config::{BehaviorVersion, Region};

use crate::{
    auction::{
        bidding::BiddingEngine, expiry::PaymentExpiry, finalizer::SaleFinalizer,
        settlement::Settlement,
    },
    clock::{Clock, SystemClock},
    constants::{SWEEP_PERIOD_SECS, SWEEP_STARTUP_DELAY_SECS},
    identity::{IdentityLookup, StoreIdentity},
    listings::ListingRepository,
    notify::{MessageNotifier, Notifier},
    purchases::PurchaseRepository,
    store::{DocumentStore, DynamoStore},
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub table_prefix: String,
    pub dynamodb_endpoint: Option<String>,
    pub sweep_startup_delay: Duration,
    pub sweep_period: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let secs = |key: &str, default: u64| {
            env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            table_prefix: env::var("TABLE_PREFIX").unwrap_or_default(),
            dynamodb_endpoint: env::var("DYNAMODB_ENDPOINT").ok(),
            sweep_startup_delay: Duration::from_secs(secs(
                "SWEEP_STARTUP_DELAY_SECS",
                SWEEP_STARTUP_DELAY_SECS,
            )),
            sweep_period: Duration::from_secs(secs("SWEEP_PERIOD_SECS", SWEEP_PERIOD_SECS)),
        }
    }
}

/// Everything the handlers and the scheduler need, built once at startup and
/// passed around explicitly; nothing in the crate reaches for ambient global
/// state.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    pub identity: Arc<dyn IdentityLookup>,
    pub notifier: Arc<dyn Notifier>,
    pub listings: ListingRepository,
    pub purchases: PurchaseRepository,
    pub bidding: BiddingEngine,
    pub finalizer: SaleFinalizer,
    pub settlement: Settlement,
    pub expiry: PaymentExpiry,
}

impl AppState {
    pub async fn new() -> Self {
        let config = AppConfig::from_env();
        let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint) = &config.dynamodb_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        let store: Arc<dyn DocumentStore> =
            Arc::new(DynamoStore::new(&sdk_config, &config.table_prefix));
        Self::assemble(config, store, Arc::new(SystemClock))
    }

    /// State over an injected store and clock; tests pair this with
    /// [`MemoryStore`] and a manual clock.
    #[cfg(test)]
    pub fn with_parts(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self::assemble(AppConfig::from_env(), store, clock)
    }

    fn assemble(config: AppConfig, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        let identity: Arc<dyn IdentityLookup> = Arc::new(StoreIdentity::new(store.clone()));
        let notifier: Arc<dyn Notifier> =
            Arc::new(MessageNotifier::new(store.clone(), clock.clone()));
        let listings = ListingRepository::new(store.clone(), clock.clone());
        let purchases = PurchaseRepository::new(store.clone(), clock.clone());
        let bidding = BiddingEngine::new(store.clone(), identity.clone(), clock.clone());
        let finalizer = SaleFinalizer::new(store.clone(), clock.clone());
        let settlement = Settlement::new(
            store.clone(),
            identity.clone(),
            notifier.clone(),
            purchases.clone(),
            clock.clone(),
        );
        let expiry = PaymentExpiry::new(
            store.clone(),
            purchases.clone(),
            notifier.clone(),
            clock.clone(),
        );

        Self {
            config,
            store,
            clock,
            identity,
            notifier,
            listings,
            purchases,
            bidding,
            finalizer,
            settlement,
            expiry,
        }
    }
}
