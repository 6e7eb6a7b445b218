use std::sync::Arc;

use serde_json::json;

use crate::{
    clock::Clock,
    constants::ARTWORK_COLLECTION,
    errors::HandlerError,
    models::listing::ListingStatus,
    store::{doc_str, DocumentStore, TxOutcome},
};

/// At-most-once transition of a listing to SOLD.
///
/// The single synchronization point between the direct-purchase flow and
/// auction settlement: whichever transaction commits first wins, every later
/// caller observes the SOLD status and gets `false`.
#[derive(Clone)]
pub struct SaleFinalizer {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl SaleFinalizer {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns `Ok(true)` when this call flipped the listing to SOLD,
    /// `Ok(false)` when it was already sold.
    pub async fn mark_sold(&self, listing_id: &str) -> Result<bool, HandlerError> {
        let now = self.clock.now_millis();
        let sold = ListingStatus::Sold.to_string();
        let mut missing = false;

        let result = self
            .store
            .transact(ARTWORK_COLLECTION, listing_id, &mut |doc| {
                let Some(doc) = doc else {
                    missing = true;
                    return TxOutcome::Abort;
                };
                if doc_str(doc, "status") == Some(sold.as_str()) {
                    return TxOutcome::Abort;
                }
                let mut updated = doc.clone();
                updated.insert("status".to_string(), json!(ListingStatus::Sold));
                updated.insert("soldAt".to_string(), json!(now));
                updated.insert("updatedAt".to_string(), json!(now));
                TxOutcome::Write(updated)
            })
            .await?;

        if missing {
            return Err(HandlerError::not_found());
        }
        if result.committed() {
            tracing::info!("Listing {} marked as sold at {}", listing_id, now);
        } else {
            tracing::warn!("Listing {} is already sold", listing_id);
        }
        Ok(result.committed())
    }
}
