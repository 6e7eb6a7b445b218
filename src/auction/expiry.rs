use std::sync::Arc;

use serde_json::{json, Value};

use crate::{
    clock::Clock,
    constants::ARTWORK_COLLECTION,
    errors::HandlerError,
    models::{listing::ListingStatus, purchase::Purchase},
    notify::{notify_best_effort, Notifier},
    purchases::PurchaseRepository,
    store::{doc_str, DocumentStore, TxOutcome},
};

/// Periodic sweep over pending-payment purchases whose deadline has lapsed.
/// The only path that un-sells a listing.
#[derive(Clone)]
pub struct PaymentExpiry {
    store: Arc<dyn DocumentStore>,
    purchases: PurchaseRepository,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl PaymentExpiry {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        purchases: PurchaseRepository,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            purchases,
            notifier,
            clock,
        }
    }

    /// Idempotent: the purchase's PENDING_PAYMENT → EXPIRED transition is the
    /// gate, so two overlapping sweeps revert each listing at most once.
    pub async fn sweep(&self) -> Result<usize, HandlerError> {
        let pending = self.purchases.pending_payment().await?;
        tracing::info!(
            "Found {} pending payment purchases to check",
            pending.len()
        );

        let now = self.clock.now_millis();
        let mut expired = 0;
        for (purchase_id, purchase) in pending {
            if purchase.payment_expired {
                continue;
            }
            let Some(deadline) = purchase.payment_deadline else {
                continue;
            };
            if deadline >= now {
                continue;
            }

            tracing::info!(
                "Payment expired for purchase: {} (deadline: {}, now: {})",
                purchase_id,
                deadline,
                now
            );
            match self.expire_one(&purchase_id, &purchase, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(
                    "Error processing expired payment for purchase {}: {}",
                    purchase_id,
                    e
                ),
            }
        }
        tracing::info!("Finished processing expired payments. Expired: {}", expired);
        Ok(expired)
    }

    async fn expire_one(
        &self,
        purchase_id: &str,
        purchase: &Purchase,
        now: u64,
    ) -> Result<bool, HandlerError> {
        if !self.purchases.mark_expired(purchase_id).await? {
            // A completed payment or another sweep got there first.
            return Ok(false);
        }

        let title = self.revert_listing(purchase, now).await?;
        let content = format!(
            "⚠️ Payment expired for auction winner. The winner of \"{}\" did not complete \
             payment within 24 hours. The artwork is now available again.",
            title.as_deref().unwrap_or("artwork")
        );
        notify_best_effort(
            self.notifier.as_ref(),
            &purchase.seller_id,
            &purchase.artwork_id,
            &content,
        )
        .await;
        Ok(true)
    }

    /// Put the listing back to INACTIVE and clear the winner fields, but
    /// only while it still carries this purchase's buyer as winner, so an
    /// expiry processed late cannot clobber a newer sale of a relisted
    /// artwork.
    async fn revert_listing(
        &self,
        purchase: &Purchase,
        now: u64,
    ) -> Result<Option<String>, HandlerError> {
        let mut title: Option<String> = None;
        let result = self
            .store
            .transact(ARTWORK_COLLECTION, &purchase.artwork_id, &mut |doc| {
                let Some(doc) = doc else {
                    return TxOutcome::Abort;
                };
                if doc_str(doc, "winnerId") != Some(purchase.buyer_id.as_str()) {
                    return TxOutcome::Abort;
                }
                title = doc_str(doc, "title").map(str::to_string);
                let mut updated = doc.clone();
                updated.insert("status".to_string(), json!(ListingStatus::Inactive));
                updated.insert("winnerId".to_string(), Value::Null);
                updated.insert("winnerName".to_string(), Value::Null);
                updated.insert("winningBidAmount".to_string(), Value::Null);
                updated.insert("soldAt".to_string(), Value::Null);
                updated.insert("updatedAt".to_string(), json!(now));
                TxOutcome::Write(updated)
            })
            .await?;

        if result.committed() {
            tracing::info!(
                "Listing {} marked as INACTIVE due to expired payment",
                purchase.artwork_id
            );
        } else {
            tracing::warn!(
                "Listing {} no longer carries winner {}; skipping reversion",
                purchase.artwork_id,
                purchase.buyer_id
            );
        }
        Ok(title)
    }
}
