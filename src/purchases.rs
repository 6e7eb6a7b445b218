use std::sync::Arc;

use serde_json::json;
use ulid::Ulid;

use crate::{
    clock::Clock,
    constants::PURCHASE_COLLECTION,
    errors::HandlerError,
    models::purchase::{Purchase, PurchaseStatus, PurchaseView},
    store::{
        doc_str, from_document, to_document, DocumentStore, QueryOptions, SortDirection,
        TxOutcome,
    },
};

/// CRUD and the purchase-side state machine: PENDING_PAYMENT → COMPLETED
/// (buyer asserts payment) or → EXPIRED (expiry sweep). Both transitions are
/// transactional so a payment racing the sweep resolves to exactly one of
/// them.
#[derive(Clone)]
pub struct PurchaseRepository {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl PurchaseRepository {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persist a new purchase record, returning its id.
    pub async fn create(&self, purchase: &Purchase) -> Result<String, HandlerError> {
        let id = Ulid::new().to_string();
        self.store
            .put(PURCHASE_COLLECTION, &id, to_document(purchase)?)
            .await?;
        Ok(id)
    }

    pub async fn find(&self, purchase_id: &str) -> Result<Option<Purchase>, HandlerError> {
        match self.store.get(PURCHASE_COLLECTION, purchase_id).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn by_buyer(&self, buyer_id: &str) -> Result<Vec<PurchaseView>, HandlerError> {
        let rows = self
            .store
            .query(
                PURCHASE_COLLECTION,
                &[("buyerId", json!(buyer_id))],
                &QueryOptions::ordered("createdAt", SortDirection::Desc),
            )
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for (id, doc) in rows {
            match from_document(doc) {
                Ok(purchase) => out.push(PurchaseView {
                    purchase_id: id,
                    purchase,
                }),
                Err(e) => tracing::warn!("Skipping malformed purchase {}: {}", id, e),
            }
        }
        Ok(out)
    }

    /// All purchases still awaiting payment; the expiry sweep's work list.
    pub async fn pending_payment(&self) -> Result<Vec<(String, Purchase)>, HandlerError> {
        let rows = self
            .store
            .query(
                PURCHASE_COLLECTION,
                &[("status", json!(PurchaseStatus::PendingPayment))],
                &QueryOptions::default(),
            )
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for (id, doc) in rows {
            match from_document(doc) {
                Ok(purchase) => out.push((id, purchase)),
                Err(e) => tracing::warn!("Skipping malformed purchase {}: {}", id, e),
            }
        }
        Ok(out)
    }

    /// Buyer-asserted payment completion. Fails with a conflict when the
    /// payment window already closed (the purchase expired or was completed).
    pub async fn complete_payment(
        &self,
        purchase_id: &str,
        buyer_id: &str,
    ) -> Result<(), HandlerError> {
        let purchase = self
            .find(purchase_id)
            .await?
            .ok_or_else(|| {
                HandlerError::HandlerError(
                    axum::http::StatusCode::NOT_FOUND,
                    "Purchase not found".to_string(),
                )
            })?;
        if purchase.buyer_id != buyer_id {
            return Err(HandlerError::forbidden(
                "You can only complete your own purchases",
            ));
        }
        if purchase.status.is_terminal() {
            return Err(HandlerError::conflict(
                "Payment window closed or payment already completed",
            ));
        }

        let now = self.clock.now_millis();
        let pending = PurchaseStatus::PendingPayment.to_string();
        let result = self
            .store
            .transact(PURCHASE_COLLECTION, purchase_id, &mut |doc| {
                let Some(doc) = doc else {
                    return TxOutcome::Abort;
                };
                if doc_str(doc, "status") != Some(pending.as_str()) {
                    return TxOutcome::Abort;
                }
                let mut updated = doc.clone();
                updated.insert("status".to_string(), json!(PurchaseStatus::Completed));
                updated.insert("paidAt".to_string(), json!(now));
                TxOutcome::Write(updated)
            })
            .await?;

        if !result.committed() {
            return Err(HandlerError::conflict(
                "Payment window closed or payment already completed",
            ));
        }
        tracing::info!("Purchase {} completed by buyer {}", purchase_id, buyer_id);
        Ok(())
    }

    /// Expiry-sweep gate: flip PENDING_PAYMENT → EXPIRED at most once.
    /// Returns false when another sweep or a completed payment got there
    /// first.
    pub async fn mark_expired(&self, purchase_id: &str) -> Result<bool, HandlerError> {
        let pending = PurchaseStatus::PendingPayment.to_string();
        let result = self
            .store
            .transact(PURCHASE_COLLECTION, purchase_id, &mut |doc| {
                let Some(doc) = doc else {
                    return TxOutcome::Abort;
                };
                if doc_str(doc, "status") != Some(pending.as_str()) {
                    return TxOutcome::Abort;
                }
                if doc.get("paymentExpired").and_then(|v| v.as_bool()) == Some(true) {
                    return TxOutcome::Abort;
                }
                let mut updated = doc.clone();
                updated.insert("status".to_string(), json!(PurchaseStatus::Expired));
                updated.insert("paymentExpired".to_string(), json!(true));
                TxOutcome::Write(updated)
            })
            .await?;
        Ok(result.committed())
    }
}
