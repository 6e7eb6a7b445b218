use std::sync::Arc;

use serde_json::json;

use crate::{
    clock::Clock,
    constants::{ARTWORK_COLLECTION, BID_COLLECTION, PAYMENT_WINDOW_MS},
    errors::HandlerError,
    identity::{display_label, IdentityLookup},
    models::{
        listing::{Listing, ListingStatus, SaleType},
        purchase::{Purchase, PurchaseStatus},
    },
    notify::{format_amount, notify_best_effort, Notifier},
    purchases::PurchaseRepository,
    store::{doc_str, doc_u64, from_document, DocumentStore, QueryOptions, TxOutcome},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    NotFound,
    /// A winner was already recorded before this call did anything.
    AlreadySettled,
    /// Auction ended with an empty ledger and no cached bidder; the listing
    /// went back to INACTIVE.
    NoBids,
    /// A concurrent settlement wrote the winner first.
    RaceLost,
    Settled {
        winner_id: String,
        winning_bid: u64,
    },
}

struct WinningBid {
    bidder_id: String,
    bidder_name: String,
    amount: u64,
}

/// End-of-auction settlement: winner determination, the exactly-once winner
/// write, purchase creation and notifications. Idempotent; safe to call
/// repeatedly or concurrently with itself and with the sale finalizer.
#[derive(Clone)]
pub struct Settlement {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityLookup>,
    notifier: Arc<dyn Notifier>,
    purchases: PurchaseRepository,
    clock: Arc<dyn Clock>,
}

impl Settlement {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityLookup>,
        notifier: Arc<dyn Notifier>,
        purchases: PurchaseRepository,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            purchases,
            clock,
        }
    }

    pub async fn settle(&self, listing_id: &str) -> Result<SettleOutcome, HandlerError> {
        let Some(doc) = self.store.get(ARTWORK_COLLECTION, listing_id).await? else {
            tracing::warn!("Listing not found for settlement: {}", listing_id);
            return Ok(SettleOutcome::NotFound);
        };
        let listing: Listing = from_document(doc)?;

        if listing.has_winner() {
            tracing::info!(
                "Auction {} already has a winner: {}",
                listing_id,
                listing.winner_id.as_deref().unwrap_or_default()
            );
            return Ok(SettleOutcome::AlreadySettled);
        }

        // The ledger is authoritative; the listing cache only fills in when a
        // ledger append was lost after an accepted bid.
        let mut winner = self.highest_bid(listing_id).await?;
        if winner.is_none() {
            if let Some(bidder_id) = listing
                .highest_bidder_id
                .as_deref()
                .filter(|id| !id.is_empty())
            {
                let bidder_name = display_label(self.identity.as_ref(), bidder_id).await;
                winner = Some(WinningBid {
                    bidder_id: bidder_id.to_string(),
                    bidder_name,
                    amount: listing.bid_floor(),
                });
            }
        }

        let now = self.clock.now_millis();
        let Some(winner) = winner else {
            tracing::info!("Auction ended for listing {} with no bids", listing_id);
            return self.end_without_winner(listing_id, now).await;
        };

        if !self.record_winner(listing_id, &winner, now).await? {
            tracing::warn!("Auction {} was already processed", listing_id);
            return Ok(SettleOutcome::RaceLost);
        }

        let purchase = Purchase {
            artwork_id: listing_id.to_string(),
            buyer_id: winner.bidder_id.clone(),
            seller_id: listing.artist_id.clone(),
            price: winner.amount,
            status: PurchaseStatus::PendingPayment,
            payment_method: Some("AUCTION_WIN".to_string()),
            transaction_id: Some(format!("AUCTION_{}_{}", listing_id, now)),
            notes: Some(format!(
                "Auction win - Final bid: {}",
                format_amount(winner.amount)
            )),
            payment_deadline: Some(now + PAYMENT_WINDOW_MS),
            payment_expired: false,
            paid_at: None,
            created_at: now,
        };
        match self.purchases.create(&purchase).await {
            Ok(purchase_id) => tracing::info!(
                "Purchase record {} created for auction win (listing: {}, buyer: {}, amount: {})",
                purchase_id,
                listing_id,
                winner.bidder_id,
                winner.amount
            ),
            // The winner write already committed and must not be rolled
            // back; the settled-but-purchaseless listing is reconciled
            // manually.
            Err(e) => tracing::error!(
                "Anomaly: auction {} settled but purchase creation failed: {}",
                listing_id,
                e
            ),
        }

        self.send_winner_notifications(&listing, &winner).await;

        tracing::info!(
            "Successfully processed auction end for listing {} - Winner: {} ({}) - Amount: {}",
            listing_id,
            winner.bidder_name,
            winner.bidder_id,
            winner.amount
        );
        Ok(SettleOutcome::Settled {
            winner_id: winner.bidder_id,
            winning_bid: winner.amount,
        })
    }

    /// Maximum-amount scan of the ledger. Insertion order is meaningless;
    /// entries may have landed in any order. Ties keep the earliest-scanned
    /// entry.
    async fn highest_bid(&self, listing_id: &str) -> Result<Option<WinningBid>, HandlerError> {
        let rows = self
            .store
            .query(
                BID_COLLECTION,
                &[("auctionId", json!(listing_id))],
                &QueryOptions::default(),
            )
            .await?;

        let mut highest: Option<WinningBid> = None;
        for (_, doc) in rows {
            let Some(amount) = doc_u64(&doc, "bidAmount") else {
                continue;
            };
            let Some(bidder_id) = doc_str(&doc, "bidderId") else {
                continue;
            };
            if highest.as_ref().is_none_or(|h| amount > h.amount) {
                highest = Some(WinningBid {
                    bidder_id: bidder_id.to_string(),
                    bidder_name: doc_str(&doc, "bidderName")
                        .unwrap_or(crate::identity::UNKNOWN_USER)
                        .to_string(),
                    amount,
                });
            }
        }
        Ok(highest)
    }

    async fn end_without_winner(
        &self,
        listing_id: &str,
        now: u64,
    ) -> Result<SettleOutcome, HandlerError> {
        let active = ListingStatus::Active.to_string();
        let result = self
            .store
            .transact(ARTWORK_COLLECTION, listing_id, &mut |doc| {
                let Some(doc) = doc else {
                    return TxOutcome::Abort;
                };
                let settled = doc_str(doc, "winnerId").is_some_and(|w| !w.is_empty());
                if settled || doc_str(doc, "status") != Some(active.as_str()) {
                    return TxOutcome::Abort;
                }
                let mut updated = doc.clone();
                updated.insert("status".to_string(), json!(ListingStatus::Inactive));
                updated.insert("endedAt".to_string(), json!(now));
                updated.insert("updatedAt".to_string(), json!(now));
                TxOutcome::Write(updated)
            })
            .await?;

        if result.committed() {
            Ok(SettleOutcome::NoBids)
        } else {
            Ok(SettleOutcome::AlreadySettled)
        }
    }

    /// The exactly-once guarantee: the winner fields are written in a
    /// transaction that aborts when any winner is already present.
    async fn record_winner(
        &self,
        listing_id: &str,
        winner: &WinningBid,
        now: u64,
    ) -> Result<bool, HandlerError> {
        let result = self
            .store
            .transact(ARTWORK_COLLECTION, listing_id, &mut |doc| {
                let Some(doc) = doc else {
                    return TxOutcome::Abort;
                };
                if doc_str(doc, "winnerId").is_some_and(|w| !w.is_empty()) {
                    return TxOutcome::Abort;
                }
                let mut updated = doc.clone();
                updated.insert("status".to_string(), json!(ListingStatus::Sold));
                updated.insert("winnerId".to_string(), json!(winner.bidder_id));
                updated.insert("winnerName".to_string(), json!(winner.bidder_name));
                updated.insert("winningBidAmount".to_string(), json!(winner.amount));
                updated.insert("endedAt".to_string(), json!(now));
                updated.insert("soldAt".to_string(), json!(now));
                updated.insert("updatedAt".to_string(), json!(now));
                TxOutcome::Write(updated)
            })
            .await?;
        Ok(result.committed())
    }

    async fn send_winner_notifications(&self, listing: &Listing, winner: &WinningBid) {
        let amount = format_amount(winner.amount);
        let winner_content = format!(
            "🎉 Congratulations! You have won the auction for \"{}\". Your winning bid was {}. \
             Please proceed with payment within 24 hours to complete your purchase.",
            listing.title, amount
        );
        notify_best_effort(
            self.notifier.as_ref(),
            &winner.bidder_id,
            &listing.id,
            &winner_content,
        )
        .await;

        let seller_content = format!(
            "🏆 Your auction for \"{}\" has ended. Winner: {} | Winning Bid: {}. \
             View the auction details in your dashboard.",
            listing.title, winner.bidder_name, amount
        );
        notify_best_effort(
            self.notifier.as_ref(),
            &listing.artist_id,
            &listing.id,
            &seller_content,
        )
        .await;
    }

    /// Sweep every active auction whose end time has passed. End-time
    /// comparison happens in memory; the store only narrows by sale type and
    /// status.
    pub async fn sweep_ended(&self) -> Result<usize, HandlerError> {
        let now = self.clock.now_millis();
        let rows = self
            .store
            .query(
                ARTWORK_COLLECTION,
                &[
                    ("saleType", json!(SaleType::Auction)),
                    ("status", json!(ListingStatus::Active)),
                ],
                &QueryOptions::default(),
            )
            .await?;

        tracing::info!("Found {} active auctions to check", rows.len());
        let mut processed = 0;
        for (listing_id, doc) in rows {
            let Some(end_time) = doc_u64(&doc, "auctionEndTime") else {
                tracing::warn!("Auction {} has no auctionEndTime", listing_id);
                continue;
            };
            if end_time > now {
                continue;
            }
            if doc_str(&doc, "winnerId").is_some_and(|w| !w.is_empty()) {
                tracing::info!("Auction {} already processed", listing_id);
                continue;
            }
            match self.settle(&listing_id).await {
                Ok(_) => processed += 1,
                Err(e) => tracing::error!("Error processing auction {}: {}", listing_id, e),
            }
        }
        tracing::info!("Finished processing ended auctions. Processed: {}", processed);
        Ok(processed)
    }
}
