use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use ulid::Ulid;

use crate::{
    clock::Clock,
    constants::{ARTWORK_COLLECTION, BID_COLLECTION},
    errors::HandlerError,
    identity::{display_label, IdentityLookup},
    models::{
        bid::{BidRecord, BidStatus, BidderEntry, BidderSort, UserBidEntry},
        listing::{Listing, ListingStatus, SaleType},
    },
    notify::format_amount,
    store::{
        doc_str, doc_u64, from_document, to_document, DocumentStore, QueryOptions, TxOutcome,
    },
};

/// Why a bid was turned away. Each maps to a distinct reason string so the
/// client can tell the cases apart; none is ever retried server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidRejection {
    NotFound,
    NotAuction,
    NotActive,
    Ended,
    OwnListing,
    TooLow { floor: u64 },
}

impl BidRejection {
    pub fn reason(&self) -> String {
        match self {
            BidRejection::NotFound => "Auction not found".to_string(),
            BidRejection::NotAuction => "This listing is not an auction".to_string(),
            BidRejection::NotActive => "Auction is not active".to_string(),
            BidRejection::Ended => "Auction has ended".to_string(),
            BidRejection::OwnListing => "Owners cannot bid on their own auctions.".to_string(),
            BidRejection::TooLow { floor } => {
                format!("Bid must be higher than the current bid of {}", format_amount(*floor))
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BidRejection::NotFound => StatusCode::NOT_FOUND,
            BidRejection::OwnListing => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidOutcome {
    Accepted { new_current_bid: u64, bid_count: u32 },
    Rejected(BidRejection),
}

/// Validates and places bids.
///
/// The current-bid check and the cache update run inside one listing
/// transaction, so two concurrent bids reading the same stale `currentBid`
/// cannot both be admitted; the loser is re-validated against the winner's
/// write and rejected. The ledger append happens after the commit; a failed
/// append leaves the cache ahead of the ledger, which settlement tolerates.
#[derive(Clone)]
pub struct BiddingEngine {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityLookup>,
    clock: Arc<dyn Clock>,
}

impl BiddingEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            identity,
            clock,
        }
    }

    pub async fn place_bid(
        &self,
        listing_id: &str,
        bidder_id: &str,
        amount: u64,
    ) -> Result<BidOutcome, HandlerError> {
        // Cheap pre-checks on a plain read; everything race-sensitive is
        // re-validated inside the transaction.
        let Some(doc) = self.store.get(ARTWORK_COLLECTION, listing_id).await? else {
            return Ok(BidOutcome::Rejected(BidRejection::NotFound));
        };
        let listing: Listing = from_document(doc)?;
        let now = self.clock.now_millis();
        if listing.sale_type != SaleType::Auction {
            return Ok(BidOutcome::Rejected(BidRejection::NotAuction));
        }
        if listing.status != ListingStatus::Active {
            return Ok(BidOutcome::Rejected(BidRejection::NotActive));
        }
        if listing.auction_end_time.is_none_or(|end| end <= now) {
            return Ok(BidOutcome::Rejected(BidRejection::Ended));
        }
        if listing.artist_id == bidder_id {
            tracing::warn!(
                "Auction owner attempted to bid on their own auction. User ID: {}, Auction ID: {}",
                bidder_id,
                listing_id
            );
            return Ok(BidOutcome::Rejected(BidRejection::OwnListing));
        }

        let active = ListingStatus::Active.to_string();
        let auction = SaleType::Auction.to_string();
        let mut rejection: Option<BidRejection> = None;
        let mut snapshot: Option<(u64, u32)> = None;

        let result = self
            .store
            .transact(ARTWORK_COLLECTION, listing_id, &mut |doc| {
                let Some(doc) = doc else {
                    rejection = Some(BidRejection::NotFound);
                    return TxOutcome::Abort;
                };
                if doc_str(doc, "saleType") != Some(auction.as_str()) {
                    rejection = Some(BidRejection::NotAuction);
                    return TxOutcome::Abort;
                }
                if doc_str(doc, "status") != Some(active.as_str()) {
                    rejection = Some(BidRejection::NotActive);
                    return TxOutcome::Abort;
                }
                // Status flag may lag behind the wall clock, so both are
                // checked.
                match doc_u64(doc, "auctionEndTime") {
                    Some(end) if end > now => {}
                    _ => {
                        rejection = Some(BidRejection::Ended);
                        return TxOutcome::Abort;
                    }
                }
                let floor = doc_u64(doc, "currentBid")
                    .filter(|current| *current > 0)
                    .or_else(|| doc_u64(doc, "startingBid"))
                    .unwrap_or(0);
                if amount <= floor {
                    rejection = Some(BidRejection::TooLow { floor });
                    return TxOutcome::Abort;
                }

                let bid_count = doc_u64(doc, "bidCount").unwrap_or(0) as u32 + 1;
                let mut updated = doc.clone();
                updated.insert("currentBid".to_string(), json!(amount));
                updated.insert("bidCount".to_string(), json!(bid_count));
                updated.insert("highestBidderId".to_string(), json!(bidder_id));
                updated.insert("lastBidTime".to_string(), json!(now));
                updated.insert("updatedAt".to_string(), json!(now));
                snapshot = Some((floor, bid_count));
                TxOutcome::Write(updated)
            })
            .await?;

        if !result.committed() {
            return Ok(BidOutcome::Rejected(
                rejection.unwrap_or(BidRejection::NotActive),
            ));
        }
        let Some((previous_bid, bid_count)) = snapshot else {
            return Err(HandlerError::HandlerError(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Bid committed without a snapshot".to_string(),
            ));
        };

        tracing::info!(
            "Bid accepted for auction {} by user {}: {} (previous {})",
            listing_id,
            bidder_id,
            amount,
            previous_bid
        );

        let bidder_name = display_label(self.identity.as_ref(), bidder_id).await;
        let record = BidRecord {
            auction_id: listing_id.to_string(),
            bidder_id: bidder_id.to_string(),
            bidder_name,
            bid_amount: amount,
            previous_bid,
            created_at: now,
        };
        if let Err(e) = self.append_ledger(&record).await {
            // The bid stands; settlement falls back to the listing cache
            // when the ledger is missing this entry.
            tracing::error!(
                "Failed to record bid history for auction {}: {}",
                listing_id,
                e
            );
        }

        Ok(BidOutcome::Accepted {
            new_current_bid: amount,
            bid_count,
        })
    }

    async fn append_ledger(&self, record: &BidRecord) -> Result<(), HandlerError> {
        self.store
            .put(
                BID_COLLECTION,
                &Ulid::new().to_string(),
                to_document(record)?,
            )
            .await?;
        Ok(())
    }

    /// Per-auction bidder view, sorted by amount or recency, each row labeled
    /// with its standing relative to the listing's cached highest bidder.
    pub async fn bidders(
        &self,
        listing_id: &str,
        sort: BidderSort,
    ) -> Result<Vec<BidderEntry>, HandlerError> {
        let Some(doc) = self.store.get(ARTWORK_COLLECTION, listing_id).await? else {
            return Err(HandlerError::not_found());
        };
        let listing: Listing = from_document(doc)?;

        let rows = self
            .store
            .query(
                BID_COLLECTION,
                &[("auctionId", json!(listing_id))],
                &QueryOptions::default(),
            )
            .await?;

        let mut entries: Vec<BidderEntry> = Vec::with_capacity(rows.len());
        for (bid_id, doc) in rows {
            let record: BidRecord = match from_document(doc) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping malformed bid {}: {}", bid_id, e);
                    continue;
                }
            };
            entries.push(BidderEntry {
                bid_id,
                bidder_id: record.bidder_id,
                bidder_name: record.bidder_name,
                bid_amount: record.bid_amount,
                previous_bid: record.previous_bid,
                timestamp: record.created_at,
                bid_status: BidStatus::Outbid,
            });
        }

        match sort {
            BidderSort::Amount => entries.sort_by(|a, b| b.bid_amount.cmp(&a.bid_amount)),
            BidderSort::Latest => entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }

        let highest_amount = entries.iter().map(|e| e.bid_amount).max().unwrap_or(0);
        let ended = listing.status != ListingStatus::Active;
        for entry in &mut entries {
            let top = entry.bid_amount == highest_amount
                && listing.highest_bidder_id.as_deref() == Some(entry.bidder_id.as_str());
            entry.bid_status = match (top, ended) {
                (true, true) => BidStatus::Winning,
                (true, false) => BidStatus::Highest,
                (false, _) => BidStatus::Outbid,
            };
        }

        Ok(entries)
    }

    /// A user's bidding history, latest first, joined with listing details.
    /// Bids on listings that have since disappeared are dropped.
    pub async fn user_bids(&self, bidder_id: &str) -> Result<Vec<UserBidEntry>, HandlerError> {
        let rows = self
            .store
            .query(
                BID_COLLECTION,
                &[("bidderId", json!(bidder_id))],
                &QueryOptions::ordered("createdAt", crate::store::SortDirection::Desc),
            )
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (bid_id, doc) in rows {
            let record: BidRecord = match from_document(doc) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping malformed bid {}: {}", bid_id, e);
                    continue;
                }
            };
            let Some(listing_doc) = self
                .store
                .get(ARTWORK_COLLECTION, &record.auction_id)
                .await?
            else {
                continue;
            };
            let listing: Listing = from_document(listing_doc)?;
            out.push(UserBidEntry {
                bid_id,
                auction_id: record.auction_id,
                bid_amount: record.bid_amount,
                timestamp: record.created_at,
                title: listing.title,
                artist_name: listing.artist_name,
                current_bid: listing.current_bid,
                highest_bidder_id: listing.highest_bidder_id,
            });
        }
        Ok(out)
    }
}
