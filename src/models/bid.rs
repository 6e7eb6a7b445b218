use core::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One entry of the append-only bid ledger. Never mutated or deleted; the
/// ledger is the source of truth for winner determination.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BidRecord {
    /// Listing the bid targets.
    pub auction_id: String,
    pub bidder_id: String,
    /// Bidder display name, denormalized at write time.
    pub bidder_name: String,
    /// Bid amount in cents.
    pub bid_amount: u64,
    /// Cached current bid at the moment this bid was accepted, in cents.
    pub previous_bid: u64,
    pub created_at: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidRequest {
    /// Bid amount in cents. Must be strictly higher than the current bid.
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BidResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_current_bid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

/// Standing of a bid relative to the rest of the ledger.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    /// Top bid of an auction still running.
    Highest,
    /// Top bid of an auction that has ended.
    Winning,
    Outbid,
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            BidStatus::Highest => "HIGHEST",
            BidStatus::Winning => "WINNING",
            BidStatus::Outbid => "OUTBID",
        };
        write!(f, "{}", out)
    }
}

/// One row of the per-auction bidder view.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BidderEntry {
    pub bid_id: String,
    pub bidder_id: String,
    pub bidder_name: String,
    pub bid_amount: u64,
    pub previous_bid: u64,
    pub timestamp: u64,
    pub bid_status: BidStatus,
}

/// Sort order for the bidder view.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BidderSort {
    /// Highest amount first.
    Amount,
    /// Most recent first.
    #[default]
    Latest,
}

/// One row of a user's bidding history, joined with its listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserBidEntry {
    pub bid_id: String,
    pub auction_id: String,
    pub bid_amount: u64,
    pub timestamp: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_bid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_bidder_id: Option<String>,
}
