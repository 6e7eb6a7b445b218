use core::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How an artwork is offered for sale.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    FixedPrice,
    Auction,
}

impl fmt::Display for SaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            SaleType::FixedPrice => "FIXED_PRICE",
            SaleType::Auction => "AUCTION",
        };
        write!(f, "{}", out)
    }
}

/// Listing state enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Draft,
    Active,
    Sold,
    Inactive,
    Removed,
}

impl Default for ListingStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            ListingStatus::Draft => "DRAFT",
            ListingStatus::Active => "ACTIVE",
            ListingStatus::Sold => "SOLD",
            ListingStatus::Inactive => "INACTIVE",
            ListingStatus::Removed => "REMOVED",
        };
        write!(f, "{}", out)
    }
}

/// A marketplace artwork record, fixed-price or auction.
///
/// `currentBid`/`highestBidderId` are caches derived from the bid ledger;
/// the ledger stays authoritative when the two diverge.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Listing id, document key.
    pub id: String,
    /// Artwork title.
    pub title: String,
    /// Artwork description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning artist's user id. An artist can never win their own auction.
    pub artist_id: String,
    /// Artist display name, denormalized at write time.
    #[serde(default)]
    pub artist_name: Option<String>,
    pub sale_type: SaleType,
    #[serde(default)]
    pub status: ListingStatus,
    /// Asking price in cents, fixed-price sales only.
    #[serde(default)]
    pub price: Option<u64>,
    /// Opening bid in cents, auctions only.
    #[serde(default)]
    pub starting_bid: Option<u64>,
    /// Cached highest bid in cents.
    #[serde(default)]
    pub current_bid: Option<u64>,
    #[serde(default)]
    pub bid_count: u32,
    /// Cached id of the highest bidder.
    #[serde(default)]
    pub highest_bidder_id: Option<String>,
    /// Unix millis of the most recent accepted bid.
    #[serde(default)]
    pub last_bid_time: Option<u64>,
    /// Unix millis at which the auction closes.
    #[serde(default)]
    pub auction_end_time: Option<u64>,
    /// Settlement outcome; immutable once written, except by payment expiry.
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub winner_name: Option<String>,
    #[serde(default)]
    pub winning_bid_amount: Option<u64>,
    /// Unix millis at which the auction was settled.
    #[serde(default)]
    pub ended_at: Option<u64>,
    /// Unix millis at which the listing was sold.
    #[serde(default)]
    pub sold_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Listing {
    /// The amount a new bid has to beat: the cached current bid when one
    /// exists, the starting bid otherwise.
    pub fn bid_floor(&self) -> u64 {
        self.current_bid
            .filter(|amount| *amount > 0)
            .or(self.starting_bid)
            .unwrap_or(0)
    }

    /// Whether settlement has already recorded a winner.
    pub fn has_winner(&self) -> bool {
        self.winner_id.as_deref().is_some_and(|w| !w.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddListingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sale_type: SaleType,
    /// Asking price in cents, required for fixed-price listings.
    #[serde(default)]
    pub price: Option<u64>,
    /// Opening bid in cents, required for auctions.
    #[serde(default)]
    pub starting_bid: Option<u64>,
    /// Unix millis at which the auction closes, required for auctions.
    #[serde(default)]
    pub auction_end_time: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub starting_bid: Option<u64>,
    pub auction_end_time: Option<u64>,
}
