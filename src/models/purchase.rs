use core::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    /// Auction win awaiting payment; reverted by the expiry sweep if the
    /// deadline lapses.
    PendingPayment,
    Completed,
    Expired,
}

impl PurchaseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PurchaseStatus::Completed | PurchaseStatus::Expired)
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            PurchaseStatus::PendingPayment => "PENDING_PAYMENT",
            PurchaseStatus::Completed => "COMPLETED",
            PurchaseStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", out)
    }
}

/// Settlement record tying a buyer to a sold listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub artwork_id: String,
    pub buyer_id: String,
    /// The listing's artist.
    pub seller_id: String,
    /// Sale price in cents.
    pub price: u64,
    pub status: PurchaseStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Unix millis; set only for auction wins.
    #[serde(default)]
    pub payment_deadline: Option<u64>,
    #[serde(default)]
    pub payment_expired: bool,
    /// Unix millis at which the buyer completed payment.
    #[serde(default)]
    pub paid_at: Option<u64>,
    pub created_at: u64,
}

/// Purchase row returned to buyers, with the document key attached.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    pub purchase_id: String,
    #[serde(flatten)]
    pub purchase: Purchase,
}
