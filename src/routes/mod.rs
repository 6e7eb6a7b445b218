use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod auctions;
pub mod listings;
pub mod purchases;

/// Result of a manually triggered sweep.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub processed: usize,
}
