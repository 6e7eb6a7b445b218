use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sender id used for system-generated notifications.
pub const SYSTEM_SENDER: &str = "SYSTEM";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    PurchaseNotification,
}

/// Notification message dropped into a user's inbox. Delivery beyond the
/// `messages` collection is someone else's problem.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender_id: String,
    pub receiver_id: String,
    pub artwork_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub read: bool,
    pub created_at: u64,
}
