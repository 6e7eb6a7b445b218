use std::sync::Arc;

use async_trait::async_trait;
use ulid::Ulid;

use crate::{
    clock::Clock,
    constants::MESSAGE_COLLECTION,
    models::message::{Message, MessageType, SYSTEM_SENDER},
    store::{to_document, DocumentStore, StoreError},
};

/// Fire-and-forget notification capability. Failures are logged by callers
/// and never affect the outcome of the operation that triggered them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: &str,
        artwork_id: &str,
        content: &str,
        kind: MessageType,
    ) -> Result<(), StoreError>;
}

/// Notifier that drops SYSTEM messages into the `messages` collection.
pub struct MessageNotifier {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl MessageNotifier {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl Notifier for MessageNotifier {
    async fn notify(
        &self,
        user_id: &str,
        artwork_id: &str,
        content: &str,
        kind: MessageType,
    ) -> Result<(), StoreError> {
        let message = Message {
            sender_id: SYSTEM_SENDER.to_string(),
            receiver_id: user_id.to_string(),
            artwork_id: artwork_id.to_string(),
            content: content.to_string(),
            message_type: kind,
            read: false,
            created_at: self.clock.now_millis(),
        };
        self.store
            .put(
                MESSAGE_COLLECTION,
                &Ulid::new().to_string(),
                to_document(&message)?,
            )
            .await
    }
}

/// Format cents as the user-facing currency string.
pub fn format_amount(cents: u64) -> String {
    format!("RM {}.{:02}", cents / 100, cents % 100)
}

/// Send a notification, logging and swallowing any failure.
pub async fn notify_best_effort(
    notifier: &dyn Notifier,
    user_id: &str,
    artwork_id: &str,
    content: &str,
) {
    if let Err(e) = notifier
        .notify(
            user_id,
            artwork_id,
            content,
            MessageType::PurchaseNotification,
        )
        .await
    {
        tracing::warn!(
            "Failed to send notification to {} for artwork {}: {}",
            user_id,
            artwork_id,
            e
        );
    }
}
