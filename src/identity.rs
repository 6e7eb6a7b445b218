use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    constants::USER_COLLECTION,
    models::user::UserProfile,
    store::{from_document, DocumentStore, StoreError},
};

/// Fallback label when a profile is missing or unusable.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Read access to the external identity provider's user records.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;
}

/// Identity lookup over the shared document store's `users` collection.
pub struct StoreIdentity {
    store: Arc<dyn DocumentStore>,
}

impl StoreIdentity {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityLookup for StoreIdentity {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        match self.store.get(USER_COLLECTION, user_id).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }
}

/// Resolve a user's display label, swallowing lookup failures. Used when
/// denormalizing bidder and winner names into ledger and listing documents.
pub async fn display_label(identity: &dyn IdentityLookup, user_id: &str) -> String {
    match identity.get_user(user_id).await {
        Ok(Some(profile)) => profile
            .display_label()
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        Ok(None) => UNKNOWN_USER.to_string(),
        Err(e) => {
            tracing::warn!("Error getting display name for {}: {}", user_id, e);
            UNKNOWN_USER.to_string()
        }
    }
}
