use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Profile document from the external identity provider's `users` collection.
/// Read-only here; used to denormalize display names at write time.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Display label resolution: displayName, then "first last", then first
    /// name alone, then username.
    pub fn display_label(&self) -> Option<String> {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Some(name.to_string());
        }
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => return Some(format!("{} {}", first, last)),
            (Some(first), None) => return Some(first.to_string()),
            _ => {}
        }
        self.username.clone()
    }
}
