pub mod identity;

pub use identity::{require_user, UserId};
