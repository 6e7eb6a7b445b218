/// Artwork listing documents, keyed by listing id.
pub const ARTWORK_COLLECTION: &str = "artworks";
/// Append-only bid ledger, keyed by bid ulid.
pub const BID_COLLECTION: &str = "bid_history";
/// Purchase records, keyed by purchase ulid.
pub const PURCHASE_COLLECTION: &str = "purchases";
/// User profiles, read-only here.
pub const USER_COLLECTION: &str = "users";
/// System notification messages.
pub const MESSAGE_COLLECTION: &str = "messages";

/// Window an auction winner has to complete payment, in milliseconds.
pub const PAYMENT_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Default sweep period for the background scheduler, in seconds.
pub const SWEEP_PERIOD_SECS: u64 = 60;
/// Delay before the first sweep after startup, in seconds.
pub const SWEEP_STARTUP_DELAY_SECS: u64 = 30;
