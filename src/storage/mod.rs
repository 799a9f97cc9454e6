//! SQLite-backed Persistent Store.
//!
//! - [`Database`] - Connection pool and schema migration
//! - Slots (`slots.rs`) - Archive blob and sync timestamps as key/value rows
//! - Preferences (`preferences.rs`) - Small dotted-key settings such as the local identity
//! - Identity records (`identity.rs`) - Keyed JSON records for sign-in and subscription

mod identity;
mod preferences;
mod schema;
mod slots;
mod types;

pub use schema::Database;
pub use slots::{ARCHIVE_SLOT, LAST_SYNCED_SLOT, RETRY_UNTIL_SLOT};
pub use types::DatabaseError;
