//! Local-first news briefing archive.
//!
//! The crate keeps a bounded, deduplicated archive of articles on disk and
//! reconciles it with an intermittent, rate-limited external feed:
//!
//! - [`archive`] - Data model, bundled seed catalog, and the pure reconciler
//! - [`sync`] - Cooldown and staleness gates deciding when a fetch is attempted
//! - [`feed`] - The Feed Client contract and its HTTP implementation
//! - [`storage`] - SQLite-backed slots for the archive and sync timestamps
//! - [`session`] - Startup state machine, refresh flow, and snapshot publication
//! - [`identity`] - Sign-in and subscription record keeping (independent of the archive)

pub mod archive;
pub mod config;
pub mod feed;
pub mod identity;
pub mod session;
pub mod storage;
pub mod sync;
pub mod util;
