//! Sync scheduling: when a fetch from the external feed may be attempted.
//!
//! Two gates govern fetching:
//!
//! - **Cooldown**: after a rate-limit failure, fetches are skipped until
//!   `retry_not_before`. A manual refresh clears the gate first.
//! - **Staleness**: at startup, a cached archive is refreshed in the
//!   background only when the last sync is older than the staleness window.
//!
//! All functions here are pure; persistence of [`SyncState`] lives in
//! [`crate::storage`].
use chrono::{DateTime, Duration, Utc};

use crate::feed::FeedError;

/// Cooldown applied after a rate-limit failure (1 hour).
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 60;

/// Age after which a cached archive triggers a background refresh.
pub const DEFAULT_STALENESS_HOURS: i64 = 24;

/// Message fragments that mark a failure as capacity/quota exhaustion.
///
/// The Feed Client only surfaces a message string, so this is a substring
/// heuristic rather than a protocol-level code.
const RATE_LIMIT_MARKERS: &[&str] = &["capacity", "quota", "429"];

/// Persisted scheduling state, stored alongside (not inside) the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncState {
    /// Set whenever a reconciled archive is written, fetched or not.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Fetches are skipped while `now < retry_not_before`.
    pub retry_not_before: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Drop any active cooldown (manual override).
    pub fn clear_cooldown(self) -> Self {
        Self {
            retry_not_before: None,
            ..self
        }
    }

    /// True while a cooldown is in effect at `now`.
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        matches!(self.retry_not_before, Some(until) if now < until)
    }
}

/// Classification of a Feed Client failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Capacity, quota, or HTTP 429 exhaustion. Triggers the cooldown.
    RateLimited,
    /// Anything else. No cooldown.
    NetworkOrServer,
}

/// Classify a failure by its message.
pub fn classify_failure(error: &FeedError) -> FailureClass {
    let message = error.message().to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m)) {
        FailureClass::RateLimited
    } else {
        FailureClass::NetworkOrServer
    }
}

/// Cooldown gate: false while a rate-limit cooldown is active.
pub fn should_attempt_fetch(now: DateTime<Utc>, state: &SyncState) -> bool {
    !state.is_cooling_down(now)
}

/// Staleness gate: true when the last sync is absent or older than `window`.
pub fn is_stale(now: DateTime<Utc>, state: &SyncState, window: Duration) -> bool {
    match state.last_sync_at {
        Some(last) => now.signed_duration_since(last) > window,
        None => true,
    }
}

/// Transition after a batch was received (empty or not).
pub fn on_fetch_success(now: DateTime<Utc>, state: SyncState) -> SyncState {
    SyncState {
        last_sync_at: Some(now),
        ..state.clear_cooldown()
    }
}

/// Transition after a failed fetch.
///
/// Rate-limit failures start a cooldown of `cooldown` from `now`, saturating
/// at the latest representable instant; other failures leave the state
/// untouched.
pub fn on_fetch_failure(
    now: DateTime<Utc>,
    error: &FeedError,
    state: SyncState,
    cooldown: Duration,
) -> SyncState {
    match classify_failure(error) {
        FailureClass::RateLimited => SyncState {
            retry_not_before: Some(
                now.checked_add_signed(cooldown).unwrap_or(DateTime::<Utc>::MAX_UTC),
            ),
            ..state
        },
        FailureClass::NetworkOrServer => state,
    }
}
