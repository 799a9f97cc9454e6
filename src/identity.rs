//! Sign-in and subscription record keeping.
//!
//! Independent of the archive: each operation validates an email, writes one
//! keyed record, and updates the locally remembered identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::storage::Database;

const EMAIL_PREF: &str = "identity.email";
const SUBSCRIBED_PREF: &str = "identity.subscribed";
const IDENTITY_PREFIX: &str = "identity.";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Stored under `user:<email>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRecord {
    pub last_login: DateTime<Utc>,
}

/// Stored under `sub:<email>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub active: bool,
}

/// Who is signed in on this device, as remembered in preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalIdentity {
    pub email: Option<String>,
    pub subscribed: bool,
}

impl LocalIdentity {
    pub async fn load(db: &Database) -> Result<Self, IdentityError> {
        let mut identity = Self::default();
        for (key, value) in db.get_preferences_by_prefix(IDENTITY_PREFIX).await? {
            match key.as_str() {
                EMAIL_PREF => identity.email = Some(value),
                SUBSCRIBED_PREF => identity.subscribed = value == "true",
                other => tracing::debug!(key = other, "Ignoring unknown identity preference"),
            }
        }
        Ok(identity)
    }

    /// Forget the local identity. Stored sign-in and subscription records stay.
    pub async fn sign_out(db: &Database) -> Result<(), IdentityError> {
        let removed = db.delete_preferences_by_prefix(IDENTITY_PREFIX).await?;
        tracing::info!(removed, "Signed out");
        Ok(())
    }
}

/// Trimmed email, or [`IdentityError::InvalidEmail`] when empty or missing `@`.
pub fn validate_email(email: &str) -> Result<&str, IdentityError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(IdentityError::InvalidEmail(email.to_owned()));
    }
    Ok(email)
}

/// Record a sign-in and remember the email locally.
///
/// Returns an opaque session token: hex SHA-256 of the email and the
/// sign-in time in epoch millis.
pub async fn record_sign_in(
    db: &Database,
    email: &str,
    now: DateTime<Utc>,
) -> Result<String, IdentityError> {
    let email = validate_email(email)?;
    let record = SignInRecord { last_login: now };
    let payload = serde_json::to_string(&record).map_err(anyhow::Error::from)?;

    db.put_identity_record(&format!("user:{email}"), &payload, now.timestamp_millis())
        .await?;
    db.set_preference(EMAIL_PREF, email).await?;

    tracing::info!("Sign-in recorded");
    Ok(session_token(email, now))
}

/// Record an active subscription and remember it locally.
pub async fn record_subscription(
    db: &Database,
    email: &str,
    now: DateTime<Utc>,
) -> Result<(), IdentityError> {
    let email = validate_email(email)?;
    let record = SubscriptionRecord {
        email: email.to_owned(),
        timestamp: now,
        active: true,
    };
    let payload = serde_json::to_string(&record).map_err(anyhow::Error::from)?;

    db.put_identity_record(&format!("sub:{email}"), &payload, now.timestamp_millis())
        .await?;
    db.set_preference(EMAIL_PREF, email).await?;
    db.set_preference(SUBSCRIBED_PREF, "true").await?;

    tracing::info!("Subscription recorded");
    Ok(())
}

fn session_token(email: &str, now: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(now.timestamp_millis().to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("  reader@example.com ").unwrap(), "reader@example.com");
        assert!(matches!(
            validate_email(""),
            Err(IdentityError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("not-an-email"),
            Err(IdentityError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_writes_record_and_returns_token() {
        let db = test_db().await;
        let token = record_sign_in(&db, "reader@example.com", now()).await.unwrap();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token, session_token("reader@example.com", now()));

        let payload = db
            .get_identity_record("user:reader@example.com")
            .await
            .unwrap()
            .unwrap();
        let record: SignInRecord = serde_json::from_str(&payload).unwrap();
        assert_eq!(record.last_login, now());
        assert!(payload.contains("lastLogin"));

        let identity = LocalIdentity::load(&db).await.unwrap();
        assert_eq!(identity.email.as_deref(), Some("reader@example.com"));
        assert!(!identity.subscribed);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_invalid_email_without_writing() {
        let db = test_db().await;
        let err = record_sign_in(&db, "nobody", now()).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidEmail(_)));
        assert_eq!(LocalIdentity::load(&db).await.unwrap(), LocalIdentity::default());
    }

    #[tokio::test]
    async fn test_subscription_record_is_active() {
        let db = test_db().await;
        record_subscription(&db, "reader@example.com", now())
            .await
            .unwrap();

        let payload = db
            .get_identity_record("sub:reader@example.com")
            .await
            .unwrap()
            .unwrap();
        let record: SubscriptionRecord = serde_json::from_str(&payload).unwrap();
        assert!(record.active);
        assert_eq!(record.email, "reader@example.com");

        let identity = LocalIdentity::load(&db).await.unwrap();
        assert!(identity.subscribed);
    }

    #[tokio::test]
    async fn test_sign_out_clears_local_identity_only() {
        let db = test_db().await;
        record_subscription(&db, "reader@example.com", now())
            .await
            .unwrap();

        LocalIdentity::sign_out(&db).await.unwrap();

        assert_eq!(LocalIdentity::load(&db).await.unwrap(), LocalIdentity::default());
        assert!(db
            .get_identity_record("sub:reader@example.com")
            .await
            .unwrap()
            .is_some());
    }
}
