use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::schema::Database;
use crate::archive::Archive;
use crate::sync::SyncState;

/// Serialized [`Archive`] JSON.
pub const ARCHIVE_SLOT: &str = "archive.blob";
/// Epoch millis of the last successful reconciliation write.
pub const LAST_SYNCED_SLOT: &str = "sync.last_synced_at";
/// Epoch millis before which no fetch is attempted. Absent means no cooldown.
pub const RETRY_UNTIL_SLOT: &str = "sync.retry_until";

impl Database {
    // ========================================================================
    // Raw Slot Operations
    // ========================================================================

    pub async fn get_slot(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM sync_slots WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Write a slot (UPSERT).
    pub async fn set_slot(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_slots (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn clear_slot(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM sync_slots WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ========================================================================
    // Archive Blob
    // ========================================================================

    /// Raw archive JSON, unparsed.
    ///
    /// Parsing is left to the caller so a corrupt blob can be told apart
    /// from a missing one.
    pub async fn load_archive_blob(&self) -> Result<Option<String>> {
        self.get_slot(ARCHIVE_SLOT).await
    }

    pub async fn save_archive(&self, archive: &Archive) -> Result<()> {
        let blob = serde_json::to_string(archive).context("Failed to serialize archive")?;
        self.set_slot(ARCHIVE_SLOT, &blob).await?;
        tracing::debug!(
            articles = archive.articles.len(),
            sources = archive.sources.len(),
            bytes = blob.len(),
            "Archive saved"
        );
        Ok(())
    }

    // ========================================================================
    // Sync State
    // ========================================================================

    /// Read both timestamps. Unparsable values read as absent.
    pub async fn load_sync_state(&self) -> Result<SyncState> {
        let last_sync_at = self.load_timestamp(LAST_SYNCED_SLOT).await?;
        let retry_not_before = self.load_timestamp(RETRY_UNTIL_SLOT).await?;
        Ok(SyncState {
            last_sync_at,
            retry_not_before,
        })
    }

    /// Write both timestamps; `None` deletes the slot.
    pub async fn save_sync_state(&self, state: &SyncState) -> Result<()> {
        self.store_timestamp(LAST_SYNCED_SLOT, state.last_sync_at)
            .await?;
        self.store_timestamp(RETRY_UNTIL_SLOT, state.retry_not_before)
            .await?;
        Ok(())
    }

    async fn load_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.get_slot(key).await? else {
            return Ok(None);
        };
        let parsed = parse_epoch_millis(&raw);
        if parsed.is_none() {
            tracing::warn!(slot = key, value = %raw, "Ignoring unparsable timestamp slot");
        }
        Ok(parsed)
    }

    async fn store_timestamp(&self, key: &str, value: Option<DateTime<Utc>>) -> Result<()> {
        match value {
            Some(ts) => self.set_slot(key, &ts.timestamp_millis().to_string()).await,
            None => self.clear_slot(key).await,
        }
    }
}

fn parse_epoch_millis(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{Article, Source};
    use chrono::{Duration, TimeZone};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn sample_archive() -> Archive {
        Archive {
            articles: vec![Article {
                title: "Chip Export Rules Tighten".to_string(),
                excerpt: "New limits".to_string(),
                content: "Body".to_string(),
                category: "POLICY".to_string(),
                source_url: "https://example.com/chips".to_string(),
                date: "2024-02-10".to_string(),
                tags: vec!["policy".to_string()],
            }],
            sources: vec![Source {
                title: "Example".to_string(),
                uri: "https://example.com/chips".to_string(),
            }],
            last_updated: "2/10/2024".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_slot_is_none() {
        let db = test_db().await;
        assert_eq!(db.get_slot("nothing.here").await.unwrap(), None);
        assert_eq!(db.load_archive_blob().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_slot_upsert_and_clear() {
        let db = test_db().await;
        db.set_slot("k", "one").await.unwrap();
        db.set_slot("k", "two").await.unwrap();
        assert_eq!(db.get_slot("k").await.unwrap(), Some("two".to_string()));

        db.clear_slot("k").await.unwrap();
        assert_eq!(db.get_slot("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_archive_blob_round_trip() {
        let db = test_db().await;
        let archive = sample_archive();
        db.save_archive(&archive).await.unwrap();

        let blob = db.load_archive_blob().await.unwrap().unwrap();
        let loaded: Archive = serde_json::from_str(&blob).unwrap();
        assert_eq!(loaded, archive);
    }

    #[tokio::test]
    async fn test_sync_state_defaults_to_absent() {
        let db = test_db().await;
        let state = db.load_sync_state().await.unwrap();
        assert_eq!(state, SyncState::default());
    }

    #[tokio::test]
    async fn test_sync_state_round_trip_and_clear() {
        let db = test_db().await;
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let state = SyncState {
            last_sync_at: Some(now),
            retry_not_before: Some(now + Duration::hours(1)),
        };
        db.save_sync_state(&state).await.unwrap();
        assert_eq!(db.load_sync_state().await.unwrap(), state);

        let cleared = state.clear_cooldown();
        db.save_sync_state(&cleared).await.unwrap();
        assert_eq!(db.get_slot(RETRY_UNTIL_SLOT).await.unwrap(), None);
        assert_eq!(db.load_sync_state().await.unwrap(), cleared);
    }

    #[tokio::test]
    async fn test_timestamps_stored_as_epoch_millis() {
        let db = test_db().await;
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        db.save_sync_state(&SyncState {
            last_sync_at: Some(now),
            retry_not_before: None,
        })
        .await
        .unwrap();

        assert_eq!(
            db.get_slot(LAST_SYNCED_SLOT).await.unwrap(),
            Some("1704067200000".to_string())
        );
    }

    #[tokio::test]
    async fn test_unparsable_timestamp_reads_as_absent() {
        let db = test_db().await;
        db.set_slot(RETRY_UNTIL_SLOT, "not-a-number").await.unwrap();
        db.set_slot(LAST_SYNCED_SLOT, "1704067200000").await.unwrap();

        let state = db.load_sync_state().await.unwrap();
        assert_eq!(state.retry_not_before, None);
        assert!(state.last_sync_at.is_some());
    }
}
