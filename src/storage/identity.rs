use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Identity Records
    // ========================================================================

    /// Write a keyed identity record, replacing any previous one for the key.
    ///
    /// Keys are `user:<email>` or `sub:<email>`; `payload` is JSON.
    pub async fn put_identity_record(
        &self,
        key: &str,
        payload: &str,
        recorded_at: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO identity_records (key, payload, recorded_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, recorded_at = excluded.recorded_at
        "#,
        )
        .bind(key)
        .bind(payload)
        .bind(recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// JSON payload stored under `key`.
    pub async fn get_identity_record(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM identity_records WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(payload,)| payload))
    }
}
