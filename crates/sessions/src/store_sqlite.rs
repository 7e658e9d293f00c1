use std::time::{SystemTime, UNIX_EPOCH};

use {
    async_trait::async_trait,
    sqlx::sqlite::{SqlitePool, SqlitePoolOptions},
    tracing::debug,
};

use {
    palaver_common::StoreError,
    palaver_config::{StoreConfig, schema::is_valid_table_name},
};

use crate::{
    key::SessionKey,
    payload::StoredPayload,
    store::{SessionRecord, SessionStore},
};

/// SQLite-backed session store: one row per key, value kept as JSON text.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
    table: String,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    session_key: String,
    session_value: String,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl SqliteSessionStore {
    /// Wrap an existing pool. The table name is validated because it ends up
    /// inside SQL text.
    pub fn new(pool: SqlitePool, table: &str) -> Result<Self, StoreError> {
        if !is_valid_table_name(table) {
            return Err(StoreError::InvalidTable(table.to_string()));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Open a pool from config and make sure the table exists.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut options = SqlitePoolOptions::new();
        // Every connection to `:memory:` opens a separate database.
        if config.database_url.contains(":memory:") {
            options = options.max_connections(1);
        }
        let pool = options
            .connect(&config.database_url)
            .await
            .map_err(StoreError::backend)?;
        let store = Self::new(pool, &config.table_name)?;
        store.init().await?;
        Ok(store)
    }

    /// Create the session table if it doesn't exist.
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" (
                session_key   TEXT PRIMARY KEY,
                session_value TEXT NOT NULL,
                updated_at    INTEGER NOT NULL
            )"#,
            self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        debug!(table = %self.table, "session table ready");
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// All stored keys, oldest write first.
    pub async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(&format!(
            r#"SELECT session_key FROM "{}" ORDER BY updated_at ASC, session_key ASC"#,
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)
    }

    async fn upsert(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        let value = serde_json::to_string(&payload.to_wire()).map_err(StoreError::Encode)?;
        sqlx::query(&format!(
            r#"INSERT INTO "{}" (session_key, session_value, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT(session_key) DO UPDATE SET
                 session_value = excluded.session_value,
                 updated_at = excluded.updated_at"#,
            self.table
        ))
        .bind(key.as_str())
        .bind(value)
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        self.upsert(key, payload).await
    }

    async fn read(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"SELECT session_key, session_value FROM "{}" WHERE session_key = ?"#,
            self.table
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(|row| {
            let value =
                serde_json::from_str(&row.session_value).map_err(|source| StoreError::Decode {
                    key: row.session_key.clone(),
                    source,
                })?;
            Ok(SessionRecord {
                key: SessionKey(row.session_key),
                value,
            })
        })
        .transpose()
    }

    async fn update(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        self.upsert(key, payload).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"DELETE FROM "{}" WHERE session_key = ?"#,
            self.table
        ))
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    async fn sqlite_store() -> SqliteSessionStore {
        // A single connection, or each pooled connection gets its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteSessionStore::new(pool, "bot-sessions").unwrap();
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_sqlite_crud() {
        let store = sqlite_store().await;
        let key = SessionKey::for_conversation("1", "1");

        assert!(store.read(&key).await.unwrap().is_none());

        store
            .create(&key, &StoredPayload::Native(json!({})))
            .await
            .unwrap();
        let record = store.read(&key).await.unwrap().unwrap();
        assert_eq!(record.key, key);
        assert_eq!(record.value, json!({}));

        store
            .update(&key, &StoredPayload::Native(json!({ "a": 1 })))
            .await
            .unwrap();
        assert_eq!(
            store.read(&key).await.unwrap().unwrap().value,
            json!({ "a": 1 })
        );

        store.delete(&key).await.unwrap();
        assert!(store.read(&key).await.unwrap().is_none());
        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_create_twice_overwrites() {
        let store = sqlite_store().await;
        let key = SessionKey::for_conversation("2", "3");
        store
            .create(&key, &StoredPayload::Native(json!({ "old": true })))
            .await
            .unwrap();
        store
            .create(&key, &StoredPayload::Native(json!({})))
            .await
            .unwrap();
        assert_eq!(store.read(&key).await.unwrap().unwrap().value, json!({}));
        assert_eq!(store.list_keys().await.unwrap(), vec!["2:3".to_string()]);
    }

    #[tokio::test]
    async fn test_sqlite_binary_surfaces_as_wrapper() {
        let store = sqlite_store().await;
        let key = SessionKey::for_conversation("5", "8");
        store
            .update(&key, &StoredPayload::Binary(vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(
            store.read(&key).await.unwrap().unwrap().value,
            json!({ "B": "AQID" })
        );
    }

    #[tokio::test]
    async fn test_sqlite_corrupt_row_is_decode_error() {
        let store = sqlite_store().await;
        sqlx::query(
            r#"INSERT INTO "bot-sessions" (session_key, session_value, updated_at)
               VALUES ('bad', '{not json', 0)"#,
        )
        .execute(&store.pool)
        .await
        .unwrap();
        let err = store
            .read(&SessionKey("bad".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_sqlite_connect_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("s.db").display());
        let config = StoreConfig {
            table_name: "chat_state".into(),
            database_url: url,
        };
        let store = SqliteSessionStore::connect(&config).await.unwrap();
        assert_eq!(store.table(), "chat_state");
        let key = SessionKey::for_conversation("1", "2");
        store
            .update(&key, &StoredPayload::Native(json!({ "k": "v" })))
            .await
            .unwrap();

        // A second store on the same file sees the write.
        let reopened = SqliteSessionStore::connect(&config).await.unwrap();
        assert_eq!(
            reopened.read(&key).await.unwrap().unwrap().value,
            json!({ "k": "v" })
        );
    }

    #[tokio::test]
    async fn test_rejects_bad_table_name() {
        let pool = SqlitePoolOptions::new().connect_lazy("sqlite::memory:").unwrap();
        let err = SqliteSessionStore::new(pool, "x\" OR 1=1").unwrap_err();
        assert!(matches!(err, StoreError::InvalidTable(_)));
    }
}
