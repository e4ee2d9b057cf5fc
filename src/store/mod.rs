//! Character persistence using SQLite
//!
//! A small key-value table. The character roster is stored as JSON under a
//! single key, so a half-finished setup survives restarts.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::conversation::CharacterRoster;

const ROSTER_KEY: &str = "characters";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt roster record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Corrupt roster timestamp {value:?}: {source}")]
    CorruptTimestamp {
        value: String,
        source: chrono::ParseError,
    },
}

/// A stored roster with its last write time
#[derive(Debug, Clone)]
pub struct StoredRoster {
    pub roster: CharacterRoster,
    pub updated_at: DateTime<Utc>,
}

pub struct CharacterStore {
    pool: SqlitePool,
    /// Held across load-modify-save so concurrent setup requests see each other's writes
    roster_lock: Mutex<()>,
}

impl CharacterStore {
    /// Open (or create) the database file at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::with_pool(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::with_pool(pool);
        store.init_schema().await?;
        Ok(store)
    }

    fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            roster_lock: Mutex::new(()),
        }
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the roster, or `None` if setup never started
    pub async fn load_roster(&self) -> Result<Option<StoredRoster>, StoreError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT value, updated_at FROM kv WHERE key = ?")
                .bind(ROSTER_KEY)
                .fetch_optional(&self.pool)
                .await?;

        let Some((value, updated_at)) = row else {
            return Ok(None);
        };

        let roster = serde_json::from_str(&value)?;
        let updated_at = match DateTime::parse_from_rfc3339(&updated_at) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(source) => {
                return Err(StoreError::CorruptTimestamp {
                    value: updated_at,
                    source,
                })
            }
        };

        Ok(Some(StoredRoster {
            roster,
            updated_at,
        }))
    }

    /// Read the roster, apply `update` and save the result, one caller at a time.
    ///
    /// Nothing is written when `update` fails.
    pub async fn update_roster<T, E>(
        &self,
        update: impl FnOnce(&mut CharacterRoster) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let _guard = self.roster_lock.lock().await;

        let mut roster = self
            .load_roster()
            .await?
            .map(|stored| stored.roster)
            .unwrap_or_default();
        let output = update(&mut roster)?;
        self.write_roster(&roster).await?;

        Ok(output)
    }

    /// Overwrite the stored roster
    pub async fn save_roster(&self, roster: &CharacterRoster) -> Result<(), StoreError> {
        let _guard = self.roster_lock.lock().await;
        self.write_roster(roster).await
    }

    async fn write_roster(&self, roster: &CharacterRoster) -> Result<(), StoreError> {
        let value = serde_json::to_string(roster)?;

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(ROSTER_KEY)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Forget both characters
    pub async fn clear_roster(&self) -> Result<(), StoreError> {
        let _guard = self.roster_lock.lock().await;
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(ROSTER_KEY)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::conversation::{Character, CharacterError, CharacterSlot};

    #[tokio::test]
    async fn test_roster_round_trip() {
        let store = CharacterStore::open_in_memory().await.unwrap();
        assert!(store.load_roster().await.unwrap().is_none());

        let mut roster = CharacterRoster::new();
        roster
            .add(Character::new("Sam", "curious", "chess, hiking").unwrap())
            .unwrap();
        store.save_roster(&roster).await.unwrap();

        let stored = store.load_roster().await.unwrap().unwrap();
        assert_eq!(stored.roster, roster);
        assert!(stored.roster.character2.is_none());

        roster
            .add(Character::new("Lee", "dry wit", "baking").unwrap())
            .unwrap();
        store.save_roster(&roster).await.unwrap();
        let stored = store.load_roster().await.unwrap().unwrap();
        assert!(stored.roster.is_complete());
    }

    #[tokio::test]
    async fn test_clear_roster() {
        let store = CharacterStore::open_in_memory().await.unwrap();
        store.save_roster(&CharacterRoster::new()).await.unwrap();
        store.clear_roster().await.unwrap();
        assert!(store.load_roster().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let store = CharacterStore::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(ROSTER_KEY)
            .bind("not json")
            .bind(Utc::now().to_rfc3339())
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(matches!(
            store.load_roster().await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_is_an_error() {
        let store = CharacterStore::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(ROSTER_KEY)
            .bind("{}")
            .bind("yesterday-ish")
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(matches!(
            store.load_roster().await,
            Err(StoreError::CorruptTimestamp { ref value, .. }) if value == "yesterday-ish"
        ));
    }

    #[tokio::test]
    async fn test_failed_update_writes_nothing() {
        let store = CharacterStore::open_in_memory().await.unwrap();
        let result: anyhow::Result<()> = store
            .update_roster(|roster| {
                roster.add(Character::new("Sam", "", "").unwrap())?;
                Err(CharacterError::RosterFull.into())
            })
            .await;
        assert_eq!(
            result.unwrap_err().downcast_ref::<CharacterError>(),
            Some(&CharacterError::RosterFull)
        );
        assert!(store.load_roster().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_fill_both_slots() {
        for _ in 0..20 {
            let store = Arc::new(CharacterStore::open_in_memory().await.unwrap());
            let add = |name: &'static str| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .update_roster(|roster| -> anyhow::Result<CharacterSlot> {
                            Ok(roster.add(Character::new(name, "", "")?)?)
                        })
                        .await
                })
            };

            let (a, b) = tokio::join!(add("Sam"), add("Lee"));
            let mut slots = vec![a.unwrap().unwrap(), b.unwrap().unwrap()];
            slots.sort_by_key(|slot| slot.to_string());
            assert_eq!(slots, [CharacterSlot::Character1, CharacterSlot::Character2]);

            let stored = store.load_roster().await.unwrap().unwrap();
            assert!(stored.roster.is_complete());
        }
    }
}
