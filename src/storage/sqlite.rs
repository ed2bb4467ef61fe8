//! SQLite Persistent Storage
//!
//! Provides durable storage for host zones and epoch unbonding records that
//! survives controller restarts. Records are stored as JSON payloads next to
//! their key columns. Uses connection pooling via r2d2 for concurrent access.

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

use super::traits::{EpochUnbondingStore, HostZoneStore, StorageError, StorageResult};
use crate::types::{EpochUnbondingRecord, HostZone};

/// SQLite-backed store with connection pooling
///
/// Implements both `HostZoneStore` and `EpochUnbondingStore` over one pool.
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: rusqlite::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

/// SQLite integer key for an epoch id; ids above `i64::MAX` would wrap
fn epoch_key(epoch_id: u64) -> Result<i64, StorageError> {
    i64::try_from(epoch_id)
        .map_err(|_| StorageError::InvalidData(format!("epoch id {} out of range", epoch_id)))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    if let rusqlite::Error::SqliteFailure(ref err, _) = e {
        // SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE
        return err.extended_code == 1555 || err.extended_code == 2067;
    }
    false
}

impl SqliteStore {
    /// Create a new store with the given database path
    ///
    /// Creates the database file and runs migrations if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Get a connection from the pool
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool
            .get()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS host_zones (
                chain_id TEXT PRIMARY KEY,
                connection_id TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_host_zones_connection_id ON host_zones(connection_id);

            CREATE TABLE IF NOT EXISTS epoch_unbonding_records (
                epoch_id INTEGER PRIMARY KEY,
                version INTEGER NOT NULL DEFAULT 0,
                data TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn decode_zone(data: &str) -> Result<HostZone, StorageError> {
        serde_json::from_str(data).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    fn decode_record(data: &str, version: i64) -> Result<EpochUnbondingRecord, StorageError> {
        let mut record: EpochUnbondingRecord =
            serde_json::from_str(data).map_err(|e| StorageError::InvalidData(e.to_string()))?;
        record.version = version as u64;
        Ok(record)
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
        serde_json::to_string(value).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    // Synchronous helper methods for the trait implementations

    fn get_zone_sync(&self, chain_id: &str) -> Result<Option<HostZone>, StorageError> {
        let conn = self.conn()?;

        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM host_zones WHERE chain_id = ?1",
                params![chain_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        data.as_deref().map(Self::decode_zone).transpose()
    }

    fn insert_zone_sync(&self, zone: &HostZone) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let data = Self::encode(zone)?;

        conn.execute(
            r#"
            INSERT INTO host_zones (chain_id, connection_id, data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                zone.chain_id,
                zone.connection_id,
                data,
                zone.created_at as i64,
                zone.updated_at as i64,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                return StorageError::Duplicate(format!("chain id: {}", zone.chain_id));
            }
            db_err(e)
        })?;

        Ok(())
    }

    fn update_zone_sync(&self, zone: &HostZone) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let data = Self::encode(zone)?;

        let rows_affected = conn
            .execute(
                r#"
            UPDATE host_zones SET
                connection_id = ?2,
                data = ?3,
                updated_at = ?4
            WHERE chain_id = ?1
            "#,
                params![zone.chain_id, zone.connection_id, data, zone.updated_at as i64],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(StorageError::NotFound(zone.chain_id.clone()));
        }

        Ok(())
    }

    fn list_zones_sync(&self) -> Result<Vec<HostZone>, StorageError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT data FROM host_zones ORDER BY chain_id ASC")
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        rows.iter().map(|data| Self::decode_zone(data)).collect()
    }

    fn delete_zone_sync(&self, chain_id: &str) -> Result<bool, StorageError> {
        let conn = self.conn()?;

        let rows_affected = conn
            .execute("DELETE FROM host_zones WHERE chain_id = ?1", params![chain_id])
            .map_err(db_err)?;

        Ok(rows_affected > 0)
    }

    fn get_record_sync(&self, epoch_id: u64) -> Result<Option<EpochUnbondingRecord>, StorageError> {
        let conn = self.conn()?;

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT data, version FROM epoch_unbonding_records WHERE epoch_id = ?1",
                params![epoch_key(epoch_id)?],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)?;

        row.map(|(data, version)| Self::decode_record(&data, version))
            .transpose()
    }

    fn latest_record_sync(&self) -> Result<Option<EpochUnbondingRecord>, StorageError> {
        let conn = self.conn()?;

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT data, version FROM epoch_unbonding_records ORDER BY epoch_id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)?;

        row.map(|(data, version)| Self::decode_record(&data, version))
            .transpose()
    }

    fn put_record_sync(&self, record: &EpochUnbondingRecord) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let data = Self::encode(record)?;

        conn.execute(
            r#"
            INSERT INTO epoch_unbonding_records (epoch_id, version, data)
            VALUES (?1, 0, ?2)
            ON CONFLICT(epoch_id) DO UPDATE SET
                data = excluded.data,
                version = version + 1
            "#,
            params![epoch_key(record.id)?, data],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn compare_and_swap_sync(&self, record: &EpochUnbondingRecord) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let data = Self::encode(record)?;

        let rows_affected = conn
            .execute(
                r#"
            UPDATE epoch_unbonding_records SET
                data = ?2,
                version = version + 1
            WHERE epoch_id = ?1 AND version = ?3
            "#,
                params![epoch_key(record.id)?, data, record.version as i64],
            )
            .map_err(db_err)?;

        if rows_affected > 0 {
            return Ok(());
        }

        let actual: Option<i64> = conn
            .query_row(
                "SELECT version FROM epoch_unbonding_records WHERE epoch_id = ?1",
                params![epoch_key(record.id)?],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match actual {
            None => Err(StorageError::NotFound(format!("epoch {}", record.id))),
            Some(actual) => Err(StorageError::Conflict {
                key: format!("epoch {}", record.id),
                expected: record.version,
                actual: actual as u64,
            }),
        }
    }

    fn list_records_sync(&self) -> Result<Vec<EpochUnbondingRecord>, StorageError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT data, version FROM epoch_unbonding_records ORDER BY epoch_id ASC")
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        rows.iter()
            .map(|(data, version)| Self::decode_record(data, *version))
            .collect()
    }

    fn delete_record_sync(&self, epoch_id: u64) -> Result<bool, StorageError> {
        let conn = self.conn()?;

        let rows_affected = conn
            .execute(
                "DELETE FROM epoch_unbonding_records WHERE epoch_id = ?1",
                params![epoch_key(epoch_id)?],
            )
            .map_err(db_err)?;

        Ok(rows_affected > 0)
    }
}

#[async_trait]
impl HostZoneStore for SqliteStore {
    async fn get(&self, chain_id: &str) -> StorageResult<Option<HostZone>> {
        self.get_zone_sync(chain_id)
    }

    async fn insert(&self, zone: &HostZone) -> StorageResult<()> {
        self.insert_zone_sync(zone)
    }

    async fn update(&self, zone: &HostZone) -> StorageResult<()> {
        self.update_zone_sync(zone)
    }

    async fn list(&self) -> StorageResult<Vec<HostZone>> {
        self.list_zones_sync()
    }

    async fn delete(&self, chain_id: &str) -> StorageResult<bool> {
        self.delete_zone_sync(chain_id)
    }
}

#[async_trait]
impl EpochUnbondingStore for SqliteStore {
    async fn get(&self, epoch_id: u64) -> StorageResult<Option<EpochUnbondingRecord>> {
        self.get_record_sync(epoch_id)
    }

    async fn latest(&self) -> StorageResult<Option<EpochUnbondingRecord>> {
        self.latest_record_sync()
    }

    async fn put(&self, record: &EpochUnbondingRecord) -> StorageResult<()> {
        self.put_record_sync(record)
    }

    async fn compare_and_swap(&self, record: &EpochUnbondingRecord) -> StorageResult<()> {
        self.compare_and_swap_sync(record)
    }

    async fn list(&self) -> StorageResult<Vec<EpochUnbondingRecord>> {
        self.list_records_sync()
    }

    async fn delete(&self, epoch_id: u64) -> StorageResult<bool> {
        self.delete_record_sync(epoch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HostZoneUnbonding, IcaAccountStatus, IcaAccountType};

    fn create_test_zone(chain_id: &str) -> HostZone {
        HostZone::new(
            chain_id.to_string(),
            "connection-0".to_string(),
            "cosmos".to_string(),
            "ibc/uatom".to_string(),
            "uatom".to_string(),
            "channel-0".to_string(),
            4,
            1_700_000_000,
        )
    }

    #[tokio::test]
    async fn test_insert_and_get_zone() {
        let store = SqliteStore::in_memory().unwrap();
        let zone = create_test_zone("cosmoshub-4");

        HostZoneStore::insert(&store, &zone).await.unwrap();

        let retrieved = HostZoneStore::get(&store, "cosmoshub-4")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved, zone);
    }

    #[tokio::test]
    async fn test_duplicate_zone() {
        let store = SqliteStore::in_memory().unwrap();
        let zone = create_test_zone("cosmoshub-4");

        HostZoneStore::insert(&store, &zone).await.unwrap();
        let result = HostZoneStore::insert(&store, &zone).await;

        assert!(matches!(result, Err(StorageError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_update_zone() {
        let store = SqliteStore::in_memory().unwrap();
        let mut zone = create_test_zone("cosmoshub-4");
        HostZoneStore::insert(&store, &zone).await.unwrap();

        zone.account_mut(IcaAccountType::Fee).unwrap().status = IcaAccountStatus::Requested;
        HostZoneStore::update(&store, &zone).await.unwrap();

        let retrieved = HostZoneStore::get(&store, "cosmoshub-4")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            retrieved.account(IcaAccountType::Fee).unwrap().status,
            IcaAccountStatus::Requested
        );
    }

    #[tokio::test]
    async fn test_record_versions() {
        let store = SqliteStore::in_memory().unwrap();
        EpochUnbondingStore::put(&store, &EpochUnbondingRecord::new(1))
            .await
            .unwrap();

        let mut record = EpochUnbondingStore::get(&store, 1).await.unwrap().unwrap();
        assert_eq!(record.version, 0);

        let stale = record.clone();
        record.insert(HostZoneUnbonding::placeholder("cosmoshub-4", "uatom"));
        store.compare_and_swap(&record).await.unwrap();

        let result = store.compare_and_swap(&stale).await;
        assert!(matches!(result, Err(StorageError::Conflict { actual: 1, .. })));

        let stored = EpochUnbondingStore::get(&store, 1).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert!(stored.contains("cosmoshub-4"));
    }

    #[tokio::test]
    async fn test_latest_record() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.latest().await.unwrap().is_none());

        for id in [2, 5, 4] {
            EpochUnbondingStore::put(&store, &EpochUnbondingRecord::new(id))
                .await
                .unwrap();
        }

        assert_eq!(store.latest().await.unwrap().unwrap().id, 5);
        assert_eq!(EpochUnbondingStore::list(&store).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_epoch_ids_beyond_integer_range_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        EpochUnbondingStore::put(&store, &EpochUnbondingRecord::new(1))
            .await
            .unwrap();

        let huge = EpochUnbondingRecord::new(1 << 63);
        assert!(matches!(
            EpochUnbondingStore::put(&store, &huge).await,
            Err(StorageError::InvalidData(_))
        ));
        assert!(matches!(
            EpochUnbondingStore::get(&store, u64::MAX).await,
            Err(StorageError::InvalidData(_))
        ));

        assert_eq!(store.latest().await.unwrap().unwrap().id, 1);
        assert_eq!(EpochUnbondingStore::list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            HostZoneStore::insert(&store, &create_test_zone("osmosis-1"))
                .await
                .unwrap();
            EpochUnbondingStore::put(&store, &EpochUnbondingRecord::new(1))
                .await
                .unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        assert!(HostZoneStore::get(&reopened, "osmosis-1")
            .await
            .unwrap()
            .is_some());
        assert_eq!(reopened.latest().await.unwrap().unwrap().id, 1);
    }
}
