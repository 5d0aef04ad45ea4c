use crate::error::SyncError;
use crate::models::{Account, Dataset, Deal, RecordKind, Representative};
use crate::sample;
use crate::store::{Collection, RecordStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use duckdb::{Connection, params};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key   VARCHAR   NOT NULL,
    kind        VARCHAR   NOT NULL,
    -- JSON array of records
    payload     VARCHAR   NOT NULL,
    row_count   BIGINT    NOT NULL DEFAULT 0,
    saved_at    TIMESTAMP NOT NULL,
    PRIMARY KEY (cache_key, kind)
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

/// Row of the `stats` listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryInfo {
    pub kind: String,
    pub rows: i64,
    pub saved_at: NaiveDateTime,
}

// ── Local cache ───────────────────────────────────────────────────────────────

/// DuckDB-backed record store used when no remote store is configured.
/// Everything lives under one versioned cache key; entries under any other
/// key are dropped on open.
pub struct LocalStore {
    conn: Mutex<Connection>,
    cache_key: String,
    reference_date: NaiveDate,
}

impl LocalStore {
    pub fn open(path: &Path, cache_key: &str) -> Result<Self> {
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create dir {:?}", parent))?;
            }
            Connection::open(path).with_context(|| format!("Failed to open DuckDB at {:?}", path))?
        };
        Self::init(conn, cache_key)
    }

    pub fn open_in_memory(cache_key: &str) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, cache_key)
    }

    fn init(conn: Connection, cache_key: &str) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            cache_key: cache_key.to_string(),
            reference_date: Local::now().date_naive(),
        };
        store.run_migrations()?;
        store.purge_stale_keys()?;
        Ok(store)
    }

    /// Date the sample dataset is anchored on when the cache has to be seeded.
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = today;
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("local cache connection poisoned"))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(DDL).context("DDL failed")?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        Ok(())
    }

    /// Drop everything cached under an older (or newer) key.
    fn purge_stale_keys(&self) -> Result<usize> {
        let removed = self
            .conn()?
            .execute("DELETE FROM cache_entries WHERE cache_key <> ?", params![self.cache_key])
            .context("purge stale cache keys")?;
        if removed > 0 {
            info!("Discarded {} cached collections from other cache versions", removed);
        }
        Ok(removed)
    }

    fn read_payload(&self, kind: RecordKind) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT payload FROM cache_entries WHERE cache_key = ? AND kind = ?")?;
        let payload = stmt
            .query_map(params![self.cache_key, kind.wire_name()], |r| r.get::<_, String>(0))?
            .next()
            .transpose()?;
        Ok(payload)
    }

    fn write_payload<T: Serialize>(&self, kind: RecordKind, rows: &[T]) -> Result<()> {
        let payload = serde_json::to_string(rows).with_context(|| format!("encode {}", kind))?;
        self.conn()?
            .execute(
                r#"INSERT INTO cache_entries (cache_key, kind, payload, row_count, saved_at)
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT (cache_key, kind) DO UPDATE SET
                       payload   = excluded.payload,
                       row_count = excluded.row_count,
                       saved_at  = excluded.saved_at"#,
                params![
                    self.cache_key,
                    kind.wire_name(),
                    payload,
                    rows.len() as i64,
                    Utc::now().naive_utc(),
                ],
            )
            .with_context(|| format!("write cached {}", kind))?;
        Ok(())
    }

    fn write_collection(&self, records: Collection<'_>) -> Result<()> {
        match records {
            Collection::Accounts(rows) => self.write_payload(RecordKind::Accounts, rows),
            Collection::Deals(rows) => self.write_payload(RecordKind::Deals, rows),
            Collection::Representatives(rows) => self.write_payload(RecordKind::Representatives, rows),
        }
    }

    fn seed(&self, data: &Dataset, kinds: &[RecordKind]) -> Result<()> {
        for &kind in kinds {
            self.write_collection(Collection::of(data, kind))?;
        }
        Ok(())
    }

    /// Load the cached dataset. A collection with no entry is filled from the
    /// sample dataset; an entry that no longer decodes discards the whole
    /// cache in favour of the sample. Either way the result is written back.
    pub fn load(&self) -> Result<Dataset> {
        let mut data = Dataset::default();
        let mut missing = Vec::new();

        for kind in RecordKind::ALL {
            let Some(payload) = self.read_payload(kind)? else {
                missing.push(kind);
                continue;
            };
            let decoded = match kind {
                RecordKind::Accounts => serde_json::from_str::<Vec<Account>>(&payload)
                    .map(|v| data.accounts = v),
                RecordKind::Deals => {
                    serde_json::from_str::<Vec<Deal>>(&payload).map(|v| data.deals = v)
                }
                RecordKind::Representatives => serde_json::from_str::<Vec<Representative>>(&payload)
                    .map(|v| data.representatives = v),
            };
            if let Err(e) = decoded {
                warn!("Corrupt cached {} ({}), reseeding from the sample dataset", kind, e);
                let sample = sample::dataset(self.reference_date);
                self.seed(&sample, &RecordKind::ALL)?;
                return Ok(sample);
            }
        }

        if !missing.is_empty() {
            info!(
                "Initializing cache key {} with sample {:?}",
                self.cache_key,
                missing.iter().map(|k| k.to_string()).collect::<Vec<_>>()
            );
            let sample = sample::dataset(self.reference_date);
            self.seed(&sample, &missing)?;
            for kind in missing {
                match kind {
                    RecordKind::Accounts => data.accounts = sample.accounts.clone(),
                    RecordKind::Deals => data.deals = sample.deals.clone(),
                    RecordKind::Representatives => {
                        data.representatives = sample.representatives.clone()
                    }
                }
            }
        }
        Ok(data)
    }

    /// Remove every entry under the current key.
    pub fn clear(&self) -> Result<usize> {
        let removed = self
            .conn()?
            .execute("DELETE FROM cache_entries WHERE cache_key = ?", params![self.cache_key])?;
        Ok(removed)
    }

    pub fn entries(&self) -> Result<Vec<CacheEntryInfo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT kind, row_count, saved_at FROM cache_entries WHERE cache_key = ? ORDER BY kind",
        )?;
        let rows = stmt
            .query_map(params![self.cache_key], |r| {
                Ok(CacheEntryInfo {
                    kind: r.get(0)?,
                    rows: r.get(1)?,
                    saved_at: r.get(2)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    /// `load` already seeds missing entries, so an empty collection here
    /// was emptied on purpose.
    fn seeds_when_empty(&self) -> bool {
        false
    }

    async fn fetch_all(&self) -> Result<Dataset, SyncError> {
        self.load().map_err(SyncError::Storage)
    }

    async fn replace_collection(&self, records: Collection<'_>) -> Result<(), SyncError> {
        self.write_collection(records).map_err(SyncError::Storage)
    }

    async fn reset(&self) -> Result<(), SyncError> {
        let removed = self.clear().map_err(SyncError::Storage)?;
        info!("Cleared {} cached collections under {}", removed, self.cache_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn store(key: &str) -> LocalStore {
        LocalStore::open_in_memory(key).unwrap().with_reference_date(today())
    }

    #[test]
    fn test_first_load_seeds_and_persists_sample() {
        let store = store("pipeline_data_v11");
        assert!(store.entries().unwrap().is_empty());

        let data = store.load().unwrap();
        assert_eq!(data, sample::dataset(today()));

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 3);
        let deals = entries.iter().find(|e| e.kind == "deals").unwrap();
        assert_eq!(deals.rows as usize, data.deals.len());
    }

    #[test]
    fn test_saved_collections_round_trip() {
        let store = store("k1");
        store.load().unwrap();
        let reps = vec![Representative {
            id: "s9".into(),
            name: "New Rep".into(),
            email: "new@example.com".into(),
            ..Default::default()
        }];
        store.write_collection(Collection::Representatives(&reps)).unwrap();
        store.write_collection(Collection::Deals(&[])).unwrap();

        let data = store.load().unwrap();
        assert_eq!(data.representatives, reps);
        // An empty collection is a stored value, not a missing one.
        assert!(data.deals.is_empty());
        assert!(!data.accounts.is_empty());
    }

    #[test]
    fn test_emptied_collections_are_not_reseeded() {
        let store = store("v1");
        assert!(!store.seeds_when_empty());
        store.write_collection(Collection::Accounts(&[])).unwrap();
        store.write_collection(Collection::Deals(&[])).unwrap();

        for _ in 0..2 {
            let data = store.load().unwrap();
            assert!(data.accounts.is_empty());
            assert!(data.deals.is_empty());
        }
    }

    #[test]
    fn test_corrupt_entry_reseeds_everything() {
        let store = store("k1");
        store.load().unwrap();
        store.write_collection(Collection::Deals(&[])).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE cache_entries SET payload = 'not json' WHERE kind = 'contacts'",
                [],
            )
            .unwrap();

        let data = store.load().unwrap();
        assert_eq!(data, sample::dataset(today()));
    }

    #[test]
    fn test_version_bump_discards_old_key() {
        let conn = Connection::open_in_memory().unwrap();
        let old = LocalStore::init(conn, "pipeline_data_v10").unwrap();
        old.write_collection(Collection::Representatives(&[])).unwrap();
        let conn = old.conn.into_inner().unwrap();

        let new = LocalStore::init(conn, "pipeline_data_v11").unwrap();
        let count: i64 = new
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_clear_forgets_current_key() {
        let store = store("k1");
        store.load().unwrap();
        assert_eq!(store.clear().unwrap(), 3);
        assert!(store.entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_store_interface() {
        let store = store("k1");
        let data = store.fetch_all().await.unwrap();
        store
            .replace_collection(Collection::Accounts(&data.accounts[..1]))
            .await
            .unwrap();
        assert_eq!(store.fetch_all().await.unwrap().accounts.len(), 1);
        store.reset().await.unwrap();
        assert!(store.entries().unwrap().is_empty());
    }
}
