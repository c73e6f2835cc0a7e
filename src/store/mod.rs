//! Store (§4.6): transactional persistence behind one `rusqlite`
//! connection for writes plus a small bounded pool of read connections
//! (§5 "Shared-resource policy" — a single write connection serialized by
//! a mutex, reads run against independent connections).
//!
//! Grounded in `mev-data::store::Store` (WAL mode, one embedded schema
//! string, `execute_batch`) and `davidhmays-scraper_simple::db::connection`
//! (a thin `Database` handle wrapping a path, not a process-wide
//! singleton — §9 "Store handle").

mod blacklist;
mod complexes;
mod developers;
mod favorites;
mod fx;
mod opportunities;
mod pipeline_runs;
pub mod schema;
mod snapshots;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::StoreError;

/// Bound on how many idle read connections are kept warm in the pool.
const MAX_POOLED_READERS: usize = 4;

pub struct Store {
    path: PathBuf,
    writer: Mutex<Connection>,
    read_pool: Mutex<Vec<Connection>>,
}

impl Store {
    /// Opens (creating if absent) the database at `path` and applies the
    /// schema. Safe to call repeatedly — every statement is
    /// `CREATE ... IF NOT EXISTS`.
    pub fn open(path: &Path) -> Result<Store, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Store {
            path: path.to_path_buf(),
            writer: Mutex::new(conn),
            read_pool: Mutex::new(Vec::new()),
        })
    }

    /// `create-db` CLI entry point support: open with `--force` semantics
    /// by removing any existing file first.
    pub fn create_fresh(path: &Path) -> Result<Store, StoreError> {
        if path.exists() {
            let _ = std::fs::remove_file(path);
            let _ = std::fs::remove_file(path.with_extension("db-wal"));
            let _ = std::fs::remove_file(path.with_extension("db-shm"));
        }
        Store::open(path)
    }

    fn with_write<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        f(&conn).map_err(StoreError::from)
    }

    fn with_write_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let mut conn = self.writer.lock().expect("writer mutex poisoned");
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    fn with_read<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let pooled = {
            let mut pool = self.read_pool.lock().expect("read pool mutex poisoned");
            pool.pop()
        };
        let conn = match pooled {
            Some(conn) => conn,
            None => Connection::open(&self.path)?,
        };
        let result = f(&conn);
        {
            let mut pool = self.read_pool.lock().expect("read pool mutex poisoned");
            if pool.len() < MAX_POOLED_READERS {
                pool.push(conn);
            }
        }
        result.map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_every_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();
        let tables: Vec<String> = store
            .with_read(|conn| {
                let mut stmt =
                    conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .unwrap();

        for expected in [
            "residential_complexes",
            "rental_flats",
            "sales_flats",
            "favorites",
            "blacklisted_jks",
            "blacklisted_districts",
            "mid_prices",
            "jk_performance_snapshots",
            "opportunity_analysis",
            "ignored_opportunities",
            "pipeline_runs",
            "real_estate_developers",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[test]
    fn create_fresh_wipes_prior_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .with_write(|conn| {
                    conn.execute(
                        "INSERT INTO blacklisted_jks (complex_id, name, notes, blacklisted_at) VALUES ('1','x',NULL,'2024-01-01T00:00:00Z')",
                        [],
                    )
                })
                .unwrap();
        }
        let store = Store::create_fresh(&path).unwrap();
        let count: i64 = store
            .with_read(|conn| conn.query_row("SELECT COUNT(*) FROM blacklisted_jks", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(count, 0);
    }
}
