//! Blacklisted complexes and districts (§4.6, §3 "Blacklists").

use rusqlite::params;

use crate::domain::{BlacklistedComplex, BlacklistedDistrict};
use crate::error::StoreError;
use crate::store::Store;

impl Store {
    pub fn blacklist_complex(
        &self,
        complex_id: &str,
        name: &str,
        notes: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO blacklisted_jks (complex_id, name, notes, blacklisted_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(complex_id) DO UPDATE SET name = excluded.name, notes = excluded.notes",
                params![complex_id, name, notes, now],
            )?;
            Ok(())
        })
    }

    pub fn remove_blacklisted_complex(&self, complex_id: &str) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                "DELETE FROM blacklisted_jks WHERE complex_id = ?1",
                params![complex_id],
            )?;
            Ok(())
        })
    }

    pub fn list_blacklisted_complexes(&self) -> Result<Vec<BlacklistedComplex>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT complex_id, name, notes, blacklisted_at FROM blacklisted_jks ORDER BY name",
            )?;
            let rows = stmt.query_map([], |row| {
                let blacklisted_at_raw: String = row.get(3)?;
                Ok(BlacklistedComplex {
                    complex_id: row.get(0)?,
                    name: row.get(1)?,
                    notes: row.get(2)?,
                    blacklisted_at: blacklisted_at_raw
                        .parse()
                        .unwrap_or_else(|_| chrono::Utc::now()),
                })
            })?;
            rows.collect()
        })
    }

    pub fn blacklist_district(&self, city: &str, district: &str) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO blacklisted_districts (city, district) VALUES (?1, ?2)
                 ON CONFLICT(city, district) DO NOTHING",
                params![city, district],
            )?;
            Ok(())
        })
    }

    pub fn remove_blacklisted_district(&self, city: &str, district: &str) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                "DELETE FROM blacklisted_districts WHERE city = ?1 AND district = ?2",
                params![city, district],
            )?;
            Ok(())
        })
    }

    pub fn list_blacklisted_districts(&self, city: &str) -> Result<Vec<BlacklistedDistrict>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT city, district FROM blacklisted_districts WHERE city = ?1 ORDER BY district",
            )?;
            let rows = stmt.query_map(params![city], |row| {
                Ok(BlacklistedDistrict {
                    city: row.get(0)?,
                    district: row.get(1)?,
                })
            })?;
            rows.collect()
        })
    }

    /// §4.4 "list_excluding_blacklists" support: complex names currently
    /// blacklisted, lower-cased for case-insensitive comparison by the
    /// Directory.
    pub fn blacklisted_complex_names(&self) -> Result<Vec<String>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM blacklisted_jks")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
    }

    pub fn blacklisted_district_pairs(&self) -> Result<Vec<(String, String)>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare("SELECT city, district FROM blacklisted_districts")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn blacklist_and_remove_complex() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        store.blacklist_complex("1", "Meridian", Some("overpriced")).unwrap();
        assert_eq!(store.list_blacklisted_complexes().unwrap().len(), 1);
        store.remove_blacklisted_complex("1").unwrap();
        assert!(store.list_blacklisted_complexes().unwrap().is_empty());
    }

    #[test]
    fn district_blacklist_is_unique_per_pair() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        store.blacklist_district("almaty", "Turksib").unwrap();
        store.blacklist_district("almaty", "Turksib").unwrap();
        assert_eq!(store.list_blacklisted_districts("almaty").unwrap().len(), 1);
    }
}
