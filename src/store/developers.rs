//! Developer categorisation (SPEC_FULL §3.1, ADDED — grounded in
//! `real_estate_developers` from `original_source`).

use rusqlite::{params, OptionalExtension};

use crate::domain::{Developer, DeveloperCategory};
use crate::error::StoreError;
use crate::store::Store;

impl Store {
    pub fn upsert_developer(&self, developer: &Developer) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO real_estate_developers (name, category) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET category = excluded.category",
                params![developer.name, developer.category.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn get_developer(&self, name: &str) -> Result<Option<Developer>, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                "SELECT name, category FROM real_estate_developers WHERE name = ?1",
                params![name],
                |row| {
                    let category_raw: String = row.get(1)?;
                    Ok(Developer {
                        name: row.get(0)?,
                        category: DeveloperCategory::from_str_opt(&category_raw)
                            .unwrap_or(DeveloperCategory::Indifferent),
                    })
                },
            )
            .optional()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn upsert_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        store
            .upsert_developer(&Developer {
                name: "BI Group".to_string(),
                category: DeveloperCategory::Good,
            })
            .unwrap();
        let found = store.get_developer("BI Group").unwrap().unwrap();
        assert_eq!(found.category, DeveloperCategory::Good);
    }

    #[test]
    fn unknown_developer_is_none() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        assert!(store.get_developer("nobody").unwrap().is_none());
    }
}
