//! Favorites (§3 "Favorite") — join back to the latest snapshot at read
//! time rather than duplicating flat data.

use rusqlite::params;

use crate::domain::{Favorite, FavoriteKind};
use crate::error::StoreError;
use crate::store::Store;

impl Store {
    pub fn add_favorite(
        &self,
        flat_id: &str,
        kind: FavoriteKind,
        notes: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO favorites (flat_id, flat_type, notes, added_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(flat_id, flat_type) DO UPDATE SET notes = excluded.notes",
                params![flat_id, kind.as_str(), notes, now],
            )?;
            Ok(())
        })
    }

    pub fn remove_favorite(&self, flat_id: &str, kind: FavoriteKind) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                "DELETE FROM favorites WHERE flat_id = ?1 AND flat_type = ?2",
                params![flat_id, kind.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn list_favorites(&self) -> Result<Vec<Favorite>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn
                .prepare("SELECT flat_id, flat_type, notes, added_at FROM favorites ORDER BY added_at DESC")?;
            let rows = stmt.query_map([], |row| {
                let kind_raw: String = row.get(1)?;
                let added_at_raw: String = row.get(3)?;
                Ok(Favorite {
                    flat_id: row.get(0)?,
                    flat_type: FavoriteKind::from_str_opt(&kind_raw).unwrap_or(FavoriteKind::Sale),
                    notes: row.get(2)?,
                    added_at: added_at_raw.parse().unwrap_or_else(|_| chrono::Utc::now()),
                })
            })?;
            rows.collect()
        })
    }
}
