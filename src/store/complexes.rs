//! Residential complex rows (§4.6, §3 "A Complex row is created on first
//! sighting; city/district are updated when a more authoritative value
//! arrives").

use rusqlite::{params, OptionalExtension};

use crate::domain::ResidentialComplex;
use crate::error::StoreError;
use crate::store::Store;

fn row_to_complex(row: &rusqlite::Row) -> rusqlite::Result<ResidentialComplex> {
    Ok(ResidentialComplex {
        complex_id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        district: row.get(3)?,
        developer: row.get(4)?,
    })
}

const SELECT_COLUMNS: &str = "complex_id, name, city, district, developer";

impl Store {
    pub fn upsert_complex(&self, complex: &ResidentialComplex) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO residential_complexes ({SELECT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(complex_id) DO UPDATE SET
                        name = excluded.name,
                        city = excluded.city,
                        district = COALESCE(excluded.district, residential_complexes.district),
                        developer = COALESCE(excluded.developer, residential_complexes.developer)"
                ),
                params![
                    complex.complex_id,
                    complex.name,
                    complex.city,
                    complex.district,
                    complex.developer
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_by_complex_id(&self, complex_id: &str) -> Result<Option<ResidentialComplex>, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM residential_complexes WHERE complex_id = ?1"),
                params![complex_id],
                row_to_complex,
            )
            .optional()
        })
    }

    pub fn list_for_city(&self, city: &str) -> Result<Vec<ResidentialComplex>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM residential_complexes WHERE city = ?1 ORDER BY name"
            ))?;
            let rows = stmt.query_map(params![city], row_to_complex)?;
            rows.collect()
        })
    }

    /// CLI `blacklist add --name` support: case-insensitive exact match
    /// across every city (§4.4 `find_by_name` without a city scope).
    pub fn find_by_name_any_city(&self, name: &str) -> Result<Option<ResidentialComplex>, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM residential_complexes
                     WHERE LOWER(name) = LOWER(?1) LIMIT 1"
                ),
                params![name],
                row_to_complex,
            )
            .optional()
        })
    }
}
