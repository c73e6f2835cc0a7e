//! Rental/sales snapshot rows (§4.6, §3 "Snapshot"). Both tables share an
//! identical shape and query surface, so the generic helpers below take a
//! table name and the public API picks the table — the pattern the
//! teacher's `ingestion::write` module uses for its NSW sales/rental
//! upsert pair, generalized to avoid duplicating every query twice.

use std::collections::HashSet;

use chrono::NaiveDate;
use rusqlite::{params, types::Value as SqlValue, ToSql};

use crate::domain::{FlatType, Snapshot};
use crate::error::StoreError;
use crate::store::Store;

const RENTAL_TABLE: &str = "rental_flats";
const SALES_TABLE: &str = "sales_flats";

fn row_to_snapshot(row: &rusqlite::Row) -> rusqlite::Result<Snapshot> {
    let flat_type_raw: String = row.get("flat_type")?;
    let query_date_raw: String = row.get("query_date")?;
    let scraped_at_raw: String = row.get("scraped_at")?;
    Ok(Snapshot {
        flat_id: row.get("flat_id")?,
        price: row.get("price")?,
        area: row.get("area")?,
        flat_type: FlatType::from_str_opt(&flat_type_raw).unwrap_or(FlatType::ThreePlusBedroom),
        residential_complex: row.get("residential_complex")?,
        floor: row.get("floor")?,
        total_floors: row.get("total_floors")?,
        construction_year: row.get("construction_year")?,
        parking: row.get("parking")?,
        description: row.get("description")?,
        url: row.get("url")?,
        city: row.get("city")?,
        query_date: query_date_raw.parse::<NaiveDate>().unwrap_or_default(),
        scraped_at: scraped_at_raw
            .parse::<chrono::DateTime<chrono::Utc>>()
            .unwrap_or_else(|_| chrono::Utc::now()),
        archived: row.get::<_, i64>("archived")? != 0,
    })
}

impl Store {
    fn upsert_snapshot(&self, table: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_write(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (
                        flat_id, query_date, price, area, flat_type, residential_complex,
                        floor, total_floors, construction_year, parking, description,
                        url, city, scraped_at, archived, updated_at
                    ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,0,?15)
                    ON CONFLICT(flat_id, query_date) DO UPDATE SET
                        price = excluded.price,
                        area = excluded.area,
                        flat_type = excluded.flat_type,
                        residential_complex = excluded.residential_complex,
                        floor = excluded.floor,
                        total_floors = excluded.total_floors,
                        construction_year = excluded.construction_year,
                        parking = excluded.parking,
                        description = excluded.description,
                        url = excluded.url,
                        city = excluded.city,
                        scraped_at = excluded.scraped_at,
                        updated_at = excluded.updated_at"
                ),
                params![
                    snapshot.flat_id,
                    snapshot.query_date.to_string(),
                    snapshot.price,
                    snapshot.area,
                    snapshot.flat_type.as_str(),
                    snapshot.residential_complex,
                    snapshot.floor,
                    snapshot.total_floors,
                    snapshot.construction_year,
                    snapshot.parking,
                    snapshot.description,
                    snapshot.url,
                    snapshot.city,
                    snapshot.scraped_at.to_rfc3339(),
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn upsert_rental(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.upsert_snapshot(RENTAL_TABLE, snapshot)
    }

    pub fn upsert_sales(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.upsert_snapshot(SALES_TABLE, snapshot)
    }

    fn latest_for_complex(
        &self,
        table: &str,
        name: &str,
        city: Option<&str>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let mut sql = format!(
            "SELECT t.* FROM {table} t
             INNER JOIN (
                SELECT flat_id, MAX(query_date) AS query_date FROM {table}
                WHERE residential_complex = ?1 GROUP BY flat_id
             ) latest ON t.flat_id = latest.flat_id AND t.query_date = latest.query_date
             WHERE t.archived = 0"
        );
        let mut params_vec: Vec<SqlValue> = vec![SqlValue::from(name.to_string())];
        if let Some(city) = city {
            sql.push_str(" AND t.city = ?2");
            params_vec.push(SqlValue::from(city.to_string()));
        }
        self.with_read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let params_refs: Vec<&dyn ToSql> =
                params_vec.iter().map(|v| v as &dyn ToSql).collect();
            let rows = stmt.query_map(params_refs.as_slice(), row_to_snapshot)?;
            rows.collect()
        })
    }

    pub fn latest_rentals_for_complex(&self, name: &str) -> Result<Vec<Snapshot>, StoreError> {
        self.latest_for_complex(RENTAL_TABLE, name, None)
    }

    pub fn latest_sales_for_complex(
        &self,
        name: &str,
        city: Option<&str>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.latest_for_complex(SALES_TABLE, name, city)
    }

    /// §4.6 `similar_sales`: latest non-archived sales with area in the
    /// inclusive range and matching complex (substring) and city.
    pub fn similar_sales(
        &self,
        complex: Option<&str>,
        area_min: f64,
        area_max: f64,
        city: Option<&str>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let mut sql = format!(
            "SELECT t.* FROM {SALES_TABLE} t
             INNER JOIN (
                SELECT flat_id, MAX(query_date) AS query_date FROM {SALES_TABLE} GROUP BY flat_id
             ) latest ON t.flat_id = latest.flat_id AND t.query_date = latest.query_date
             WHERE t.archived = 0 AND t.area BETWEEN ?1 AND ?2"
        );
        let mut params_vec: Vec<SqlValue> = vec![SqlValue::from(area_min), SqlValue::from(area_max)];
        if let Some(complex) = complex {
            sql.push_str(&format!(" AND t.residential_complex LIKE ?{}", params_vec.len() + 1));
            params_vec.push(SqlValue::from(format!("%{complex}%")));
        }
        if let Some(city) = city {
            sql.push_str(&format!(" AND t.city = ?{}", params_vec.len() + 1));
            params_vec.push(SqlValue::from(city.to_string()));
        }
        self.with_read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let params_refs: Vec<&dyn ToSql> =
                params_vec.iter().map(|v| v as &dyn ToSql).collect();
            let rows = stmt.query_map(params_refs.as_slice(), row_to_snapshot)?;
            rows.collect()
        })
    }

    fn in_range(
        &self,
        table: &str,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let sql = format!(
            "SELECT * FROM {table}
             WHERE residential_complex = ?1 AND query_date BETWEEN ?2 AND ?3
             ORDER BY query_date"
        );
        self.with_read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![name, start.to_string(), end.to_string()],
                row_to_snapshot,
            )?;
            rows.collect()
        })
    }

    /// All rental snapshots (any archival state) for `name` with
    /// `query_date` in `[start, end]` (§4.9 historical series).
    pub fn rentals_for_complex_in_range(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.in_range(RENTAL_TABLE, name, start, end)
    }

    /// Same as above, sales table (§4.10 historical series).
    pub fn sales_for_complex_in_range(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.in_range(SALES_TABLE, name, start, end)
    }

    /// Distinct sales `query_date`s observed city-wide, most recent first
    /// (§4.11 "two most recent distinct query_date values").
    pub fn distinct_sales_dates(&self, city: &str) -> Result<Vec<NaiveDate>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT query_date FROM sales_flats WHERE city = ?1
                 ORDER BY query_date DESC",
            )?;
            let rows = stmt.query_map(params![city], |row| row.get::<_, String>(0))?;
            rows.map(|r| r.map(|s| s.parse::<NaiveDate>().unwrap_or_default()))
                .collect()
        })
    }

    /// Distinct sales `query_date`s for one complex, most recent first
    /// (§4.11 "per-complex turnover over window").
    pub fn distinct_sales_dates_for_complex(
        &self,
        name: &str,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT query_date FROM sales_flats WHERE residential_complex = ?1
                 ORDER BY query_date DESC",
            )?;
            let rows = stmt.query_map(params![name], |row| row.get::<_, String>(0))?;
            rows.map(|r| r.map(|s| s.parse::<NaiveDate>().unwrap_or_default()))
                .collect()
        })
    }

    /// Every sales row city-wide dated exactly `date` (§4.11 movers/turnover
    /// /rankings — grouped by complex by the caller).
    pub fn sales_on_date(&self, city: &str, date: NaiveDate) -> Result<Vec<Snapshot>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM sales_flats WHERE city = ?1 AND query_date = ?2",
            )?;
            let rows =
                stmt.query_map(params![city, date.to_string()], row_to_snapshot)?;
            rows.collect()
        })
    }

    fn mark_archived_in(&self, table: &str, flat_id: &str) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                &format!(
                    "UPDATE {table} SET archived = 1
                     WHERE flat_id = ?1 AND query_date = (
                        SELECT MAX(query_date) FROM {table} WHERE flat_id = ?1
                     )"
                ),
                params![flat_id],
            )?;
            Ok(())
        })
    }

    pub fn mark_archived(&self, flat_id: &str, is_rental: bool) -> Result<(), StoreError> {
        let table = if is_rental { RENTAL_TABLE } else { SALES_TABLE };
        self.mark_archived_in(table, flat_id)
    }

    /// §4.5 step 4: archives every known non-archived `flat_id` for a
    /// complex+kind absent from this walk's `seen_ids`.
    pub fn archive_missing(
        &self,
        complex_name: &str,
        is_rental: bool,
        seen_ids: &HashSet<String>,
    ) -> Result<u64, StoreError> {
        let table = if is_rental { RENTAL_TABLE } else { SALES_TABLE };
        let known: Vec<String> = self.with_read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT flat_id FROM {table} WHERE residential_complex = ?1 AND archived = 0"
            ))?;
            let rows = stmt.query_map(params![complex_name], |row| row.get(0))?;
            rows.collect()
        })?;

        let mut archived_count = 0;
        for flat_id in known {
            if !seen_ids.contains(&flat_id) {
                self.mark_archived_in(table, &flat_id)?;
                archived_count += 1;
            }
        }
        Ok(archived_count)
    }
}
