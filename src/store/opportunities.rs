//! Opportunity-analysis runs and ignored opportunities (§4.6, §3).

use rusqlite::params;

use crate::domain::OpportunityRow;
use crate::error::StoreError;
use crate::store::Store;

impl Store {
    /// §4.6 `insert_opportunity_batch`: all rows share one `run_timestamp`;
    /// rows are immutable once written (§3 "Lifecycles").
    pub fn insert_opportunity_batch(
        &self,
        rows: &[OpportunityRow],
        run_timestamp: &str,
    ) -> Result<(), StoreError> {
        self.with_write_tx(|tx| {
            for row in rows {
                tx.execute(
                    "INSERT INTO opportunity_analysis (
                        run_timestamp, rank, flat_id, residential_complex, price, area, flat_type,
                        floor, total_floors, construction_year, parking,
                        discount_percentage_vs_median, median_price, mean_price, min_price, max_price,
                        sample_size, query_date, url, description
                    ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)",
                    params![
                        run_timestamp,
                        row.rank,
                        row.flat_id,
                        row.residential_complex,
                        row.price,
                        row.area,
                        row.flat_type,
                        row.floor,
                        row.total_floors,
                        row.construction_year,
                        row.parking,
                        row.discount_percentage_vs_median,
                        row.median_price,
                        row.mean_price,
                        row.min_price,
                        row.max_price,
                        row.sample_size,
                        row.query_date.to_string(),
                        row.url,
                        row.description,
                    ],
                )?;
            }
            Ok(())
        })
    }

    pub fn opportunities_for_run(&self, run_timestamp: &str) -> Result<Vec<OpportunityRow>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT rank, flat_id, residential_complex, price, area, flat_type, floor,
                        total_floors, construction_year, parking, discount_percentage_vs_median,
                        median_price, mean_price, min_price, max_price, sample_size, query_date,
                        url, description
                 FROM opportunity_analysis WHERE run_timestamp = ?1 ORDER BY rank",
            )?;
            let rows = stmt.query_map(params![run_timestamp], |row| {
                let query_date_raw: String = row.get(16)?;
                Ok(OpportunityRow {
                    rank: row.get(0)?,
                    flat_id: row.get(1)?,
                    residential_complex: row.get(2)?,
                    price: row.get(3)?,
                    area: row.get(4)?,
                    flat_type: row.get(5)?,
                    floor: row.get(6)?,
                    total_floors: row.get(7)?,
                    construction_year: row.get(8)?,
                    parking: row.get(9)?,
                    discount_percentage_vs_median: row.get(10)?,
                    median_price: row.get(11)?,
                    mean_price: row.get(12)?,
                    min_price: row.get(13)?,
                    max_price: row.get(14)?,
                    sample_size: row.get(15)?,
                    query_date: query_date_raw.parse().unwrap_or_default(),
                    url: row.get(17)?,
                    description: row.get(18)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn ignore_opportunity(&self, flat_id: &str) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO ignored_opportunities (flat_id) VALUES (?1)
                 ON CONFLICT(flat_id) DO NOTHING",
                params![flat_id],
            )?;
            Ok(())
        })
    }

    pub fn is_opportunity_ignored(&self, flat_id: &str) -> Result<bool, StoreError> {
        self.with_read(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM ignored_opportunities WHERE flat_id = ?1",
                params![flat_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn row(rank: u32, flat_id: &str) -> OpportunityRow {
        OpportunityRow {
            rank,
            flat_id: flat_id.to_string(),
            residential_complex: Some("Meridian".to_string()),
            price: 17_000_000,
            area: 52.0,
            flat_type: "2BR".to_string(),
            floor: Some(3),
            total_floors: Some(9),
            construction_year: Some(2020),
            parking: None,
            discount_percentage_vs_median: 20.0,
            median_price: 21_250_000.0,
            mean_price: 20_000_000.0,
            min_price: 14_000_000.0,
            max_price: 30_000_000.0,
            sample_size: 8,
            query_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            url: format!("https://krisha.kz/a/show/{flat_id}"),
            description: String::new(),
        }
    }

    #[test]
    fn batch_insert_and_read_back_in_rank_order() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let rows = vec![row(2, "b"), row(1, "a")];
        store.insert_opportunity_batch(&rows, "2026-01-01 00:00:00").unwrap();

        let back = store.opportunities_for_run("2026-01-01 00:00:00").unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].rank, 1);
        assert_eq!(back[1].rank, 2);
    }

    #[test]
    fn ignored_opportunities_are_idempotent() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        store.ignore_opportunity("1").unwrap();
        store.ignore_opportunity("1").unwrap();
        assert!(store.is_opportunity_ignored("1").unwrap());
        assert!(!store.is_opportunity_ignored("2").unwrap());
    }
}
