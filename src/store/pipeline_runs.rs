//! Pipeline-run rows (§4.6 `insert_pipeline_run`, §3 "Pipeline run") —
//! aggregate counters plus the error-kind histogram, stored as a
//! structured JSON blob alongside three legacy rollup columns.

use rusqlite::params;

use crate::domain::RunStats;
use crate::error::StoreError;
use crate::store::Store;

impl Store {
    pub fn insert_pipeline_run(&self, stats: &RunStats) -> Result<i64, StoreError> {
        let histogram_json =
            serde_json::to_string(&stats.errors).unwrap_or_else(|_| "{}".to_string());
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO pipeline_runs (
                    city, started_at, finished_at, duration_seconds,
                    complexes_total, complexes_successful, complexes_failed, listings_scraped,
                    cancelled, error_histogram, http_error_total, request_error_total, rate_limited_total
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
                params![
                    stats.city,
                    stats.started_at.map(|t| t.to_rfc3339()),
                    stats.finished_at.map(|t| t.to_rfc3339()),
                    stats.duration_seconds(),
                    stats.complexes_total,
                    stats.complexes_successful,
                    stats.complexes_failed,
                    stats.listings_scraped,
                    stats.cancelled as i64,
                    histogram_json,
                    stats.errors.http_error_total(),
                    stats.errors.request_error_total(),
                    stats.errors.rate_limited_total(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn insert_pipeline_run_persists_histogram_rollups() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let mut stats = RunStats {
            city: "almaty".to_string(),
            started_at: Some(Utc::now()),
            finished_at: Some(Utc::now()),
            complexes_total: 10,
            complexes_successful: 9,
            complexes_failed: 1,
            listings_scraped: 120,
            errors: Default::default(),
            cancelled: false,
        };
        stats.errors.bump("http_429");
        stats.errors.bump("http_429");
        stats.errors.bump("timeout");

        let row_id = store.insert_pipeline_run(&stats).unwrap();
        assert!(row_id > 0);

        let http_errors: i64 = store
            .with_read(|conn| {
                conn.query_row(
                    "SELECT http_error_total FROM pipeline_runs WHERE id = ?1",
                    params![row_id],
                    |row| row.get(0),
                )
            })
            .unwrap();
        assert_eq!(http_errors, 2);
    }
}
