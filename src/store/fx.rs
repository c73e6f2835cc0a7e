//! FX rates (§3 "FX rate"). Latest-per-currency is queried by max
//! `fetched_at` (§6 index on `(currency, fetched_at)`).

use rusqlite::{params, OptionalExtension};

use crate::domain::FxRate;
use crate::error::StoreError;
use crate::store::Store;

impl Store {
    pub fn insert_fx_rate(&self, rate: &FxRate) -> Result<(), StoreError> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO mid_prices (currency, rate, fetched_at) VALUES (?1, ?2, ?3)",
                params![rate.currency, rate.rate, rate.fetched_at.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    pub fn latest_fx_rate(&self, currency: &str) -> Result<Option<FxRate>, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                "SELECT currency, rate, fetched_at FROM mid_prices
                 WHERE currency = ?1 ORDER BY fetched_at DESC LIMIT 1",
                params![currency],
                |row| {
                    let fetched_at_raw: String = row.get(2)?;
                    Ok(FxRate {
                        currency: row.get(0)?,
                        rate: row.get(1)?,
                        fetched_at: fetched_at_raw.parse().unwrap_or_else(|_| chrono::Utc::now()),
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
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    #[test]
    fn latest_fx_rate_picks_most_recent_fetch() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let now = Utc::now();
        store
            .insert_fx_rate(&FxRate {
                currency: "USD".to_string(),
                rate: 445.0,
                fetched_at: now - Duration::hours(1),
            })
            .unwrap();
        store
            .insert_fx_rate(&FxRate {
                currency: "USD".to_string(),
                rate: 450.0,
                fetched_at: now,
            })
            .unwrap();

        let latest = store.latest_fx_rate("USD").unwrap().unwrap();
        assert_eq!(latest.rate, 450.0);
    }

    #[test]
    fn unknown_currency_is_none() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        assert!(store.latest_fx_rate("EUR").unwrap().is_none());
    }
}
