//! Cross-Snapshot Analytics (§4.11): diffs between successive sales
//! snapshots — price movers, turnover, rental-yield rankings, and
//! price-per-m² rankings.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::analytics::stats::stats;
use crate::domain::Snapshot;
use crate::error::StoreError;
use crate::store::Store;

/// §9 Open Questions: the mover cap is fixed at 5,000,000 for this
/// computation only.
const MOVER_PPM2_CAP: f64 = 5_000_000.0;

#[derive(Debug, Clone)]
pub struct Mover {
    pub complex: String,
    pub old_avg_ppm2: f64,
    pub new_avg_ppm2: f64,
    pub pct_change: f64,
}

fn group_by_complex(rows: &[Snapshot]) -> HashMap<String, Vec<&Snapshot>> {
    let mut groups: HashMap<String, Vec<&Snapshot>> = HashMap::new();
    for row in rows {
        if let Some(name) = &row.residential_complex {
            groups.entry(name.clone()).or_default().push(row);
        }
    }
    groups
}

fn avg_ppm2_capped(rows: &[&Snapshot]) -> Option<f64> {
    let values: Vec<f64> = rows
        .iter()
        .map(|r| r.price_per_area())
        .filter(|ppm2| *ppm2 < MOVER_PPM2_CAP)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// §4.11 price movers: risers and fallers, each sorted by magnitude,
/// capped at `top_n`. Requires ≥3 rows per complex in each of the two
/// most recent distinct sales `query_date`s.
pub fn price_movers(
    store: &Store,
    city: &str,
    top_n: usize,
) -> Result<(Vec<Mover>, Vec<Mover>), StoreError> {
    let dates = store.distinct_sales_dates(city)?;
    if dates.len() < 2 {
        return Ok((Vec::new(), Vec::new()));
    }
    let (d_new, d_old) = (dates[0], dates[1]);

    let old_rows = store.sales_on_date(city, d_old)?;
    let new_rows = store.sales_on_date(city, d_new)?;
    let old_groups = group_by_complex(&old_rows);
    let new_groups = group_by_complex(&new_rows);

    let mut movers = Vec::new();
    for (complex, old_rows) in &old_groups {
        let Some(new_rows) = new_groups.get(complex) else {
            continue;
        };
        if old_rows.len() < 3 || new_rows.len() < 3 {
            continue;
        }
        let (Some(old_avg), Some(new_avg)) =
            (avg_ppm2_capped(old_rows), avg_ppm2_capped(new_rows))
        else {
            continue;
        };
        if old_avg <= 0.0 {
            continue;
        }
        let pct_change = (new_avg - old_avg) / old_avg * 100.0;
        movers.push(Mover {
            complex: complex.clone(),
            old_avg_ppm2: old_avg,
            new_avg_ppm2: new_avg,
            pct_change,
        });
    }

    let mut risers = movers.clone();
    risers.sort_by(|a, b| b.pct_change.partial_cmp(&a.pct_change).unwrap());
    risers.truncate(top_n);

    let mut fallers = movers;
    fallers.sort_by(|a, b| a.pct_change.partial_cmp(&b.pct_change).unwrap());
    fallers.truncate(top_n);

    Ok((risers, fallers))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Turnover {
    pub removed: usize,
    pub new: usize,
    pub stable: usize,
    pub turnover_pct: f64,
}

fn turnover_between(old_ids: &HashSet<String>, new_ids: &HashSet<String>) -> Turnover {
    let removed = old_ids.difference(new_ids).count();
    let new = new_ids.difference(old_ids).count();
    let total_old = old_ids.len();
    let stable = total_old.saturating_sub(removed);
    let turnover_pct = if total_old == 0 {
        0.0
    } else {
        removed as f64 / total_old as f64 * 100.0
    };
    Turnover {
        removed,
        new,
        stable,
        turnover_pct,
    }
}

/// §4.11 market turnover, city-wide, over the two most recent distinct
/// sales `query_date`s. `None` when fewer than two dates exist.
pub fn market_turnover(store: &Store, city: &str) -> Result<Option<Turnover>, StoreError> {
    let dates = store.distinct_sales_dates(city)?;
    if dates.len() < 2 {
        return Ok(None);
    }
    let (d_new, d_old) = (dates[0], dates[1]);
    let old_ids: HashSet<String> = store
        .sales_on_date(city, d_old)?
        .into_iter()
        .map(|s| s.flat_id)
        .collect();
    let new_ids: HashSet<String> = store
        .sales_on_date(city, d_new)?
        .into_iter()
        .map(|s| s.flat_id)
        .collect();
    Ok(Some(turnover_between(&old_ids, &new_ids)))
}

/// §4.11 per-complex turnover over a `days`-wide window: the comparison
/// date is the complex's own scrape date closest to `D_new - days`.
pub fn complex_turnover(
    store: &Store,
    complex: &str,
    days: i64,
) -> Result<Option<Turnover>, StoreError> {
    let dates = store.distinct_sales_dates_for_complex(complex)?;
    let Some(&d_new) = dates.first() else {
        return Ok(None);
    };
    let target = d_new - chrono::Duration::days(days);
    let d_old = dates
        .iter()
        .filter(|d| **d != d_new)
        .min_by_key(|d| (**d - target).num_days().abs())
        .copied();
    let Some(d_old) = d_old else {
        return Ok(None);
    };

    let old_ids: HashSet<String> = store
        .sales_for_complex_in_range(complex, d_old, d_old)?
        .into_iter()
        .map(|s| s.flat_id)
        .collect();
    let new_ids: HashSet<String> = store
        .sales_for_complex_in_range(complex, d_new, d_new)?
        .into_iter()
        .map(|s| s.flat_id)
        .collect();
    Ok(Some(turnover_between(&old_ids, &new_ids)))
}

#[derive(Debug, Clone)]
pub struct YieldRanking {
    pub complex: String,
    pub yield_pct: f64,
}

/// §4.11 rental-yield rankings: complexes with ≥3 sales on the latest
/// sales `query_date` and ≥3 (latest) rentals, sorted descending.
pub fn rental_yield_rankings(store: &Store, city: &str) -> Result<Vec<YieldRanking>, StoreError> {
    let complexes = store.list_for_city(city)?;
    let mut rankings = Vec::new();

    for complex in &complexes {
        let dates = store.distinct_sales_dates_for_complex(&complex.name)?;
        let Some(&latest) = dates.first() else {
            continue;
        };
        let sales = store.sales_for_complex_in_range(&complex.name, latest, latest)?;
        if sales.len() < 3 {
            continue;
        }
        let rentals = store.latest_rentals_for_complex(&complex.name)?;
        if rentals.len() < 3 {
            continue;
        }
        let mean_sale: f64 =
            sales.iter().map(|s| s.price as f64).sum::<f64>() / sales.len() as f64;
        let mean_rent: f64 =
            rentals.iter().map(|r| r.price as f64).sum::<f64>() / rentals.len() as f64;
        if mean_sale <= 0.0 {
            continue;
        }
        rankings.push(YieldRanking {
            complex: complex.name.clone(),
            yield_pct: mean_rent * 12.0 / mean_sale * 100.0,
        });
    }

    rankings.sort_by(|a, b| b.yield_pct.partial_cmp(&a.yield_pct).unwrap());
    Ok(rankings)
}

#[derive(Debug, Clone)]
pub struct PricePerM2Ranking {
    pub complex: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// §4.11 price-per-m² rankings: complexes with ≥5 sales on the latest
/// city-wide sales `query_date`.
pub fn price_per_m2_rankings(
    store: &Store,
    city: &str,
) -> Result<Vec<PricePerM2Ranking>, StoreError> {
    let dates = store.distinct_sales_dates(city)?;
    let Some(&latest) = dates.first() else {
        return Ok(Vec::new());
    };
    let rows = store.sales_on_date(city, latest)?;
    let groups = group_by_complex(&rows);

    let mut rankings: Vec<PricePerM2Ranking> = groups
        .into_iter()
        .filter(|(_, rows)| rows.len() >= 5)
        .map(|(complex, rows)| {
            let ppm2: Vec<f64> = rows.iter().map(|r| r.price_per_area()).collect();
            let s = stats(&ppm2);
            PricePerM2Ranking {
                complex,
                mean: s.mean,
                min: s.min,
                max: s.max,
            }
        })
        .collect();
    rankings.sort_by(|a, b| a.complex.cmp(&b.complex));
    Ok(rankings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn sale_row(id: &str, price: i64, area: f64, complex: &str, date: NaiveDate) -> Snapshot {
        Snapshot {
            flat_id: id.to_string(),
            price,
            area,
            flat_type: crate::domain::FlatType::TwoBedroom,
            residential_complex: Some(complex.to_string()),
            floor: None,
            total_floors: None,
            construction_year: None,
            parking: None,
            description: String::new(),
            url: format!("https://krisha.kz/a/show/{id}"),
            city: Some("almaty".to_string()),
            query_date: date,
            scraped_at: Utc::now(),
            archived: false,
        }
    }

    /// S5: old {a,b,c,d}, new {c,d,e} -> removed=2, new=1, stable=2,
    /// turnover_pct=50.0.
    #[test]
    fn scenario_five_turnover_arithmetic() {
        let old: HashSet<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let new: HashSet<String> = ["c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let t = turnover_between(&old, &new);
        assert_eq!(t.removed, 2);
        assert_eq!(t.new, 1);
        assert_eq!(t.stable, 2);
        assert_eq!(t.turnover_pct, 50.0);
    }

    #[test]
    fn market_turnover_uses_two_most_recent_dates() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();

        for id in ["a", "b", "c", "d"] {
            store.upsert_sales(&sale_row(id, 10_000_000, 50.0, "Meridian", d1)).unwrap();
        }
        for id in ["c", "d", "e"] {
            store.upsert_sales(&sale_row(id, 10_000_000, 50.0, "Meridian", d2)).unwrap();
        }

        let turnover = market_turnover(&store, "almaty").unwrap().unwrap();
        assert_eq!(turnover.removed, 2);
        assert_eq!(turnover.new, 1);
        assert_eq!(turnover.turnover_pct, 50.0);
    }

    #[test]
    fn movers_exclude_rows_above_the_ppm2_cap() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();

        for (id, price, area) in [("a", 10_000_000, 50.0), ("b", 10_000_000, 50.0), ("c", 1_000_000_000, 1.0)] {
            store.upsert_sales(&sale_row(id, price, area, "Meridian", d1)).unwrap();
        }
        for (id, price, area) in [("a", 12_000_000, 50.0), ("b", 12_000_000, 50.0), ("c", 1_000_000_000, 1.0)] {
            store.upsert_sales(&sale_row(id, price, area, "Meridian", d2)).unwrap();
        }

        let (risers, _) = price_movers(&store, "almaty", 5).unwrap();
        assert_eq!(risers.len(), 1);
        assert!((risers[0].pct_change - 20.0).abs() < 1e-6); // 200k/m² -> 240k/m², excluding the 1e9/m² outlier
    }

    #[test]
    fn complex_turnover_picks_nearest_scrape_date() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let d_new = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let d_near = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(); // 29 days back
        let d_far = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(); // 62 days back

        store.upsert_sales(&sale_row("x", 10_000_000, 50.0, "Meridian", d_far)).unwrap();
        store.upsert_sales(&sale_row("y", 10_000_000, 50.0, "Meridian", d_near)).unwrap();
        store.upsert_sales(&sale_row("y", 10_000_000, 50.0, "Meridian", d_new)).unwrap();
        store.upsert_sales(&sale_row("z", 10_000_000, 50.0, "Meridian", d_new)).unwrap();

        // target = d_new - 30 days = 2026-01-02; d_near (29 days back) is
        // closer than d_far (62 days back), so the comparison is d_near -> d_new:
        // old={y}, new={y,z} -> removed=0, new=1.
        let turnover = complex_turnover(&store, "Meridian", 30).unwrap().unwrap();
        assert_eq!(turnover.removed, 0);
        assert_eq!(turnover.new, 1);
    }
}
