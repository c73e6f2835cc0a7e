//! Rental Analytics (§4.9): per-complex current-market yield stats
//! bucketed by flat type, above-threshold opportunities, and a daily
//! historical yield time series.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::analytics::similarity::similar_sales;
use crate::analytics::stats::{stats, yield_stats, Stats};
use crate::domain::{FlatType, Snapshot};
use crate::error::StoreError;
use crate::store::Store;

/// A rental listing whose yield clears `min_yield`, carrying the bucket
/// statistics used to rank it so the verdict survives the market moving
/// on (§3 "Opportunity-analysis run", §4.9).
#[derive(Debug, Clone)]
pub struct RentalOpportunity {
    pub flat_id: String,
    pub url: String,
    pub flat_type: FlatType,
    pub price: i64,
    pub area: f64,
    pub yield_value: f64,
    pub bucket: Stats,
}

#[derive(Debug, Clone)]
pub struct CurrentRentalMarket {
    pub complex: String,
    pub global_stats: Stats,
    pub flat_type_buckets: BTreeMap<String, Stats>,
    pub opportunities: Vec<RentalOpportunity>,
}

#[derive(Debug, Clone)]
pub struct HistoricalRentalPoint {
    pub date: NaiveDate,
    pub flat_type: FlatType,
    pub yield_stats: Stats,
}

#[derive(Debug, Clone, Default)]
pub struct HistoricalRentalSeries(pub Vec<HistoricalRentalPoint>);

/// One rental paired with the yield computed against its comparable
/// sales at calculation time.
struct RentalYield<'a> {
    rental: &'a Snapshot,
    yield_value: f64,
}

fn compute_yields<'a>(rentals: &'a [Snapshot], sales: &[Snapshot]) -> Vec<RentalYield<'a>> {
    let mut out = Vec::new();
    for rental in rentals {
        let similars = similar_sales(rental, sales);
        if similars.is_empty() {
            continue;
        }
        let sale_prices: Vec<f64> = similars.iter().map(|s| s.price as f64).collect();
        let median_sale = crate::analytics::stats::median(&sale_prices);
        if median_sale <= 0.0 {
            continue;
        }
        let yield_value = (rental.price as f64 * 12.0) / median_sale;
        out.push(RentalYield { rental, yield_value });
    }
    out
}

/// `analyze(complex, min_yield)` (§4.9).
pub fn analyze(
    store: &Store,
    complex: &str,
    min_yield: f64,
) -> Result<(CurrentRentalMarket, HistoricalRentalSeries), StoreError> {
    let rentals = store.latest_rentals_for_complex(complex)?;
    let sales = store.latest_sales_for_complex(complex, None)?;

    let yields = compute_yields(&rentals, &sales);
    let global_stats = yield_stats(&yields.iter().map(|y| y.yield_value).collect::<Vec<_>>());

    let mut flat_type_buckets: BTreeMap<String, Stats> = BTreeMap::new();
    for ft in FlatType::ALL {
        let bucket_yields: Vec<f64> = yields
            .iter()
            .filter(|y| y.rental.flat_type == ft)
            .map(|y| y.yield_value)
            .collect();
        if !bucket_yields.is_empty() {
            flat_type_buckets.insert(ft.as_str().to_string(), yield_stats(&bucket_yields));
        }
    }

    let mut opportunities: Vec<RentalOpportunity> = yields
        .iter()
        .filter(|y| y.yield_value >= min_yield)
        .filter_map(|y| {
            let bucket = flat_type_buckets.get(y.rental.flat_type.as_str())?;
            Some(RentalOpportunity {
                flat_id: y.rental.flat_id.clone(),
                url: y.rental.url.clone(),
                flat_type: y.rental.flat_type,
                price: y.rental.price,
                area: y.rental.area,
                yield_value: y.yield_value,
                bucket: *bucket,
            })
        })
        .collect();
    // §4.9: "sorted by yield descending per type" — a stable sort keyed on
    // (flat_type, -yield) groups each type together in flat_type order
    // while ranking descending within each group.
    opportunities.sort_by(|a, b| {
        a.flat_type
            .as_str()
            .cmp(b.flat_type.as_str())
            .then(b.yield_value.partial_cmp(&a.yield_value).unwrap())
    });

    let current = CurrentRentalMarket {
        complex: complex.to_string(),
        global_stats,
        flat_type_buckets,
        opportunities,
    };

    let historical = historical_series(store, complex)?;
    Ok((current, historical))
}

fn historical_series(store: &Store, complex: &str) -> Result<HistoricalRentalSeries, StoreError> {
    let all_rentals = store.rentals_for_complex_in_range(
        complex,
        NaiveDate::MIN,
        NaiveDate::MAX,
    )?;

    let mut combos: Vec<(NaiveDate, FlatType)> = all_rentals
        .iter()
        .map(|r| (r.query_date, r.flat_type))
        .collect();
    combos.sort();
    combos.dedup();

    let mut points = Vec::with_capacity(combos.len());
    for (date, flat_type) in combos {
        let window_start = date - Duration::days(7);
        let window_end = date + Duration::days(7);
        let sales_window = store.sales_for_complex_in_range(complex, window_start, window_end)?;

        let rentals_bucket: Vec<&Snapshot> = all_rentals
            .iter()
            .filter(|r| r.query_date == date && r.flat_type == flat_type)
            .collect();

        let mut yields = Vec::new();
        for rental in &rentals_bucket {
            let similars = similar_sales(rental, &sales_window);
            if similars.is_empty() {
                continue;
            }
            let prices: Vec<f64> = similars.iter().map(|s| s.price as f64).collect();
            let median_sale = crate::analytics::stats::median(&prices);
            if median_sale > 0.0 {
                yields.push((rental.price as f64 * 12.0) / median_sale);
            }
        }

        points.push(HistoricalRentalPoint {
            date,
            flat_type,
            yield_stats: stats(&yields),
        });
    }

    Ok(HistoricalRentalSeries(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn rental_row(id: &str, price: i64, area: f64, date: NaiveDate) -> Snapshot {
        Snapshot {
            flat_id: id.to_string(),
            price,
            area,
            flat_type: FlatType::OneBedroom,
            residential_complex: Some("Meridian".to_string()),
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

    /// S4: rental 500,000/52m² 1BR vs sales [80M,90M,100M] -> median 90M ->
    /// yield = 500000*12/90000000 = 0.0666..., qualifies at min_yield=0.05.
    #[test]
    fn scenario_four_yield_and_opportunity() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        let rental = rental_row("r1", 500_000, 52.0, date);
        store.upsert_rental(&rental).unwrap();

        for (id, price) in [("s1", 80_000_000), ("s2", 90_000_000), ("s3", 100_000_000)] {
            let sale = rental_row(id, price, 52.0, date);
            store.upsert_sales(&sale).unwrap();
        }

        let (current, _) = analyze(&store, "Meridian", 0.05).unwrap();
        assert_eq!(current.opportunities.len(), 1);
        let yield_value = current.opportunities[0].yield_value;
        assert!((yield_value - (500_000.0 * 12.0 / 90_000_000.0)).abs() < 1e-9);
    }

    #[test]
    fn below_threshold_yield_is_not_an_opportunity() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        store.upsert_rental(&rental_row("r1", 100_000, 52.0, date)).unwrap();
        store.upsert_sales(&rental_row("s1", 200_000_000, 52.0, date)).unwrap();

        let (current, _) = analyze(&store, "Meridian", 0.05).unwrap();
        assert!(current.opportunities.is_empty());
    }

    #[test]
    fn historical_series_emits_zero_point_without_comparable_sales() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        store.upsert_rental(&rental_row("r1", 100_000, 52.0, date)).unwrap();

        let (_, historical) = analyze(&store, "Meridian", 0.05).unwrap();
        assert_eq!(historical.0.len(), 1);
        assert_eq!(historical.0[0].yield_stats.count, 0);
    }
}
