//! Similarity Matcher (§4.7): pure comparable-sale selection for one
//! rental snapshot. No DB access (§9 "Similarity Matcher is pure") — the
//! Store assembles the candidate set, this module only scores it.

use crate::domain::Snapshot;

/// §4.7 match rule: flat type equal or in the `{Studio, 1BR}` confusable
/// pair, area within ±20% inclusive, both areas positive.
pub fn is_comparable(rental: &Snapshot, sale: &Snapshot) -> bool {
    if rental.area <= 0.0 || sale.area <= 0.0 {
        return false;
    }
    if !rental.flat_type.confusable_with(&sale.flat_type) {
        return false;
    }
    let diff = (sale.area - rental.area).abs();
    let denom = sale.area.max(rental.area);
    diff / denom <= 0.20
}

/// Subset of `candidates` comparable to `rental` (§4.7).
pub fn similar_sales<'a>(rental: &Snapshot, candidates: &'a [Snapshot]) -> Vec<&'a Snapshot> {
    candidates.iter().filter(|sale| is_comparable(rental, sale)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FlatType;
    use chrono::{NaiveDate, Utc};

    fn snap(flat_type: FlatType, area: f64, price: i64) -> Snapshot {
        Snapshot {
            flat_id: "x".to_string(),
            price,
            area,
            flat_type,
            residential_complex: Some("Meridian".to_string()),
            floor: None,
            total_floors: None,
            construction_year: None,
            parking: None,
            description: String::new(),
            url: "https://krisha.kz/a/show/x".to_string(),
            city: Some("almaty".to_string()),
            query_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            scraped_at: Utc::now(),
            archived: false,
        }
    }

    #[test]
    fn same_type_within_tolerance_matches() {
        let rental = snap(FlatType::OneBedroom, 52.0, 500_000);
        let sale = snap(FlatType::OneBedroom, 60.0, 90_000_000);
        assert!(is_comparable(&rental, &sale)); // |60-52|/60 = 0.133 <= 0.20
    }

    #[test]
    fn studio_and_one_br_are_confusable() {
        let rental = snap(FlatType::Studio, 30.0, 400_000);
        let sale = snap(FlatType::OneBedroom, 32.0, 20_000_000);
        assert!(is_comparable(&rental, &sale));
    }

    #[test]
    fn area_outside_tolerance_is_rejected() {
        let rental = snap(FlatType::TwoBedroom, 52.0, 500_000);
        let sale = snap(FlatType::TwoBedroom, 70.0, 80_000_000);
        assert!(!is_comparable(&rental, &sale)); // |70-52|/70 = 0.257 > 0.20
    }

    #[test]
    fn mismatched_non_confusable_type_is_rejected() {
        let rental = snap(FlatType::Studio, 50.0, 400_000);
        let sale = snap(FlatType::TwoBedroom, 50.0, 40_000_000);
        assert!(!is_comparable(&rental, &sale));
    }

    #[test]
    fn zero_area_is_rejected() {
        let rental = snap(FlatType::Studio, 0.0, 400_000);
        let sale = snap(FlatType::Studio, 30.0, 20_000_000);
        assert!(!is_comparable(&rental, &sale));
    }

    #[test]
    fn boundary_twenty_percent_is_inclusive() {
        let rental = snap(FlatType::TwoBedroom, 50.0, 500_000);
        let sale = snap(FlatType::TwoBedroom, 62.5, 80_000_000); // |62.5-50|/62.5 = 0.20 exactly
        assert!(is_comparable(&rental, &sale));
    }
}
