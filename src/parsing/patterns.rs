//! Compiled-once regexes for the Listing Parser (§4.1, §9 "Regex
//! compilation"). Mirrors the teacher's `lazy_static!` block for its
//! NSW address-normalization patterns, generalized to this crate's
//! Cyrillic listing text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref AREA: Regex =
        Regex::new(r"(\d+(?:[.,]\d+)?)\s*м²").expect("AREA regex is valid");

    pub static ref FLOORS: Regex =
        Regex::new(r"(\d+)\s*/\s*(\d+)\s*этаж").expect("FLOORS regex is valid");

    pub static ref ROOM_COUNT: Regex =
        Regex::new(r"(\d+)\s*[-–]?\s*комнатн").expect("ROOM_COUNT regex is valid");

    pub static ref STUDIO: Regex =
        Regex::new(r"(?i)студи").expect("STUDIO regex is valid");

    // Residential-complex name patterns, tried in spec order.
    pub static ref COMPLEX_ZHIL: Regex =
        Regex::new(r#"жил\.?\s*комплекс\s+([^.,\n"]+)"#).expect("COMPLEX_ZHIL regex is valid");
    pub static ref COMPLEX_ZHK_QUOTED: Regex =
        Regex::new(r#"ЖК\s*"([^"]+)""#).expect("COMPLEX_ZHK_QUOTED regex is valid");
    pub static ref COMPLEX_ZHK_BARE: Regex =
        Regex::new(r#"ЖК\s+([^.,\n"]+)"#).expect("COMPLEX_ZHK_BARE regex is valid");

    pub static ref CONSTRUCTION_YEAR_POSTROYKI: Regex =
        Regex::new(r"год\s+постройки\s+(\d{4})").expect("CONSTRUCTION_YEAR_POSTROYKI regex is valid");
    pub static ref CONSTRUCTION_YEAR_POSTROEN: Regex =
        Regex::new(r"постро(?:ен|ена|ено)\s+(\d{4})").expect("CONSTRUCTION_YEAR_POSTROEN regex is valid");
    pub static ref CONSTRUCTION_YEAR_SDAN: Regex =
        Regex::new(r"сдан\s+в\s+(\d{4})").expect("CONSTRUCTION_YEAR_SDAN regex is valid");
    pub static ref CONSTRUCTION_YEAR_BARE: Regex =
        Regex::new(r"(\d{4})\s*г\.").expect("CONSTRUCTION_YEAR_BARE regex is valid");
}

/// Parking keywords, checked in this order (§4.1 "parking"). Not a regex —
/// a plain substring scan is all the rule needs.
pub const PARKING_KEYWORDS: [(&str, &str); 4] = [
    ("подземная парковка", "подземная парковка"),
    ("наземная парковка", "наземная парковка"),
    ("охраняемая стоянка", "охраняемая стоянка"),
    ("парковка", "парковка"),
];

/// Trailing fragments stripped from a captured residential-complex name
/// (§4.1 "residential_complex").
pub const COMPLEX_NAME_TRIM_MARKERS: [&str; 1] = [" в "];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_matches_title() {
        let caps = AREA.captures("2-комнатная квартира, 52 м², 2/12 этаж").unwrap();
        assert_eq!(&caps[1], "52");
    }

    #[test]
    fn floors_matches_title() {
        let caps = FLOORS.captures("2-комнатная квартира, 52 м², 2/12 этаж").unwrap();
        assert_eq!(&caps[1], "2");
        assert_eq!(&caps[2], "12");
    }

    #[test]
    fn room_count_extracts_digit() {
        let caps = ROOM_COUNT.captures("2-комнатная квартира").unwrap();
        assert_eq!(&caps[1], "2");
    }

    #[test]
    fn complex_zhil_pattern() {
        let caps = COMPLEX_ZHIL
            .captures("жил. комплекс Meridian Apartments в Алматы")
            .unwrap();
        assert_eq!(caps[1].trim(), "Meridian Apartments в Алматы");
    }
}
