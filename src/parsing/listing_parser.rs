//! Listing Parser (§4.1): turns free text plus a couple of numeric/HTML-ish
//! fields into a canonical [`Listing`]. Mirrors the teacher's
//! `ingestion::parse` module in shape — one `parse` entry point, one
//! private extraction function per field, each returning `Option`/`Result`
//! rather than panicking on malformed input.

use chrono::{Datelike, Utc};
use unicode_normalization::UnicodeNormalization;

use crate::domain::{FlatType, Listing};
use crate::error::FetchError;
use crate::parsing::patterns::{
    AREA, COMPLEX_NAME_TRIM_MARKERS, COMPLEX_ZHIL, COMPLEX_ZHK_BARE, COMPLEX_ZHK_QUOTED,
    CONSTRUCTION_YEAR_BARE, CONSTRUCTION_YEAR_POSTROEN, CONSTRUCTION_YEAR_POSTROYKI,
    CONSTRUCTION_YEAR_SDAN, FLOORS, PARKING_KEYWORDS, ROOM_COUNT, STUDIO,
};

/// Raw material the parser owns and consumes (§9 "Owning the listing
/// parse") — populated by the Fetcher from either the analytics payload or
/// the rendered page, so the parser itself never touches the network.
#[derive(Debug, Clone)]
pub struct ParseInput {
    pub flat_id: String,
    pub title: String,
    pub description: String,
    /// Numeric price already decoded by the caller, when the source
    /// provides one (`advert.currentPrice`).
    pub current_price: Option<i64>,
    /// HTML-ish price text (`advert.price`), used when `current_price` is
    /// absent.
    pub price_html: Option<String>,
    pub is_rental: bool,
    pub city: Option<String>,
}

fn normalize(s: &str) -> String {
    s.nfc().collect::<String>().trim().to_string()
}

fn extract_price(input: &ParseInput) -> Result<i64, FetchError> {
    if let Some(price) = input.current_price {
        if price > 0 {
            return Ok(price);
        }
    }
    if let Some(html) = &input.price_html {
        let digits: String = html.chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(price) = digits.parse::<i64>() {
            if price > 0 {
                return Ok(price);
            }
        }
    }
    Err(FetchError::ParseMissingField("price".to_string()))
}

fn extract_area(title: &str, description: &str) -> Result<f64, FetchError> {
    for text in [title, description] {
        if let Some(caps) = AREA.captures(text) {
            let raw = caps[1].replace(',', ".");
            if let Ok(area) = raw.parse::<f64>() {
                if area > 0.0 {
                    return Ok(area);
                }
            }
        }
    }
    Err(FetchError::ParseMissingField("area".to_string()))
}

fn extract_floors(title: &str, description: &str) -> Option<(i32, i32)> {
    for text in [title, description] {
        if let Some(caps) = FLOORS.captures(text) {
            let floor: i32 = caps[1].parse().ok()?;
            let total: i32 = caps[2].parse().ok()?;
            if floor >= 1 && total >= floor {
                return Some((floor, total));
            }
        }
    }
    None
}

fn clean_complex_name(raw: &str) -> Option<String> {
    let mut name = raw.trim().trim_matches('"').to_string();
    for marker in COMPLEX_NAME_TRIM_MARKERS {
        if let Some(idx) = name.find(marker) {
            name.truncate(idx);
        }
    }
    let name = normalize(name.trim().trim_matches('"'));
    let len = name.chars().count();
    if (2..=80).contains(&len) {
        Some(name)
    } else {
        None
    }
}

fn extract_residential_complex(description: &str) -> Option<String> {
    if let Some(caps) = COMPLEX_ZHIL.captures(description) {
        if let Some(name) = clean_complex_name(&caps[1]) {
            return Some(name);
        }
    }
    if let Some(caps) = COMPLEX_ZHK_QUOTED.captures(description) {
        if let Some(name) = clean_complex_name(&caps[1]) {
            return Some(name);
        }
    }
    if let Some(caps) = COMPLEX_ZHK_BARE.captures(description) {
        if let Some(name) = clean_complex_name(&caps[1]) {
            return Some(name);
        }
    }
    None
}

fn extract_construction_year(description: &str, now_year: i32) -> Option<i32> {
    let candidates = [
        CONSTRUCTION_YEAR_POSTROYKI.captures(description),
        CONSTRUCTION_YEAR_POSTROEN.captures(description),
        CONSTRUCTION_YEAR_SDAN.captures(description),
        CONSTRUCTION_YEAR_BARE.captures(description),
    ];
    for caps in candidates.into_iter().flatten() {
        if let Ok(year) = caps[1].parse::<i32>() {
            if (1900..=now_year + 5).contains(&year) {
                return Some(year);
            }
        }
    }
    None
}

fn extract_parking(description: &str) -> Option<String> {
    let lower = description.to_lowercase();
    for (keyword, label) in PARKING_KEYWORDS {
        if lower.contains(keyword) {
            return Some(label.to_string());
        }
    }
    None
}

fn extract_flat_type(title: &str, description: &str, area: f64) -> FlatType {
    if STUDIO.is_match(title) || STUDIO.is_match(description) {
        return FlatType::Studio;
    }
    for text in [title, description] {
        if let Some(caps) = ROOM_COUNT.captures(text) {
            if let Ok(rooms) = caps[1].parse::<u32>() {
                return FlatType::from_room_count(rooms);
            }
        }
    }
    FlatType::from_area(area)
}

/// Entry point (§4.1): apply every extraction rule in spec order, failing
/// on the first mandatory field that cannot be recovered.
pub fn parse(input: ParseInput) -> Result<Listing, FetchError> {
    let title = normalize(&input.title);
    let description = normalize(&input.description);

    let price = extract_price(&input)?;
    let area = extract_area(&title, &description)?;
    let (floor, total_floors) = match extract_floors(&title, &description) {
        Some((f, t)) => (Some(f), Some(t)),
        None => (None, None),
    };
    let now_year = Utc::now().year();
    let residential_complex = extract_residential_complex(&description);
    let construction_year = extract_construction_year(&description, now_year);
    let parking = extract_parking(&description);
    let flat_type = extract_flat_type(&title, &description, area);

    let now = Utc::now();
    Ok(Listing {
        flat_id: input.flat_id,
        is_rental: input.is_rental,
        price,
        area,
        flat_type,
        residential_complex,
        floor,
        total_floors,
        construction_year,
        parking,
        description,
        archived: false,
        published_at: None,
        created_at: now,
        scraped_at: now,
        city: input.city,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, description: &str, price_html: &str, is_rental: bool) -> ParseInput {
        ParseInput {
            flat_id: "123".to_string(),
            title: title.to_string(),
            description: description.to_string(),
            current_price: None,
            price_html: Some(price_html.to_string()),
            is_rental,
            city: None,
        }
    }

    /// S1 (flat_type corrected: §4.1 rule 2 maps a 2-room title to 2BR via
    /// `ROOM_COUNT` → `from_room_count(2)`, matching the original
    /// `determine_flat_type_from_text`; the spec prose's stated `1BR` for
    /// this scenario is inconsistent with its own rule 2 and the original).
    #[test]
    fn scenario_one_room_with_complex() {
        let listing = parse(input(
            "2-комнатная квартира, 52 м², 2/12 этаж",
            "… жил. комплекс Meridian Apartments в Алматы. …",
            "500&nbsp;000&nbsp;₸",
            true,
        ))
        .unwrap();

        assert_eq!(listing.price, 500_000);
        assert_eq!(listing.area, 52.0);
        assert_eq!(listing.floor, Some(2));
        assert_eq!(listing.total_floors, Some(12));
        assert_eq!(listing.flat_type, FlatType::TwoBedroom);
        assert_eq!(
            listing.residential_complex.as_deref(),
            Some("Meridian Apartments")
        );
        assert!(listing.is_rental);
        assert_eq!(listing.construction_year, None);
        assert_eq!(listing.parking, None);
    }

    /// S2
    #[test]
    fn scenario_studio_no_complex() {
        let listing = parse(input(
            "Студия, 31 м², 5/5 этаж",
            "",
            "22 000 000 ₸",
            false,
        ))
        .unwrap();

        assert_eq!(listing.flat_type, FlatType::Studio);
        assert_eq!(listing.price, 22_000_000);
        assert_eq!(listing.area, 31.0);
        assert_eq!(listing.floor, Some(5));
        assert_eq!(listing.total_floors, Some(5));
        assert_eq!(listing.residential_complex, None);
    }

    #[test]
    fn missing_price_is_an_error() {
        let result = parse(input("квартира", "", "уточняйте", false));
        assert_eq!(
            result.unwrap_err(),
            FetchError::ParseMissingField("price".to_string())
        );
    }

    #[test]
    fn missing_area_is_an_error() {
        let result = parse(input("квартира", "без площади", "1 000 000", false));
        assert_eq!(
            result.unwrap_err(),
            FetchError::ParseMissingField("area".to_string())
        );
    }

    #[test]
    fn current_price_wins_over_html_price() {
        let mut raw = input("студия, 30 м²", "", "1 000 000", false);
        raw.current_price = Some(2_000_000);
        let listing = parse(raw).unwrap();
        assert_eq!(listing.price, 2_000_000);
    }

    #[test]
    fn parking_keyword_detected() {
        let listing = parse(input(
            "студия, 30 м²",
            "есть подземная парковка рядом",
            "1 000 000",
            false,
        ))
        .unwrap();
        assert_eq!(listing.parking.as_deref(), Some("подземная парковка"));
    }

    #[test]
    fn construction_year_out_of_range_is_rejected() {
        let listing = parse(input(
            "студия, 30 м²",
            "год постройки 1850",
            "1 000 000",
            false,
        ))
        .unwrap();
        assert_eq!(listing.construction_year, None);
    }

    #[test]
    fn three_plus_bedroom_from_room_count() {
        let listing = parse(input(
            "5-комнатная квартира, 120 м², 3/9 этаж",
            "",
            "50 000 000",
            false,
        ))
        .unwrap();
        assert_eq!(listing.flat_type, FlatType::ThreePlusBedroom);
    }
}
