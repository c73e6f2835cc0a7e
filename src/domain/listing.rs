//! The canonical in-memory `Listing` — owned, no hidden shared references
//! (§9 "Owning the listing parse").

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::flat_type::FlatType;

/// One advertisement, normalized from either the analytics payload or the
/// rendered page (§3 "Listing").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub flat_id: String,
    pub is_rental: bool,
    pub price: i64,
    pub area: f64,
    pub flat_type: FlatType,
    pub residential_complex: Option<String>,
    pub floor: Option<i32>,
    pub total_floors: Option<i32>,
    pub construction_year: Option<i32>,
    pub parking: Option<String>,
    pub description: String,
    pub archived: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub scraped_at: DateTime<Utc>,
    pub city: Option<String>,
}

impl Listing {
    /// §3 invariant: `price > 0 ∧ area > 0 ∧ flat_type` well-formed.
    pub fn is_valid(&self) -> bool {
        self.price > 0 && self.area > 0.0
    }
}

/// One `(flat_id, query_date)` row as stored (§3 "Snapshot").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub flat_id: String,
    pub price: i64,
    pub area: f64,
    pub flat_type: FlatType,
    pub residential_complex: Option<String>,
    pub floor: Option<i32>,
    pub total_floors: Option<i32>,
    pub construction_year: Option<i32>,
    pub parking: Option<String>,
    pub description: String,
    pub url: String,
    pub city: Option<String>,
    pub query_date: NaiveDate,
    pub scraped_at: DateTime<Utc>,
    pub archived: bool,
}

impl Snapshot {
    pub fn from_listing(listing: &Listing, url: String, query_date: NaiveDate) -> Snapshot {
        Snapshot {
            flat_id: listing.flat_id.clone(),
            price: listing.price,
            area: listing.area,
            flat_type: listing.flat_type,
            residential_complex: listing.residential_complex.clone(),
            floor: listing.floor,
            total_floors: listing.total_floors,
            construction_year: listing.construction_year,
            parking: listing.parking.clone(),
            description: listing.description.clone(),
            url,
            city: listing.city.clone(),
            query_date,
            scraped_at: listing.scraped_at,
            archived: false,
        }
    }

    pub fn price_per_area(&self) -> f64 {
        if self.area > 0.0 {
            self.price as f64 / self.area
        } else {
            0.0
        }
    }
}
