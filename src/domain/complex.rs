//! Residential complex, developer, blacklists, favorites (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeveloperCategory {
    Good,
    Bad,
    Indifferent,
}

impl DeveloperCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeveloperCategory::Good => "good",
            DeveloperCategory::Bad => "bad",
            DeveloperCategory::Indifferent => "indifferent",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<DeveloperCategory> {
        match s {
            "good" => Some(DeveloperCategory::Good),
            "bad" => Some(DeveloperCategory::Bad),
            "indifferent" => Some(DeveloperCategory::Indifferent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Developer {
    pub name: String,
    pub category: DeveloperCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentialComplex {
    pub complex_id: String,
    pub name: String,
    pub city: String,
    pub district: Option<String>,
    pub developer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistedComplex {
    pub complex_id: String,
    pub name: String,
    pub notes: Option<String>,
    pub blacklisted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistedDistrict {
    pub city: String,
    pub district: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FavoriteKind {
    Rental,
    Sale,
}

impl FavoriteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FavoriteKind::Rental => "rental",
            FavoriteKind::Sale => "sale",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<FavoriteKind> {
        match s {
            "rental" => Some(FavoriteKind::Rental),
            "sale" => Some(FavoriteKind::Sale),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub flat_id: String,
    pub flat_type: FavoriteKind,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoredOpportunity {
    pub flat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxRate {
    pub currency: String,
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
}
