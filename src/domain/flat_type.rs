//! Finite tagged variants for flat type and advertisement kind.
//!
//! Both persist to the store as the exact strings krisha.kz-era consumers
//! expect (`FlatType::as_str`), so the `CHECK` constraint in the schema and
//! any downstream reader agree on spelling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A flat's size bracket, inferred from its room count or area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlatType {
    Studio,
    OneBedroom,
    TwoBedroom,
    ThreePlusBedroom,
}

impl FlatType {
    pub const ALL: [FlatType; 4] = [
        FlatType::Studio,
        FlatType::OneBedroom,
        FlatType::TwoBedroom,
        FlatType::ThreePlusBedroom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlatType::Studio => "Studio",
            FlatType::OneBedroom => "1BR",
            FlatType::TwoBedroom => "2BR",
            FlatType::ThreePlusBedroom => "3BR+",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<FlatType> {
        match s {
            "Studio" => Some(FlatType::Studio),
            "1BR" => Some(FlatType::OneBedroom),
            "2BR" => Some(FlatType::TwoBedroom),
            "3BR+" => Some(FlatType::ThreePlusBedroom),
            _ => None,
        }
    }

    /// §4.1 rule 3: fall back to area brackets when no room count is found.
    pub fn from_area(area: f64) -> FlatType {
        if area <= 30.0 {
            FlatType::Studio
        } else if area <= 50.0 {
            FlatType::OneBedroom
        } else if area <= 80.0 {
            FlatType::TwoBedroom
        } else {
            FlatType::ThreePlusBedroom
        }
    }

    pub fn from_room_count(rooms: u32) -> FlatType {
        match rooms {
            1 => FlatType::OneBedroom,
            2 => FlatType::TwoBedroom,
            _ => FlatType::ThreePlusBedroom,
        }
    }

    /// §4.7: Studio and 1BR are a confusable pair for similarity matching.
    pub fn confusable_with(&self, other: &FlatType) -> bool {
        self == other
            || matches!(
                (self, other),
                (FlatType::Studio, FlatType::OneBedroom) | (FlatType::OneBedroom, FlatType::Studio)
            )
    }
}

impl fmt::Display for FlatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rental vs sale; determines table and upstream search URL (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvertisementKind {
    Rental,
    Sale,
}

impl AdvertisementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvertisementKind::Rental => "rental",
            AdvertisementKind::Sale => "sale",
        }
    }

    pub fn is_rental(&self) -> bool {
        matches!(self, AdvertisementKind::Rental)
    }

    /// Path segment used in the upstream search URL (§6).
    pub fn search_path_segment(&self) -> &'static str {
        match self {
            AdvertisementKind::Rental => "arenda",
            AdvertisementKind::Sale => "prodazha",
        }
    }
}

impl fmt::Display for AdvertisementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_brackets() {
        assert_eq!(FlatType::from_area(30.0), FlatType::Studio);
        assert_eq!(FlatType::from_area(30.1), FlatType::OneBedroom);
        assert_eq!(FlatType::from_area(50.0), FlatType::OneBedroom);
        assert_eq!(FlatType::from_area(80.0), FlatType::TwoBedroom);
        assert_eq!(FlatType::from_area(80.1), FlatType::ThreePlusBedroom);
    }

    #[test]
    fn studio_one_br_confusable() {
        assert!(FlatType::Studio.confusable_with(&FlatType::OneBedroom));
        assert!(FlatType::OneBedroom.confusable_with(&FlatType::Studio));
        assert!(!FlatType::Studio.confusable_with(&FlatType::TwoBedroom));
    }

    #[test]
    fn round_trip_str() {
        for ft in FlatType::ALL {
            assert_eq!(FlatType::from_str_opt(ft.as_str()), Some(ft));
        }
    }
}
