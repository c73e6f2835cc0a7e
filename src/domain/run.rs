//! Pipeline-run bookkeeping and the opportunity-run batch header (§3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error-kind histogram accumulated during one ingestion run (§4.5 step 3b,
/// §7). `BTreeMap` keeps bucket iteration order stable for the serialized
/// blob and for deterministic test assertions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorHistogram(pub BTreeMap<String, u64>);

impl ErrorHistogram {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn bump(&mut self, kind: &str) {
        *self.0.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Legacy rollup columns kept alongside the structured blob (§4.6).
    pub fn http_error_total(&self) -> u64 {
        self.0
            .iter()
            .filter(|(k, _)| k.starts_with("http_"))
            .map(|(_, v)| v)
            .sum()
    }

    pub fn request_error_total(&self) -> u64 {
        self.0.get("timeout").copied().unwrap_or(0)
            + self.0.get("connection_error").copied().unwrap_or(0)
            + self.0.get("other_error").copied().unwrap_or(0)
    }

    pub fn rate_limited_total(&self) -> u64 {
        self.0.get("http_429").copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub city: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub complexes_total: u64,
    pub complexes_successful: u64,
    pub complexes_failed: u64,
    pub listings_scraped: u64,
    pub errors: ErrorHistogram,
    pub cancelled: bool,
}

impl RunStats {
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

/// One batch of top-N opportunity rows produced together (§3 "run timestamp").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub rank: u32,
    pub flat_id: String,
    pub residential_complex: Option<String>,
    pub price: i64,
    pub area: f64,
    pub flat_type: String,
    pub floor: Option<i32>,
    pub total_floors: Option<i32>,
    pub construction_year: Option<i32>,
    pub parking: Option<String>,
    pub discount_percentage_vs_median: f64,
    pub median_price: f64,
    pub mean_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub sample_size: u64,
    pub query_date: chrono::NaiveDate,
    pub url: String,
    pub description: String,
}
