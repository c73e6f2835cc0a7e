//! Analytics engine (§4.7-§4.11): similarity matching, the statistics
//! kernel, per-complex rental/sales analytics, and cross-snapshot diffs.
//! Everything here is read-only against the Store (§3 "Ownership").

pub mod cross_snapshot;
pub mod rental;
pub mod sales;
pub mod similarity;
pub mod stats;
