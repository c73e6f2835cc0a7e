//! jk-intel: ingestion + analytics pipeline for residential-complex
//! rental/sale listings (see `SPEC_FULL.md`).

pub mod analytics;
pub mod config;
pub mod directory;
pub mod domain;
pub mod error;
pub mod parsing;
pub mod pipeline;
pub mod scraping;
pub mod store;
