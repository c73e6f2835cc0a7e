//! TOML configuration (§6 "Environment"), loaded the way
//! `cooprefr-bettersys` loads its settings file: a `serde`-derived struct
//! with `Default`, read from disk if present, falling back to hard-coded
//! defaults field-by-field rather than failing the whole load.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub default_area_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_area_tolerance: 0.20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecommendationsConfig {
    pub strong_buy_yield: f64,
    pub buy_yield: f64,
    pub consider_yield: f64,
    pub excellent_deal_discount: f64,
    pub good_deal_discount: f64,
    pub fair_deal_discount: f64,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            strong_buy_yield: 0.08,
            buy_yield: 0.06,
            consider_yield: 0.05,
            excellent_deal_discount: 0.25,
            good_deal_discount: 0.15,
            fair_deal_discount: 0.08,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub max_pages_default: u32,
    pub concurrency: usize,
    pub delay_seconds: f64,
    pub max_retries: u32,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_pages_default: 10,
            concurrency: 4,
            delay_seconds: 1.0,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "jk_intel.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub recommendations: RecommendationsConfig,
    pub scraping: ScrapingConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Loads from `path` if it exists; otherwise returns defaults. A
    /// malformed file is a hard error — an operator typo in a threshold
    /// should not be silently ignored.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.scraping.max_pages_default, 10);
        assert_eq!(config.scraping.concurrency, 4);
        assert!(config.analysis.default_area_tolerance > 0.0);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.database.path, "jk_intel.db");
    }

    #[test]
    fn partial_toml_fills_the_rest_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scraping]\nconcurrency = 8\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.scraping.concurrency, 8);
        assert_eq!(config.scraping.max_pages_default, 10);
    }
}
