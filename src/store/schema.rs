//! Embedded schema (§6 "Persisted state"). One migration string applied
//! with `execute_batch`, the way `mev-data::store::Store::run_migrations`
//! does it — `CREATE TABLE IF NOT EXISTS` makes re-application idempotent,
//! so there is no migration-version table to maintain.

pub const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS real_estate_developers (
    name TEXT PRIMARY KEY,
    category TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS residential_complexes (
    complex_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    city TEXT NOT NULL,
    district TEXT,
    developer TEXT REFERENCES real_estate_developers(name)
);
CREATE INDEX IF NOT EXISTS idx_complexes_city ON residential_complexes(city);

CREATE TABLE IF NOT EXISTS rental_flats (
    flat_id TEXT NOT NULL,
    query_date TEXT NOT NULL,
    price INTEGER NOT NULL,
    area REAL NOT NULL,
    flat_type TEXT NOT NULL,
    residential_complex TEXT,
    floor INTEGER,
    total_floors INTEGER,
    construction_year INTEGER,
    parking TEXT,
    description TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL,
    city TEXT,
    scraped_at TEXT NOT NULL,
    archived INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (flat_id, query_date)
);
CREATE INDEX IF NOT EXISTS idx_rental_complex_date ON rental_flats(residential_complex, query_date);
CREATE INDEX IF NOT EXISTS idx_rental_flat_type ON rental_flats(flat_type);

CREATE TABLE IF NOT EXISTS sales_flats (
    flat_id TEXT NOT NULL,
    query_date TEXT NOT NULL,
    price INTEGER NOT NULL,
    area REAL NOT NULL,
    flat_type TEXT NOT NULL,
    residential_complex TEXT,
    floor INTEGER,
    total_floors INTEGER,
    construction_year INTEGER,
    parking TEXT,
    description TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL,
    city TEXT,
    scraped_at TEXT NOT NULL,
    archived INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (flat_id, query_date)
);
CREATE INDEX IF NOT EXISTS idx_sales_complex_date ON sales_flats(residential_complex, query_date);
CREATE INDEX IF NOT EXISTS idx_sales_flat_type ON sales_flats(flat_type);

CREATE TABLE IF NOT EXISTS favorites (
    flat_id TEXT NOT NULL,
    flat_type TEXT NOT NULL,
    notes TEXT,
    added_at TEXT NOT NULL,
    PRIMARY KEY (flat_id, flat_type)
);

CREATE TABLE IF NOT EXISTS blacklisted_jks (
    complex_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    notes TEXT,
    blacklisted_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS blacklisted_districts (
    city TEXT NOT NULL,
    district TEXT NOT NULL,
    PRIMARY KEY (city, district)
);

CREATE TABLE IF NOT EXISTS ignored_opportunities (
    flat_id TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS mid_prices (
    currency TEXT NOT NULL,
    rate REAL NOT NULL,
    fetched_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mid_prices_currency_fetched ON mid_prices(currency, fetched_at);

CREATE TABLE IF NOT EXISTS jk_performance_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    complex_id TEXT NOT NULL,
    query_date TEXT NOT NULL,
    flat_type TEXT NOT NULL,
    mean_price REAL NOT NULL,
    median_price REAL NOT NULL,
    min_price REAL NOT NULL,
    max_price REAL NOT NULL,
    sample_size INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS opportunity_analysis (
    run_timestamp TEXT NOT NULL,
    rank INTEGER NOT NULL,
    flat_id TEXT NOT NULL,
    residential_complex TEXT,
    price INTEGER NOT NULL,
    area REAL NOT NULL,
    flat_type TEXT NOT NULL,
    floor INTEGER,
    total_floors INTEGER,
    construction_year INTEGER,
    parking TEXT,
    discount_percentage_vs_median REAL NOT NULL,
    median_price REAL NOT NULL,
    mean_price REAL NOT NULL,
    min_price REAL NOT NULL,
    max_price REAL NOT NULL,
    sample_size INTEGER NOT NULL,
    query_date TEXT NOT NULL,
    url TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_opportunity_run ON opportunity_analysis(run_timestamp);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    duration_seconds INTEGER,
    complexes_total INTEGER NOT NULL,
    complexes_successful INTEGER NOT NULL,
    complexes_failed INTEGER NOT NULL,
    listings_scraped INTEGER NOT NULL,
    cancelled INTEGER NOT NULL DEFAULT 0,
    error_histogram TEXT NOT NULL,
    http_error_total INTEGER NOT NULL DEFAULT 0,
    request_error_total INTEGER NOT NULL DEFAULT 0,
    rate_limited_total INTEGER NOT NULL DEFAULT 0
);
"#;
