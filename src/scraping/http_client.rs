//! Shared `reqwest` client construction (§6 "Upstream portal"). One client
//! per process, keep-alive pooled per host, built the way the teacher's
//! `ingestion::utils::http_get` builds its client — just generalized to
//! carry the headers the upstream portal expects.

use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub const ANALYTICS_HOST: &str = "https://m.krisha.kz";
pub const MAIN_HOST: &str = "https://krisha.kz";

/// Builds the single client a `Fetcher`/`Walker` pair shares for the
/// lifetime of an ingestion run.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
}

pub fn analytics_url(flat_id: &str) -> String {
    format!("{ANALYTICS_HOST}/analytics/aPriceAnalysis/?id={flat_id}")
}

pub fn listing_page_url(flat_id: &str) -> String {
    format!("{MAIN_HOST}/a/show/{flat_id}")
}

pub fn search_page_url(
    city: &str,
    complex_id: &str,
    kind: crate::domain::AdvertisementKind,
    page: u32,
) -> String {
    format!(
        "{MAIN_HOST}/{}/kvartiry/{city}/?das[map.complex]={complex_id}&page={page}",
        kind.search_path_segment()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AdvertisementKind;

    #[test]
    fn search_url_picks_path_segment_by_kind() {
        let rental = search_page_url("almaty", "42", AdvertisementKind::Rental, 1);
        assert!(rental.contains("/arenda/kvartiry/almaty/"));
        let sale = search_page_url("almaty", "42", AdvertisementKind::Sale, 1);
        assert!(sale.contains("/prodazha/kvartiry/almaty/"));
    }
}
