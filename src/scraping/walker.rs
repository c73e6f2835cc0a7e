//! Search Walker (§4.3): lazy, deduplicated pagination over the upstream
//! search results for one `(complex_id, advertisement_kind)` pair.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::warn;

use crate::domain::AdvertisementKind;
use crate::scraping::http_client::search_page_url;

lazy_static! {
    /// First element matching the main results list container (the
    /// favorites-list variant carries an extra class but the same pair).
    static ref RESULTS_CONTAINER: Selector =
        Selector::parse("div.list.search-list, div.list.search-list.search-list--favorites")
            .expect("results container selector is valid");
    static ref LISTING_ANCHOR: Selector =
        Selector::parse("a[href]").expect("anchor selector is valid");
    static ref LISTING_HREF: Regex =
        Regex::new(r"/a/show/(\d+)").expect("listing href regex is valid");
}

/// Extracts listing ids from one page's HTML, scoped to the main results
/// container only (§4.3: "must ignore sidebar/ads").
fn extract_listing_ids(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Some(container) = document.select(&RESULTS_CONTAINER).next() else {
        return Vec::new();
    };
    container
        .select(&LISTING_ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| LISTING_HREF.captures(href))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Walks one `(complex_id, kind)` pair page by page, yielding deduplicated
/// listing ids up to `max_pages` (§4.3). Consumed once; HTTP failures on a
/// page end the walk rather than retrying (retries belong to the
/// Orchestrator, per spec).
pub async fn walk(
    client: &Client,
    city: &str,
    complex_id: &str,
    kind: AdvertisementKind,
    max_pages: u32,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for page in 1..=max_pages {
        let url = search_page_url(city, complex_id, kind, page);
        let html = match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(%url, error = %e, "search page body unreadable, ending walk");
                    break;
                }
            },
            Ok(response) => {
                warn!(%url, status = %response.status(), "search page returned non-2xx, ending walk");
                break;
            }
            Err(e) => {
                warn!(%url, error = %e, "search page request failed, ending walk");
                break;
            }
        };

        let page_ids = extract_listing_ids(&html);
        if page_ids.is_empty() {
            break;
        }

        for id in page_ids {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }

    ids
}
