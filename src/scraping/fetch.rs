//! Listing Fetcher (§4.2): analytics endpoint first, rendered page on any
//! failure. Grounded in the teacher's `ingestion::fetch` (thin async
//! functions around a shared `reqwest::Client`) plus
//! `davidhmays-scraper_simple`'s `scraper::scraper` for the HTML/selector
//! fallback path.

use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{AdvertisementKind, Listing};
use crate::error::FetchError;
use crate::parsing::{self, ParseInput};
use crate::scraping::http_client::{analytics_url, listing_page_url};
use crate::scraping::rate_limit::{backoff_for_attempt, should_retry, RateLimiter};

#[derive(Debug, Deserialize)]
struct AnalyticsAdvert {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    price: String,
}

#[derive(Debug, Deserialize)]
struct AnalyticsPayload {
    #[serde(default)]
    advert: AnalyticsAdvert,
    #[serde(rename = "currentPrice", default)]
    current_price: Option<i64>,
}

const RENTAL_MARKERS: [&str; 3] = ["в месяц", "/мес", "аренда"];
const SALE_MARKERS: [&str; 1] = ["продажа"];

/// Best-effort classification check (§7 "Classification", §9 Open
/// Questions — the source gives no hard signal, so strong keyword markers
/// stand in for it; detection only, policy is left to the caller).
fn detect_kind_mismatch(text: &str, requested: AdvertisementKind) -> Option<FetchError> {
    let lower = text.to_lowercase();
    let has_rental = RENTAL_MARKERS.iter().any(|m| lower.contains(m));
    let has_sale = SALE_MARKERS.iter().any(|m| lower.contains(m));
    match requested {
        AdvertisementKind::Sale if has_rental && !has_sale => {
            Some(FetchError::UnexpectedRentalWhenSaleRequested)
        }
        AdvertisementKind::Rental if has_sale && !has_rental => {
            Some(FetchError::UnexpectedSaleWhenRentalRequested)
        }
        _ => None,
    }
}

fn map_transport_error(err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = err.status() {
        FetchError::Http(status.as_u16())
    } else {
        FetchError::ConnectionError(err.to_string())
    }
}

async fn fetch_via_analytics(
    client: &Client,
    flat_id: &str,
    kind: AdvertisementKind,
) -> Result<Listing, FetchError> {
    let response = client
        .get(analytics_url(flat_id))
        .header("Accept", "application/json")
        .header("Referer", crate::scraping::http_client::ANALYTICS_HOST)
        .header("Origin", crate::scraping::http_client::ANALYTICS_HOST)
        .send()
        .await
        .map_err(|e| map_transport_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| FetchError::DecodeError(e.to_string()))?;
    let payload: AnalyticsPayload =
        serde_json::from_value(body).map_err(|e| FetchError::DecodeError(e.to_string()))?;

    if let Some(mismatch) = detect_kind_mismatch(
        &format!("{} {}", payload.advert.title, payload.advert.description),
        kind,
    ) {
        return Err(mismatch);
    }

    let input = ParseInput {
        flat_id: flat_id.to_string(),
        title: payload.advert.title,
        description: payload.advert.description,
        current_price: payload.current_price,
        price_html: Some(payload.advert.price),
        is_rental: kind.is_rental(),
        city: None,
    };
    parsing::parse(input)
}

async fn fetch_via_page(
    client: &Client,
    flat_id: &str,
    kind: AdvertisementKind,
) -> Result<Listing, FetchError> {
    let response = client
        .get(listing_page_url(flat_id))
        .send()
        .await
        .map_err(|e| map_transport_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }

    let html = response
        .text()
        .await
        .map_err(|e| FetchError::DecodeError(e.to_string()))?;

    let document = Html::parse_document(&html);
    let title_selector =
        Selector::parse("h1.offer__advert-title, h1").expect("title selector is valid");
    let description_selector =
        Selector::parse(".offer__description, .a-text").expect("description selector is valid");
    let price_selector =
        Selector::parse(".offer__price, .price").expect("price selector is valid");

    let title = document
        .select(&title_selector)
        .next()
        .map(|e| e.text().collect::<String>())
        .unwrap_or_default();
    let description = document
        .select(&description_selector)
        .map(|e| e.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    let price_html = document
        .select(&price_selector)
        .next()
        .map(|e| e.text().collect::<String>());

    if let Some(mismatch) = detect_kind_mismatch(&format!("{title} {description}"), kind) {
        return Err(mismatch);
    }

    let input = ParseInput {
        flat_id: flat_id.to_string(),
        title,
        description,
        current_price: None,
        price_html,
        is_rental: kind.is_rental(),
        city: None,
    };
    parsing::parse(input)
}

/// Public contract: `fetch(flat_id, kind) -> Listing | FetchError` (§4.2).
/// Applies the §5 retry schedule to each source independently, then falls
/// over from analytics to the rendered page on any remaining failure.
pub async fn fetch(
    client: &Client,
    limiter: &RateLimiter,
    flat_id: &str,
    kind: AdvertisementKind,
) -> Result<Listing, FetchError> {
    let mut attempt = 0;
    let analytics_result = loop {
        limiter.acquire().await;
        let result = fetch_via_analytics(client, flat_id, kind).await;
        match &result {
            Err(FetchError::Http(429)) => limiter.record_rate_limited().await,
            Err(e) if should_retry(e, attempt) => {
                attempt += 1;
                tokio::time::sleep(backoff_for_attempt(attempt)).await;
                continue;
            }
            _ => {}
        }
        break result;
    };

    if let Ok(listing) = analytics_result {
        debug!(flat_id, "fetched via analytics endpoint");
        return Ok(listing);
    }
    let analytics_error = analytics_result.unwrap_err();
    warn!(flat_id, %analytics_error, "analytics fetch failed, falling back to page");

    let mut attempt = 0;
    loop {
        limiter.acquire().await;
        let result = fetch_via_page(client, flat_id, kind).await;
        match &result {
            Err(FetchError::Http(429)) => limiter.record_rate_limited().await,
            Err(e) if should_retry(e, attempt) => {
                attempt += 1;
                tokio::time::sleep(backoff_for_attempt(attempt)).await;
                continue;
            }
            _ => {}
        }
        return result;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_rental_marker_when_sale_requested() {
        let err = detect_kind_mismatch("сдам квартиру в месяц", AdvertisementKind::Sale);
        assert_eq!(err, Some(FetchError::UnexpectedRentalWhenSaleRequested));
    }

    #[test]
    fn no_mismatch_when_markers_absent() {
        assert_eq!(
            detect_kind_mismatch("просторная квартира с ремонтом", AdvertisementKind::Sale),
            None
        );
    }

    #[test]
    fn detects_sale_marker_when_rental_requested() {
        let err = detect_kind_mismatch("срочная продажа квартиры", AdvertisementKind::Rental);
        assert_eq!(err, Some(FetchError::UnexpectedSaleWhenRentalRequested));
    }
}
