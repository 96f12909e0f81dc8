use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

use crate::config::Config;
use crate::error::Result;
use crate::parser::absolutize;
use crate::transport::{Fetch, FetchOutcome, Timeouts};
use crate::types::Endpoint;

static MARKET_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="mkt="]"#).expect("market anchor selector is valid"));

static MARKET_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mkt=([a-zA-Z\-]+)").expect("market code pattern is valid"));

/// Fetch the settings page and collect every market endpoint it links to.
///
/// A non-2xx answer yields an empty set; the caller treats that as
/// "not initialized" and must not start a batch.
pub fn enumerate(fetch: &dyn Fetch, config: &Config) -> Result<BTreeSet<Endpoint>> {
    let timeouts = Timeouts::new(config.connect_timeout(), config.settings_read_timeout());

    match fetch.fetch(&config.settings_url, timeouts)? {
        FetchOutcome::Success(response) => {
            debug!("Settings headers: {:?}", response.headers);
            let body = response.read_text()?;
            let endpoints = parse_endpoints(&body, &config.base_host);
            info!("Enumerated {} endpoints", endpoints.len());
            Ok(endpoints)
        }
        FetchOutcome::Failure(response) => {
            response.log_failure();
            Ok(BTreeSet::new())
        }
    }
}

/// Endpoints linked from a settings page body.
///
/// Anchors whose href carries a market parameter are used as-is (made
/// absolute). Older pages without such anchors fall back to scanning the text
/// for `mkt=` codes.
pub fn parse_endpoints(body: &str, base_host: &str) -> BTreeSet<Endpoint> {
    let document = Html::parse_document(body);
    let mut endpoints: BTreeSet<Endpoint> = document
        .select(&MARKET_ANCHOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| Endpoint::new(absolutize(href, base_host)))
        .collect();

    if endpoints.is_empty() {
        warn!("No market anchors found, scanning for market codes");
        endpoints = MARKET_CODE
            .captures_iter(body)
            .map(|caps| {
                Endpoint::new(format!(
                    "{}/?scope=web&setmkt={}",
                    base_host.trim_end_matches('/'),
                    &caps[1]
                ))
            })
            .collect();
    }

    endpoints
}
