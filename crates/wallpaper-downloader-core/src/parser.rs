//! Image URL extraction from market page bodies.
//!
//! The page format has changed over time, so extraction is a prioritized
//! list of named strategies. A new page shape is handled by adding a
//! strategy, not by replacing one.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::types::DiscoveredImage;

/// Known shapes of an image reference inside a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageUrlStrategy {
    /// `background-image: url(/th?id=...)` in inline CSS
    BackgroundImage,

    /// `g_img={url: '...'` or `"Url":"..."` in embedded script data
    EmbeddedJson,
}

/// All strategies, in the order they are tried
pub static IMAGE_URL_STRATEGIES: [ImageUrlStrategy; 2] = [
    ImageUrlStrategy::BackgroundImage,
    ImageUrlStrategy::EmbeddedJson,
];

static BACKGROUND_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"background-image:\s*url\(\s*['"]?(?P<url>[^)'"]+)['"]?\s*\)"#)
        .expect("background-image pattern is valid")
});

static EMBEDDED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"g_img=\{\s*url\s*:\s*['"](?P<url>[^'"]+)['"]|"[Uu]rl"\s*:\s*"(?P<json>[^"]+\.(?:jpg|png|gif)[^"]*)""#)
        .expect("embedded JSON pattern is valid")
});

impl ImageUrlStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BackgroundImage => "background-image",
            Self::EmbeddedJson => "embedded-json",
        }
    }

    fn regex(&self) -> &'static Regex {
        match self {
            Self::BackgroundImage => &BACKGROUND_IMAGE,
            Self::EmbeddedJson => &EMBEDDED_JSON,
        }
    }

    /// Raw captured paths, in document order
    pub fn captures<'a>(&self, body: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let strategy = *self;
        self.regex().captures_iter(body).filter_map(move |caps| {
            let path = caps
                .name("url")
                .or_else(|| caps.name("json"))
                .map(|m| m.as_str())?;
            debug!("[{}] matched {}", strategy.name(), path);
            Some(path)
        })
    }
}

/// Undo the escaping found in markup and script literals
pub fn unescape_path(path: &str) -> String {
    path.trim()
        .replace("\\u0026", "&")
        .replace("&amp;", "&")
        .replace("\\/", "/")
}

/// Turn a captured path into an absolute URL
pub fn absolutize(path: &str, base_host: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else if let Some(rest) = path.strip_prefix("//") {
        let scheme = base_host.split("://").next().unwrap_or("http");
        format!("{}://{}", scheme, rest)
    } else {
        let base = base_host.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

/// Lazily extract image references from `body`.
///
/// Strategies run in priority order; a URL found by more than one is yielded once.
pub fn extract_image_urls<'a>(
    body: &'a str,
    base_host: &'a str,
) -> impl Iterator<Item = DiscoveredImage> + 'a {
    let mut seen = HashSet::new();
    IMAGE_URL_STRATEGIES
        .iter()
        .flat_map(move |strategy| strategy.captures(body))
        .filter_map(move |captured| {
            let raw_path = unescape_path(captured);
            if raw_path.is_empty() {
                return None;
            }
            let source_url = absolutize(&raw_path, base_host);
            if !seen.insert(source_url.clone()) {
                return None;
            }
            Some(DiscoveredImage {
                source_url,
                raw_path,
            })
        })
}
