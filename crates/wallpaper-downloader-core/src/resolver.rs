//! Canonical file names for downloaded images.
//!
//! Two named strategies are tried in order: [`NameStrategy::Full`] keeps the
//! logical name and the `WIDTHxHEIGHT` token and drops locale and suffix;
//! [`NameStrategy::NameOnly`] handles images that carry neither.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::types::{Resolution, ResolvedName};

/// Known shapes of an image name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStrategy {
    /// `{name}_{locale}{suffix}_{W}x{H}.{ext}`
    Full,

    /// `{name}.{gif|jpg|png}`
    NameOnly,
}

/// All strategies, in the order they are tried
pub static NAME_STRATEGIES: [NameStrategy; 2] = [NameStrategy::Full, NameStrategy::NameOnly];

static FULL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<name>[a-zA-Z0-9]+)_(?P<locale>[a-zA-Z\-]{3,5})*(?P<suffix>.*)_(?P<width>[0-9]+)x(?P<height>[0-9]+)\.(?P<ext>[^&]*)",
    )
    .expect("full name pattern is valid")
});

static NAME_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<name>[a-zA-Z0-9_]+)\.(?P<ext>gif|jpg|png)")
        .expect("name-only pattern is valid")
});

impl NameStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::NameOnly => "name-only",
        }
    }

    /// Apply this strategy alone
    pub fn resolve(&self, raw_path: &str) -> Option<ResolvedName> {
        match self {
            Self::Full => FULL_NAME.captures(raw_path).and_then(|caps| full_name(&caps)),
            Self::NameOnly => NAME_ONLY.captures(raw_path).map(|caps| ResolvedName {
                logical_name: caps["name"].to_string(),
                locale: None,
                resolution: None,
                extension: caps["ext"].to_string(),
            }),
        }
    }
}

fn full_name(caps: &Captures<'_>) -> Option<ResolvedName> {
    let extension = caps["ext"].to_string();
    if extension.is_empty() {
        return None;
    }

    // Digit runs too long for u64 are treated as no match
    let resolution = Resolution {
        width: caps["width"].parse().ok()?,
        height: caps["height"].parse().ok()?,
    };

    Some(ResolvedName {
        logical_name: caps["name"].to_string(),
        locale: caps.name("locale").map(|m| m.as_str().to_string()),
        resolution: Some(resolution),
        extension,
    })
}

/// Resolve `raw_path` with the first strategy that matches
pub fn resolve(raw_path: &str) -> Result<ResolvedName> {
    NAME_STRATEGIES
        .iter()
        .find_map(|strategy| {
            strategy.resolve(raw_path).inspect(|resolved| {
                log::debug!(
                    "[{}] {} -> {}",
                    strategy.name(),
                    raw_path,
                    resolved.file_name()
                );
            })
        })
        .ok_or_else(|| Error::NoMatch(raw_path.to_string()))
}
