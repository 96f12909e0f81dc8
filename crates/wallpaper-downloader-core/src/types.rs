use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Image formats kept on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Gif,
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Determine format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "gif" => Some(Self::Gif),
            "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Format of a path, if its extension is on the allow-list
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Locale-specific page URL enumerated from the settings page
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Image reference found in a page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredImage {
    /// Absolute URL to fetch
    pub source_url: String,

    /// Path as captured from the markup, unescaped
    pub raw_path: String,
}

/// `WIDTHxHEIGHT` pair embedded in an image name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

impl Resolution {
    pub fn area(&self) -> u128 {
        u128::from(self.width) * u128::from(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Name parts extracted from an image path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedName {
    pub logical_name: String,
    pub locale: Option<String>,
    pub resolution: Option<Resolution>,
    pub extension: String,
}

impl ResolvedName {
    /// Canonical on-disk file name
    pub fn file_name(&self) -> String {
        match &self.resolution {
            Some(res) => format!("{}_{}.{}", self.logical_name, res, self.extension),
            None => format!("{}.{}", self.logical_name, self.extension),
        }
    }
}

/// On-disk location for a resolved image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    pub path: PathBuf,
    pub resolved_name: ResolvedName,
}

impl TargetFile {
    pub fn new(directory: &Path, resolved_name: ResolvedName) -> Self {
        Self {
            path: directory.join(resolved_name.file_name()),
            resolved_name,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// One file of a duplicate group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DupMember {
    pub path: PathBuf,
    pub resolution_token: String,
}

/// Files sharing a logical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DupGroup {
    pub prefix: String,
    pub members: Vec<DupMember>,
}

impl DupGroup {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            members: Vec::with_capacity(2),
        }
    }

    pub fn add(&mut self, path: PathBuf, resolution_token: impl Into<String>) {
        self.members.push(DupMember {
            path,
            resolution_token: resolution_token.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Outcome of handling one discovered image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to this path
    Saved(PathBuf),

    /// A file with the same canonical name was already there
    AlreadyPresent(PathBuf),

    /// No name pattern matched; nothing written
    Unresolved,

    /// The response had no body; nothing written
    Empty,

    /// The image URL answered with a non-2xx status
    HttpFailure(u16),

    /// Transport or filesystem error for this image only
    Failed(String),
}

/// Counters for one batch pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub endpoints_ok: usize,
    pub endpoints_failed: usize,
    pub saved: usize,
    pub already_present: usize,
    pub unresolved: usize,
    pub empty: usize,
    pub failed_images: usize,
}

impl BatchReport {
    pub fn record(&mut self, outcome: &SaveOutcome) {
        match outcome {
            SaveOutcome::Saved(_) => self.saved += 1,
            SaveOutcome::AlreadyPresent(_) => self.already_present += 1,
            SaveOutcome::Unresolved => self.unresolved += 1,
            SaveOutcome::Empty => self.empty += 1,
            SaveOutcome::HttpFailure(_) | SaveOutcome::Failed(_) => self.failed_images += 1,
        }
    }
}
