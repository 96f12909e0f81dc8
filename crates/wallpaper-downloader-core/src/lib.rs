//! Core functionality for downloading daily wallpapers and pruning duplicates.
//!
//! This library provides the components of a single batch pass:
//! - Market endpoint enumeration from the settings page
//! - Image URL extraction and canonical file naming
//! - Sequential fetch-and-save with bounded retries
//! - Resolution duplicate detection and removal

// -- External Dependencies --
use log::{error, info};
use std::collections::BTreeSet;
use std::path::PathBuf;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, Result};
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod dedup;
pub mod enumerate;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod saver;
pub mod transport;
pub mod types;

use pipeline::Pipeline;
use transport::{Fetch, HttpTransport};

/// Summary of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub batch: BatchReport,
    pub duplicates: Vec<PathBuf>,
    pub removed: usize,
}

/// Main entry point for the download-and-prune process
pub struct WallpaperDownloader {
    config: Config,
    transport: Box<dyn Fetch>,
}

impl WallpaperDownloader {
    /// Create a new WallpaperDownloader talking HTTP through `reqwest`
    pub fn new(config: Config) -> Self {
        let transport = Box::new(HttpTransport::new(&config));
        Self::with_transport(config, transport)
    }

    /// Create a WallpaperDownloader over any transport
    pub fn with_transport(config: Config, transport: Box<dyn Fetch>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enumerate market endpoints; an empty result means "not initialized"
    pub fn enumerate(&self) -> Result<BTreeSet<Endpoint>> {
        let endpoints = match enumerate::enumerate(self.transport.as_ref(), &self.config) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                error!("Can't enumerate endpoints: {}", e);
                BTreeSet::new()
            }
        };

        if endpoints.is_empty() {
            return Err(Error::NotInitialized);
        }
        Ok(endpoints)
    }

    /// Download every image referenced from `endpoints`
    pub fn batch_download(&self, endpoints: &BTreeSet<Endpoint>) -> BatchReport {
        Pipeline::new(self.transport.as_ref(), &self.config).batch_download(endpoints)
    }

    /// Files in the output directory that have a lower-resolution twin
    pub fn find_duplicates(&self) -> Result<Vec<PathBuf>> {
        dedup::find_duplicates(&self.config.output_dir)
    }

    /// Run the full pipeline: enumerate, download, prune
    pub fn run(&self) -> Result<RunReport> {
        self.config.validate()?;

        info!("Enumerating endpoints...");
        let endpoints = self.enumerate()?;
        info!("Found {} endpoints", endpoints.len());

        let batch = self.batch_download(&endpoints);

        info!("Directory: {}", self.config.output_dir.display());
        let duplicates = self.find_duplicates()?;
        let removed = dedup::remove_files(&duplicates);

        Ok(RunReport {
            batch,
            duplicates,
            removed,
        })
    }
}
