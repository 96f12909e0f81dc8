//! Per-endpoint fetch, parse and save.
//!
//! Endpoints and images are handled one at a time. A page that cannot be
//! fetched or read is retried a bounded number of times; anything that goes
//! wrong with a single image is logged and counted, never propagated.

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::extract_image_urls;
use crate::resolver::resolve;
use crate::retry::retry;
use crate::saver::save_image;
use crate::transport::{Fetch, FetchOutcome, Timeouts};
use crate::types::{BatchReport, DiscoveredImage, Endpoint, SaveOutcome, TargetFile};

/// Page fetch result that is not worth retrying
enum Page {
    Body(String),
    Rejected(u16),
}

pub struct Pipeline<'a> {
    fetch: &'a dyn Fetch,
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(fetch: &'a dyn Fetch, config: &'a Config) -> Self {
        Self { fetch, config }
    }

    /// Visit every endpoint in order and save the images they reference
    pub fn batch_download(&self, endpoints: &BTreeSet<Endpoint>) -> BatchReport {
        let mut report = BatchReport::default();

        let progress = ProgressBar::new(endpoints.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        for endpoint in endpoints {
            progress.set_message(endpoint.to_string());
            match self.download_endpoint(endpoint) {
                Ok(outcomes) => {
                    report.endpoints_ok += 1;
                    outcomes.iter().for_each(|outcome| report.record(outcome));
                }
                Err(e) => {
                    report.endpoints_failed += 1;
                    error!("Giving up on {}: {}", endpoint, e);
                }
            }
            progress.inc(1);
        }

        progress.finish_with_message(format!(
            "{} saved, {} already present",
            report.saved, report.already_present
        ));
        info!("Batch finished: {:?}", report);
        report
    }

    /// Fetch one endpoint (with retries) and handle every image it lists.
    ///
    /// Errors only when the page itself could not be obtained.
    pub fn download_endpoint(&self, endpoint: &Endpoint) -> Result<Vec<SaveOutcome>> {
        info!("Downloading image from {}", endpoint);

        let page = retry(self.config.max_attempts, |attempt| {
            debug!("Attempt {} for {}", attempt, endpoint);
            self.fetch_page(endpoint)
        })?;

        let body = match page {
            Page::Body(body) => body,
            Page::Rejected(status) => {
                return Err(Error::Transport(format!(
                    "{} answered with status {}",
                    endpoint, status
                )))
            }
        };

        let outcomes = extract_image_urls(&body, &self.config.base_host)
            .map(|image| {
                self.download_image(&image).unwrap_or_else(|e| {
                    warn!("Failed to download {}: {}", image.source_url, e);
                    SaveOutcome::Failed(e.to_string())
                })
            })
            .collect::<Vec<_>>();

        if outcomes.is_empty() {
            warn!("No images found on {}", endpoint);
        }
        Ok(outcomes)
    }

    fn fetch_page(&self, endpoint: &Endpoint) -> Result<Page> {
        let timeouts = Timeouts::new(self.config.connect_timeout(), self.config.page_read_timeout());
        match self.fetch.fetch(endpoint.as_str(), timeouts)? {
            FetchOutcome::Success(response) => Ok(Page::Body(response.read_text()?)),
            FetchOutcome::Failure(response) => Ok(Page::Rejected(response.log_failure())),
        }
    }

    /// Fetch and save one image.
    ///
    /// When the name can be resolved from the markup path, an existing file
    /// short-circuits before any request is made. Otherwise the name is taken
    /// from the final response URL and existence is checked at save time.
    pub fn download_image(&self, image: &DiscoveredImage) -> Result<SaveOutcome> {
        let directory = &self.config.output_dir;

        let known_target = match resolve(&image.raw_path) {
            Ok(name) => {
                let target = TargetFile::new(directory, name);
                if target.exists() {
                    info!("Duplicate {}", target.path.display());
                    return Ok(SaveOutcome::AlreadyPresent(target.path));
                }
                Some(target)
            }
            Err(_) => {
                debug!("Name of {} unknown until fetched", image.raw_path);
                None
            }
        };

        let timeouts = Timeouts::new(self.config.connect_timeout(), self.config.image_read_timeout());
        let mut response = match self.fetch.fetch(&image.source_url, timeouts)? {
            FetchOutcome::Success(response) => response,
            FetchOutcome::Failure(response) => {
                return Ok(SaveOutcome::HttpFailure(response.log_failure()))
            }
        };

        let target = match known_target {
            Some(target) => target,
            None => match resolve(&response.url) {
                Ok(name) => TargetFile::new(directory, name),
                Err(e) => {
                    warn!("Skipping {}: {}", image.source_url, e);
                    return Ok(SaveOutcome::Unresolved);
                }
            },
        };

        info!("Saving {}", target.path.display());
        save_image(&target, &mut response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FetchResponse;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// Serves canned bodies by URL and records every request
    #[derive(Default)]
    struct CannedFetch {
        pages: HashMap<String, (u16, String, Vec<u8>)>,
        requests: RefCell<Vec<String>>,
    }

    impl CannedFetch {
        fn with(self, url: &str, status: u16, body: &[u8]) -> Self {
            self.redirected(url, url, status, body)
        }

        /// Answer `url` as if the server had redirected to `final_url`
        fn redirected(mut self, url: &str, final_url: &str, status: u16, body: &[u8]) -> Self {
            self.pages
                .insert(url.to_string(), (status, final_url.to_string(), body.to_vec()));
            self
        }

        fn requests_for(&self, url: &str) -> usize {
            self.requests.borrow().iter().filter(|u| *u == url).count()
        }
    }

    impl Fetch for CannedFetch {
        fn fetch(&self, url: &str, _timeouts: Timeouts) -> Result<FetchOutcome> {
            self.requests.borrow_mut().push(url.to_string());
            match self.pages.get(url) {
                Some((status, final_url, body)) => Ok(FetchOutcome::from_response(
                    FetchResponse::from_bytes(*status, final_url.as_str(), body.clone()),
                )),
                None => Err(Error::Transport(format!("connect timed out: {}", url))),
            }
        }
    }

    fn config_for(dir: &std::path::Path) -> Config {
        Config::default().with_output_dir(dir)
    }

    const PAGE: &str = "http://www.bing.com/?setmkt=en-US";
    const IMAGE: &str = "http://www.bing.com/az/Heron_EN-US123_1920x1080.jpg";

    #[test]
    fn test_endpoint_images_are_saved() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let fetch = CannedFetch::default()
            .with(PAGE, 200, b"background-image: url(/az/Heron_EN-US123_1920x1080.jpg);")
            .with(IMAGE, 200, b"JPEG");

        let outcomes = Pipeline::new(&fetch, &config)
            .download_endpoint(&Endpoint::new(PAGE))
            .unwrap();

        let expected = dir.path().join("Heron_1920x1080.jpg");
        assert_eq!(outcomes, vec![SaveOutcome::Saved(expected.clone())]);
        assert_eq!(std::fs::read(expected).unwrap(), b"JPEG");
    }

    #[test]
    fn test_existing_image_is_not_fetched() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Heron_1920x1080.jpg"), b"OLD").unwrap();
        let config = config_for(dir.path());
        let fetch = CannedFetch::default()
            .with(PAGE, 200, b"background-image: url(/az/Heron_EN-US123_1920x1080.jpg);")
            .with(IMAGE, 200, b"NEW");

        let outcomes = Pipeline::new(&fetch, &config)
            .download_endpoint(&Endpoint::new(PAGE))
            .unwrap();

        assert!(matches!(outcomes.as_slice(), [SaveOutcome::AlreadyPresent(_)]));
        assert_eq!(fetch.requests_for(IMAGE), 0);
    }

    #[test]
    fn test_unresolvable_image_writes_nothing() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let url = "http://www.bing.com/th?id=opaque";
        let fetch = CannedFetch::default()
            .with(PAGE, 200, b"background-image: url(/th?id=opaque);")
            .with(url, 200, b"BYTES");

        let outcomes = Pipeline::new(&fetch, &config)
            .download_endpoint(&Endpoint::new(PAGE))
            .unwrap();

        assert_eq!(outcomes, vec![SaveOutcome::Unresolved]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_endpoint_retried_three_times_then_abandoned() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let fetch = CannedFetch::default();

        let result = Pipeline::new(&fetch, &config).download_endpoint(&Endpoint::new(PAGE));

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(fetch.requests_for(PAGE), 3);
    }

    #[test]
    fn test_rejected_page_is_not_retried() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let fetch = CannedFetch::default().with(PAGE, 503, b"busy");

        let result = Pipeline::new(&fetch, &config).download_endpoint(&Endpoint::new(PAGE));

        assert!(result.is_err());
        assert_eq!(fetch.requests_for(PAGE), 1);
    }

    #[test]
    fn test_image_failure_does_not_fail_endpoint() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let fetch = CannedFetch::default()
            .with(
                PAGE,
                200,
                b"background-image: url(/a/Gone_EN-US1_10x10.jpg); background-image: url(/a/Kept_EN-US1_20x20.jpg);",
            )
            .with("http://www.bing.com/a/Kept_EN-US1_20x20.jpg", 200, b"OK");

        let outcomes = Pipeline::new(&fetch, &config)
            .download_endpoint(&Endpoint::new(PAGE))
            .unwrap();

        assert!(matches!(outcomes[0], SaveOutcome::Failed(_)));
        assert!(matches!(outcomes[1], SaveOutcome::Saved(_)));
    }

    const OPAQUE: &str = "http://www.bing.com/th?id=opaque";
    const REDIRECTED: &str = "http://www.bing.com/img/Heron_EN-US1_1920x1080.jpg";

    #[test]
    fn test_unresolved_path_takes_name_from_final_url() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let fetch = CannedFetch::default()
            .with(PAGE, 200, b"background-image: url(/th?id=opaque);")
            .redirected(OPAQUE, REDIRECTED, 200, b"JPEG");

        let outcomes = Pipeline::new(&fetch, &config)
            .download_endpoint(&Endpoint::new(PAGE))
            .unwrap();

        let expected = dir.path().join("Heron_1920x1080.jpg");
        assert_eq!(outcomes, vec![SaveOutcome::Saved(expected.clone())]);
        assert_eq!(std::fs::read(expected).unwrap(), b"JPEG");
    }

    #[test]
    fn test_redirected_name_already_present_is_kept() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("Heron_1920x1080.jpg");
        std::fs::write(&existing, b"OLD").unwrap();
        let config = config_for(dir.path());
        let fetch = CannedFetch::default()
            .with(PAGE, 200, b"background-image: url(/th?id=opaque);")
            .redirected(OPAQUE, REDIRECTED, 200, b"NEW");

        let outcomes = Pipeline::new(&fetch, &config)
            .download_endpoint(&Endpoint::new(PAGE))
            .unwrap();

        assert_eq!(outcomes, vec![SaveOutcome::AlreadyPresent(existing.clone())]);
        assert_eq!(std::fs::read(existing).unwrap(), b"OLD");
        assert_eq!(fetch.requests_for(OPAQUE), 1);
    }
}
