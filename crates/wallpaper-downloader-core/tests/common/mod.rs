#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use wallpaper_downloader_core::transport::{Fetch, FetchOutcome, FetchResponse, Timeouts};
use wallpaper_downloader_core::{Config, Error, Result};

pub const BASE: &str = "http://www.bing.com";
pub const SETTINGS: &str = "http://www.bing.com/account/general?FORM=O2HV46";

/// Serves canned responses by URL. Clones share the same script and request
/// log, so a handle can be kept after the stub is boxed into a downloader.
#[derive(Clone, Default)]
pub struct ScriptedFetch {
    responses: Rc<RefCell<HashMap<String, (u16, String, Vec<u8>)>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl ScriptedFetch {
    pub fn respond(&self, url: &str, status: u16, body: &[u8]) -> &Self {
        self.respond_redirected(url, url, status, body)
    }

    /// Answer `url` with a response whose final URL is `final_url`
    pub fn respond_redirected(&self, url: &str, final_url: &str, status: u16, body: &[u8]) -> &Self {
        self.responses.borrow_mut().insert(
            url.to_string(),
            (status, final_url.to_string(), body.to_vec()),
        );
        self
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }

    pub fn total_requests(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Fetch for ScriptedFetch {
    fn fetch(&self, url: &str, _timeouts: Timeouts) -> Result<FetchOutcome> {
        self.requests.borrow_mut().push(url.to_string());
        match self.responses.borrow().get(url) {
            Some((status, final_url, body)) => Ok(FetchOutcome::from_response(
                FetchResponse::from_bytes(*status, final_url.as_str(), body.clone()),
            )),
            None => Err(Error::Transport(format!("connection refused: {}", url))),
        }
    }
}

pub fn config_for(dir: &Path) -> Config {
    Config::default().with_output_dir(dir)
}

/// Settings page linking to the given market codes
pub fn settings_page(markets: &[&str]) -> String {
    let anchors: String = markets
        .iter()
        .map(|code| format!(r#"<li><a href="/?setmkt={}&amp;setlang=en">{}</a></li>"#, code, code))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", anchors)
}

/// Market page whose background references `path`
pub fn market_page(path: &str) -> String {
    format!(
        r#"<html><body><div id="bgDiv" style="background-image: url({});"></div></body></html>"#,
        path
    )
}

pub fn create_file(dir: &Path, file_name: &str) -> PathBuf {
    let file_path = dir.join(file_name);
    let mut file = File::create(&file_path).unwrap();
    file.write_all(b"DUMMY IMAGE DATA").unwrap();
    file_path
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
