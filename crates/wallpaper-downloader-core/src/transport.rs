//! Blocking HTTP GET with proxy support and explicit timeouts.
//!
//! Every call produces a [`FetchOutcome`]: `Success` for 2xx statuses,
//! `Failure` for everything else. Connection-level problems (malformed URL,
//! connect or read timeout) are returned as [`Error::Transport`] and are never
//! retried here.

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::log_http_failure;

/// Connect and read limits for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Timeouts {
    pub fn new(connect: Duration, read: Duration) -> Self {
        Self { connect, read }
    }
}

/// Status, headers and the still-unread body of a response
pub struct FetchResponse {
    pub status: u16,

    /// Final URL after redirects
    pub url: String,

    pub headers: HeaderMap,

    pub body: Box<dyn Read + Send>,
}

impl FetchResponse {
    /// Response built from an in-memory body
    pub fn from_bytes(status: u16, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Box::new(std::io::Cursor::new(body.into())),
        }
    }

    /// Drain the body as text, replacing invalid UTF-8
    pub fn read_text(mut self) -> Result<String> {
        let mut bytes = Vec::new();
        self.body
            .read_to_end(&mut bytes)
            .map_err(|e| Error::Transport(format!("Failed to read body of {}: {}", self.url, e)))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Log status, headers and whatever body the server sent, then drop the connection
    pub fn log_failure(self) -> u16 {
        let Self {
            status,
            url,
            headers,
            mut body,
        } = self;
        let mut bytes = Vec::new();
        if let Err(e) = body.read_to_end(&mut bytes) {
            debug!("Could not read error body of {}: {}", url, e);
        }
        log_http_failure(&url, status, &headers, &String::from_utf8_lossy(&bytes));
        status
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Result of a completed HTTP exchange
#[derive(Debug)]
pub enum FetchOutcome {
    Success(FetchResponse),
    Failure(FetchResponse),
}

impl FetchOutcome {
    /// Partition a response by status: 200..=299 is success
    pub fn from_response(response: FetchResponse) -> Self {
        if (200..300).contains(&response.status) {
            Self::Success(response)
        } else {
            Self::Failure(response)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Anything that can GET a URL
pub trait Fetch {
    fn fetch(&self, url: &str, timeouts: Timeouts) -> Result<FetchOutcome>;
}

/// Whether `url` points at one of the hosts that must never be contacted
pub fn is_noop_url(url: &str, noop_hosts: &[String]) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.host_str().is_some_and(|host| {
            noop_hosts
                .iter()
                .any(|noop| host == noop || host.ends_with(&format!(".{}", noop)))
        }),
        Err(_) => noop_hosts.iter().any(|noop| url.contains(noop.as_str())),
    }
}

/// `reqwest` backed transport.
///
/// Clients are built on the first real request for each pair of timeouts and
/// then reused. The read limit is the blocking client's timeout, which bounds
/// each read separately rather than the whole exchange.
pub struct HttpTransport {
    proxy: Option<String>,
    noop_hosts: Vec<String>,
    clients: Mutex<HashMap<Timeouts, Client>>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            proxy: config.proxy.clone(),
            noop_hosts: config.noop_hosts.clone(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a network client has been created yet
    pub fn is_connected(&self) -> bool {
        self.clients
            .lock()
            .map(|clients| !clients.is_empty())
            .unwrap_or(true)
    }

    fn client(&self, timeouts: Timeouts) -> Result<Client> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| Error::Transport("HTTP client cache poisoned".to_string()))?;

        if let Some(client) = clients.get(&timeouts) {
            return Ok(client.clone());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.read)
            .no_proxy();

        match &self.proxy {
            Some(proxy) => {
                info!("Using proxy {}", proxy);
                builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
            }
            None => debug!("No proxy configured, connecting directly"),
        }

        let client = builder.build()?;
        clients.insert(timeouts, client.clone());
        Ok(client)
    }
}

impl Fetch for HttpTransport {
    fn fetch(&self, url: &str, timeouts: Timeouts) -> Result<FetchOutcome> {
        if is_noop_url(url, &self.noop_hosts) {
            debug!("Skipping request to no-op host: {}", url);
            return Ok(FetchOutcome::Success(FetchResponse::from_bytes(
                200,
                url,
                Vec::new(),
            )));
        }

        info!("GET {}", url);
        let response = self.client(timeouts)?.get(url).send()?;

        let status = response.status().as_u16();
        info!("Status: {}", status);

        Ok(FetchOutcome::from_response(FetchResponse {
            status,
            url: response.url().to_string(),
            headers: response.headers().clone(),
            body: Box::new(response),
        }))
    }
}
