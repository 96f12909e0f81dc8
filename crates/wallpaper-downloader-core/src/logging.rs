use log::{error, info, warn};
use reqwest::header::HeaderMap;
use std::path::Path;

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "WALLPAPER_DOWNLOADER_LOG";

/// Initialize the logger with timestamp, log level, and module path.
/// The filter comes from `WALLPAPER_DOWNLOADER_LOG` and defaults to `info`.
pub fn init_logger() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV_VAR, "info"))
        .format_timestamp_secs()
        .format_module_path(true)
        .try_init()
        .map_err(|e| format!("Failed to initialize logger: {}", e))?;

    info!("Wallpaper downloader started");
    Ok(())
}

/// Log file operation that failed
pub fn log_file_error(path: &Path, operation: &str, error: &dyn std::error::Error) {
    error!(
        "File operation failed - Operation: {}, Path: {}, Error: {}",
        operation,
        path.display(),
        error
    );
}

/// Log file system modification
pub fn log_fs_modification(operation: &str, path: &Path, details: Option<&str>) {
    let details_str = details.unwrap_or("");
    info!(
        "FS CHANGE - Operation: {}, Path: {}{}",
        operation,
        path.display(),
        if details_str.is_empty() {
            "".to_string()
        } else {
            format!(", Details: {}", details_str)
        }
    );
}

/// Log a non-2xx response with whatever the server sent back
pub fn log_http_failure(url: &str, status: u16, headers: &HeaderMap, body: &str) {
    warn!("HTTP failure - Status: {}, Url: {}", status, url);
    warn!("Headers: {:?}", headers);
    if !body.is_empty() {
        warn!("Body: {}", body);
    }
}
