use log::debug;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::logging::log_fs_modification;
use crate::types::{SaveOutcome, TargetFile};

/// Copy `body` into `target` unless a file of that name already exists.
///
/// Bytes go to a temporary file in the same directory first and are moved into
/// place without replacing anything, so a crash never leaves a truncated image
/// under the final name.
pub fn save_image(target: &TargetFile, body: &mut dyn Read) -> Result<SaveOutcome> {
    if target.exists() {
        debug!("Duplicate {}", target.path.display());
        return Ok(SaveOutcome::AlreadyPresent(target.path.clone()));
    }

    let directory = target.path.parent().unwrap_or_else(|| Path::new("."));
    let mut staging = NamedTempFile::new_in(directory)?;
    let written = io::copy(body, &mut staging)?;
    if written == 0 {
        debug!("Ignoring empty response for {}", target.path.display());
        return Ok(SaveOutcome::Empty);
    }
    staging.flush()?;

    match staging.persist_noclobber(&target.path) {
        Ok(_) => {
            log_fs_modification("create", &target.path, Some(&format!("{} bytes", written)));
            Ok(SaveOutcome::Saved(target.path.clone()))
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            debug!("Duplicate {} (appeared during download)", target.path.display());
            Ok(SaveOutcome::AlreadyPresent(target.path.clone()))
        }
        Err(e) => Err(Error::Io(e.error)),
    }
}
