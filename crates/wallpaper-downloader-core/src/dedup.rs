//! Resolution duplicate detection.
//!
//! Files are grouped by the logical name before the first `_` or `.`; the next
//! token is read as a `WIDTHxHEIGHT` descriptor. Within each group the member
//! with the smallest area is kept and every other member with a readable
//! descriptor is reported for deletion.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::validate_output_dir;
use crate::error::Result;
use crate::logging::{log_file_error, log_fs_modification};
use crate::types::{DupGroup, DupMember, ImageFormat, Resolution};

/// Files in `directory` that have a lower-resolution twin and can be deleted
pub fn find_duplicates(directory: &Path) -> Result<Vec<PathBuf>> {
    let groups = group_images(directory)?;

    let duplicates: Vec<PathBuf> = groups
        .values()
        .flat_map(|group| {
            deletion_candidates(group)
                .into_iter()
                .map(|member| member.path.clone())
        })
        .collect();

    info!(
        "Found {} duplicates in {} groups under {}",
        duplicates.len(),
        groups.len(),
        directory.display()
    );
    Ok(duplicates)
}

/// Group the images directly inside `directory` by logical name
pub fn group_images(directory: &Path) -> Result<BTreeMap<String, DupGroup>> {
    validate_output_dir(directory)?;

    let mut groups: BTreeMap<String, DupGroup> = BTreeMap::new();

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if ImageFormat::from_path(path).is_none() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let tokens = split_file_name(file_name);
        if tokens.len() < 3 {
            debug!("Skipping unparseable file name {}", file_name);
            continue;
        }

        groups
            .entry(tokens[0].to_string())
            .or_insert_with(|| DupGroup::new(tokens[0]))
            .add(path.to_path_buf(), tokens[1]);
    }

    Ok(groups)
}

/// Split on `_` and `.`, dropping empty tokens
pub fn split_file_name(file_name: &str) -> Vec<&str> {
    file_name
        .split(['_', '.'])
        .filter(|token| !token.is_empty())
        .collect()
}

/// Evaluate a `WIDTHxHEIGHT` descriptor as the product `WIDTH*HEIGHT`
pub fn resolution_area(token: &str) -> Option<u128> {
    let expression = token.to_lowercase().replace('x', "*");
    let mut factors = expression.split('*');

    let resolution = Resolution {
        width: factors.next()?.trim().parse().ok()?,
        height: factors.next()?.trim().parse().ok()?,
    };
    if factors.next().is_some() {
        return None;
    }

    Some(resolution.area())
}

/// Members of `group` to delete.
///
/// Empty unless at least two members have a readable descriptor. The
/// smallest area survives; ties go to the lexicographically smallest file name.
pub fn deletion_candidates(group: &DupGroup) -> Vec<&DupMember> {
    if group.len() < 2 {
        return Vec::new();
    }

    let mut measured: Vec<(u128, &DupMember)> = group
        .members
        .iter()
        .filter_map(|member| match resolution_area(&member.resolution_token) {
            Some(area) => Some((area, member)),
            None => {
                warn!(
                    "[{}] {} :: not a WIDTHxHEIGHT resolution",
                    group.prefix, member.resolution_token
                );
                None
            }
        })
        .collect();

    if measured.len() < 2 {
        debug!("[{}] fewer than two comparable resolutions, keeping all", group.prefix);
        return Vec::new();
    }

    measured.sort_by(|(a_area, a), (b_area, b)| {
        a_area
            .cmp(b_area)
            .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
    });

    let (_, keep) = measured.remove(0);
    debug!("[{}] keeping {}", group.prefix, keep.path.display());

    measured.into_iter().map(|(_, member)| member).collect()
}

/// Delete `paths`, logging each change. Returns how many were removed.
pub fn remove_files(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        if !path.is_file() {
            debug!("Not deleting {}: no longer a file", path.display());
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                log_fs_modification("delete", path, Some("lower resolution copy kept"));
                removed += 1;
            }
            Err(e) => log_file_error(path, "delete", &e),
        }
    }
    removed
}
