// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Caching for CDDB entries (to not use the server unnecessarily).
//!
//! Entries are stored verbatim in xmcd format as `<cache dir>/<category>/<disc id>`.

use super::CddbCandidate;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Cache Error.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Item was not found in cache.
    #[error("Cache Miss")]
    CacheMiss,
    /// Category or disc ID cannot be used as a file name.
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
    /// I/O Error.
    #[error("Input/Output error ({:?})", .0)]
    Io(#[from] io::Error),
}

/// Returns `true` if the value is safe to use as a single path component.
fn is_valid_key(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_alphanumeric())
}

/// On-disk cache for CDDB entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CddbCache {
    /// Cache directory.
    dir: PathBuf,
}

impl CddbCache {
    /// Create a cache in the given directory. The directory is created lazily.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Path of the cache file for an entry.
    fn entry_path(&self, category: &str, disc_id: &str) -> Result<PathBuf, CacheError> {
        for key in [category, disc_id] {
            if !is_valid_key(key) {
                return Err(CacheError::InvalidKey(key.to_string()));
            }
        }
        Ok(self.dir.join(category).join(disc_id))
    }

    /// Find a cached entry for the disc ID in any category.
    ///
    /// Categories are searched in alphabetical order.
    pub fn find(&self, disc_id: &str) -> Option<CddbCandidate> {
        if !is_valid_key(disc_id) {
            return None;
        }

        let mut categories: Vec<String> = fs::read_dir(&self.dir)
            .inspect_err(|err| {
                log::debug!("Failed to list cache directory {}: {err}", self.dir.display());
            })
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(disc_id).is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        categories.sort_unstable();

        categories
            .into_iter()
            .next()
            .map(|category| CddbCandidate {
                category,
                disc_id: disc_id.to_string(),
                header: None,
            })
    }

    /// Get an entry from the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if a cache miss occurred or the cache file could not be read.
    pub fn get(&self, category: &str, disc_id: &str) -> Result<String, CacheError> {
        let path = self.entry_path(category, disc_id)?;
        let bytes = fs::read(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => CacheError::CacheMiss,
            _ => CacheError::Io(err),
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Insert an entry into the cache.
    ///
    /// The entry is written to a temporary file first, so that readers never see partial
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file could not be written.
    pub fn insert(&self, category: &str, disc_id: &str, entry: &str) -> Result<(), CacheError> {
        let path = self.entry_path(category, disc_id)?;
        let directory = self.dir.join(category);
        fs::create_dir_all(&directory)?;

        let mut temp_file = tempfile::Builder::new()
            .prefix(format!(".{disc_id}").as_str())
            .suffix(".tmp")
            .tempfile_in(&directory)?;
        temp_file.write_all(entry.as_bytes())?;
        temp_file
            .into_temp_path()
            .persist(&path)
            .map_err(|err| CacheError::Io(err.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CddbCache::new(dir.path().join("cddb"));

        assert!(matches!(
            cache.get("rock", "08025603"),
            Err(CacheError::CacheMiss)
        ));
        cache.insert("rock", "08025603", "DTITLE=Foo\n").unwrap();
        assert_eq!(cache.get("rock", "08025603").unwrap(), "DTITLE=Foo\n");

        cache.insert("rock", "08025603", "DTITLE=Bar\n").unwrap();
        assert_eq!(cache.get("rock", "08025603").unwrap(), "DTITLE=Bar\n");
    }

    #[test]
    fn test_find() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CddbCache::new(dir.path().to_path_buf());
        assert_eq!(cache.find("08025603"), None);

        cache.insert("rock", "08025603", "DTITLE=Foo\n").unwrap();
        cache.insert("misc", "08025603", "DTITLE=Foo\n").unwrap();
        cache.insert("jazz", "12345678", "DTITLE=Bar\n").unwrap();

        let candidate = cache.find("08025603").unwrap();
        assert_eq!(candidate.category, "misc");
        assert_eq!(candidate.disc_id, "08025603");
        assert_eq!(candidate.header, None);
    }

    #[test]
    fn test_find_missing_directory() {
        let cache = CddbCache::new(PathBuf::from("/nonexistent/cddb"));
        assert_eq!(cache.find("08025603"), None);
    }

    #[test]
    fn test_invalid_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CddbCache::new(dir.path().to_path_buf());
        assert!(matches!(
            cache.insert("../etc", "08025603", ""),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.get("rock", "0802/5603"),
            Err(CacheError::InvalidKey(_))
        ));
        assert_eq!(cache.find("../x"), None);
    }
}
