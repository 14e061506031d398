// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Access to the inserted disc or a disc image.

mod cue;
#[cfg(feature = "drive")]
mod drive;
mod packs;
mod toc;

use crate::cdtext::CdText;
use std::io;
use std::path::Path;
use thiserror::Error;

pub use cue::{CueSheet, CueSheetDisc};
#[cfg(feature = "drive")]
pub use drive::DriveDisc;
pub use toc::{Toc, FRAMES_PER_SECOND, LEAD_IN_FRAMES};

/// An error while opening or reading a disc.
#[derive(Error, Debug)]
pub enum DiscError {
    /// I/O Error.
    #[error("Input/Output error ({:?})", .0)]
    Io(#[from] io::Error),
    /// The table of contents is invalid.
    #[error("invalid table of contents: {0}")]
    InvalidToc(&'static str),
    /// A CUE sheet line could not be parsed.
    #[error("malformed CUE sheet (line {line}): {reason}")]
    MalformedCueSheet {
        /// Line number (1-based).
        line: usize,
        /// What went wrong.
        reason: &'static str,
    },
    /// A CUE sheet track has no `INDEX 01`.
    #[error("track {0} has no start index")]
    MissingTrackStart(u8),
    /// The drive could not be read.
    #[cfg(feature = "drive")]
    #[error("unable to read drive: {0}")]
    Drive(#[from] cd_da_reader::CdReaderError),
    /// This build cannot read physical drives.
    #[error("no CD-ROM drive support (rebuild with the `drive` feature or pass a CUE sheet)")]
    DriveSupportDisabled,
}

/// A disc whose table of contents and CD-TEXT can be queried.
pub trait Disc {
    /// The table of contents.
    fn toc(&self) -> &Toc;

    /// CD-TEXT for the given track number, or for the whole album if `index` is `0`.
    fn cdtext(&self, index: u8) -> Option<&CdText>;

    /// Number of the first track.
    fn first_track_num(&self) -> u8 {
        self.toc().first_track_num()
    }

    /// Number of tracks on the disc.
    fn track_count(&self) -> u8 {
        self.toc().track_count()
    }
}

/// Returns `true` if the path looks like a CUE sheet.
fn is_cue_sheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("cue"))
}

/// Open the disc at the given location.
///
/// A path ending in `.cue` is opened as a CUE sheet image, everything else (including no path at
/// all, meaning the default drive) is opened as a CD-ROM drive.
///
/// # Errors
///
/// Returns an error if the disc cannot be opened or its table of contents cannot be read.
pub fn open(input: Option<&Path>) -> Result<Box<dyn Disc>, DiscError> {
    match input {
        Some(path) if is_cue_sheet(path) => {
            log::debug!("Opening CUE sheet {}", path.display());
            Ok(Box::new(CueSheetDisc::open(path)?))
        }
        device => open_drive(device),
    }
}

/// Open a CD-ROM drive, or the first drive with an audio CD if `device` is `None`.
#[cfg(feature = "drive")]
fn open_drive(device: Option<&Path>) -> Result<Box<dyn Disc>, DiscError> {
    let device = device.map(|path| path.to_string_lossy().into_owned());
    Ok(Box::new(DriveDisc::open(device.as_deref())?))
}

/// Open a CD-ROM drive.
#[cfg(not(feature = "drive"))]
fn open_drive(device: Option<&Path>) -> Result<Box<dyn Disc>, DiscError> {
    if let Some(device) = device {
        log::debug!("Cannot open {} without drive support", device.display());
    }
    Err(DiscError::DriveSupportDisabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cue_sheet() {
        assert!(is_cue_sheet(Path::new("album.cue")));
        assert!(is_cue_sheet(Path::new("/music/Album.CUE")));
        assert!(!is_cue_sheet(Path::new("/dev/cdrom")));
        assert!(!is_cue_sheet(Path::new("album.bin")));
    }

    #[cfg(not(feature = "drive"))]
    #[test]
    fn test_open_drive_without_support() {
        assert!(matches!(
            open(Some(Path::new("/dev/cdrom"))),
            Err(DiscError::DriveSupportDisabled)
        ));
        assert!(matches!(open(None), Err(DiscError::DriveSupportDisabled)));
    }

    #[cfg(feature = "drive")]
    #[test]
    fn test_open_missing_drive() {
        assert!(matches!(
            open(Some(Path::new("/nonexistent/sr0"))),
            Err(DiscError::Drive(_))
        ));
    }

    #[test]
    fn test_open_missing_cue_sheet() {
        assert!(matches!(
            open(Some(Path::new("/nonexistent/album.cue"))),
            Err(DiscError::Io(_))
        ));
    }
}
