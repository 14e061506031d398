// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Physical CD-ROM drives.
//!
//! The table of contents is read with `cd-da-reader`. CD-TEXT is read from the lead-in on Linux.

#[cfg(target_os = "linux")]
mod scsi;

use super::{Disc, DiscError, Toc, LEAD_IN_FRAMES};
use crate::cdtext::CdText;
use cd_da_reader::{CdReader, CdReaderError, DriveInfo};
use std::collections::BTreeMap;

/// A disc in a physical CD-ROM drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveDisc {
    /// Table of contents.
    toc: Toc,
    /// Album CD-TEXT.
    album: Option<CdText>,
    /// Track CD-TEXT keyed by track number.
    tracks: BTreeMap<u8, CdText>,
}

/// First drive that holds an audio CD.
fn pick_drive(drives: &[DriveInfo]) -> Option<&str> {
    drives
        .iter()
        .find(|drive| drive.has_audio_cd)
        .map(|drive| drive.path.as_str())
}

/// Path of the default drive.
fn default_device() -> Result<String, CdReaderError> {
    let drives = CdReader::list_drives()?;
    log::debug!("Found {} drive(s)", drives.len());
    pick_drive(&drives)
        .map(ToString::to_string)
        .ok_or(CdReaderError::NoUsableDrive)
}

/// Convert a drive TOC (logical block addresses) into frame offsets.
fn toc_from_drive(toc: &cd_da_reader::Toc) -> Result<Toc, DiscError> {
    let frames = |lba: u32| {
        lba.checked_add(LEAD_IN_FRAMES)
            .ok_or(DiscError::InvalidToc("track offset exceeds the disc size"))
    };
    let offsets = toc
        .tracks
        .iter()
        .map(|track| frames(track.start_lba))
        .collect::<Result<Vec<u32>, DiscError>>()?;
    let first_track = toc
        .tracks
        .first()
        .map_or(toc.first_track, |track| track.number);
    Toc::new(first_track, offsets, frames(toc.leadout_lba)?)
}

/// Read and decode the CD-TEXT of the disc in the drive, keyed by track number.
#[cfg(target_os = "linux")]
fn read_cdtext(device: &str) -> BTreeMap<u8, CdText> {
    match scsi::read_cdtext(device) {
        Ok(data) => super::packs::decode(&data),
        Err(err) => {
            log::debug!("No CD-TEXT on {device}: {err}");
            BTreeMap::new()
        }
    }
}

/// Read and decode the CD-TEXT of the disc in the drive, keyed by track number.
#[cfg(not(target_os = "linux"))]
fn read_cdtext(device: &str) -> BTreeMap<u8, CdText> {
    log::debug!("Reading CD-TEXT from {device} is not supported on this platform");
    BTreeMap::new()
}

impl DriveDisc {
    /// Read the table of contents and CD-TEXT from the given device, or the first drive with an
    /// audio CD if `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no disc or the drive cannot be read. A disc without CD-TEXT
    /// is not an error.
    pub fn open(device: Option<&str>) -> Result<Self, DiscError> {
        let device = match device {
            Some(device) => device.to_string(),
            None => default_device()?,
        };
        log::debug!("Reading table of contents from {device}");

        let toc = toc_from_drive(&CdReader::open_path(&device)?.read_toc()?)?;
        let mut cdtext = read_cdtext(&device);
        Ok(Self {
            toc,
            album: cdtext.remove(&0),
            tracks: cdtext,
        })
    }
}

impl Disc for DriveDisc {
    fn toc(&self) -> &Toc {
        &self.toc
    }

    fn cdtext(&self, index: u8) -> Option<&CdText> {
        if index == 0 {
            self.album.as_ref()
        } else {
            self.tracks.get(&index)
        }
    }
}
