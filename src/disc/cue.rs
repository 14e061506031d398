// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Disc images described by CUE sheets.

use super::{packs, Disc, DiscError, Toc, FRAMES_PER_SECOND, LEAD_IN_FRAMES};
use crate::cdtext::{CdText, CdTextField};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Number of bytes per frame of raw audio data.
const BYTES_PER_FRAME: u64 = 2352;

/// Add a frame count to a disc offset.
fn advance(offset: u32, frames: u32) -> Result<u32, DiscError> {
    offset
        .checked_add(frames)
        .ok_or(DiscError::InvalidToc("track offset exceeds the disc size"))
}

/// Parse a `mm:ss:ff` time into a frame count.
fn parse_msf(value: &str) -> Option<u32> {
    let (mm, rest) = value.split_once(':')?;
    let (ss, ff) = rest.split_once(':')?;

    let ff: u32 = ff.parse().ok().filter(|ff| *ff < FRAMES_PER_SECOND)?;
    let ss: u32 = ss.parse().ok().filter(|ss| *ss < 60)?;
    let mm: u32 = mm.parse().ok()?;

    mm.checked_mul(60)?
        .checked_add(ss)?
        .checked_mul(FRAMES_PER_SECOND)?
        .checked_add(ff)
}

/// Split a line into its command and the (trimmed) arguments.
fn split_command(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }

    let command = match line.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (line, ""),
    };
    Some(command)
}

/// Strip the quotes around an argument, if any.
fn unquote(arg: &str) -> &str {
    match arg.strip_prefix('"') {
        Some(rest) => rest.split_once('"').map_or(rest, |(value, _)| value),
        None => arg,
    }
}

/// A track entry in a CUE sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CueTrack {
    /// Track number.
    number: u8,
    /// Position of the data file in [`CueSheet::files`].
    file: usize,
    /// Silence inserted before the track that is not part of the data file.
    pregap: u32,
    /// Position of `INDEX 01` inside the data file.
    start: Option<u32>,
    /// CD-TEXT of this track.
    cdtext: CdText,
}

/// A parsed CUE sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueSheet {
    /// Referenced data files.
    files: Vec<String>,
    /// Album CD-TEXT (commands before the first `TRACK`).
    album: CdText,
    /// Binary CD-TEXT file named by `CDTEXTFILE`.
    cdtext_file: Option<String>,
    /// Tracks in order of appearance.
    tracks: Vec<CueTrack>,
}

impl CueSheet {
    /// Parse the text of a CUE sheet.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed `FILE`, `TRACK`, `INDEX` or `PREGAP` commands. Unknown
    /// commands are ignored.
    pub fn parse(text: &str) -> Result<Self, DiscError> {
        let mut sheet = Self::default();

        for (i, line) in text.lines().enumerate() {
            let line_number = i + 1;
            let malformed = |reason| DiscError::MalformedCueSheet {
                line: line_number,
                reason,
            };

            let line = line.trim_start_matches('\u{feff}').trim();
            let Some((command, args)) = split_command(line) else {
                continue;
            };

            match command.to_ascii_uppercase().as_str() {
                "REM" | "FLAGS" | "CATALOG" | "POSTGAP" => {
                    log::debug!("Ignoring {command} command in CUE sheet line {line_number}");
                }
                "CDTEXTFILE" => {
                    sheet.cdtext_file = Some(unquote(args).to_string());
                }
                "FILE" => {
                    let name = args
                        .rsplit_once(char::is_whitespace)
                        .map_or(args, |(name, _file_type)| name.trim());
                    sheet.files.push(unquote(name).to_string());
                }
                "TRACK" => {
                    let number = args
                        .split_whitespace()
                        .next()
                        .and_then(|number| number.parse::<u8>().ok())
                        .ok_or_else(|| malformed("invalid track number"))?;
                    let file = sheet
                        .files
                        .len()
                        .checked_sub(1)
                        .ok_or_else(|| malformed("TRACK before FILE"))?;
                    sheet.tracks.push(CueTrack {
                        number,
                        file,
                        pregap: 0,
                        start: None,
                        cdtext: CdText::default(),
                    });
                }
                "INDEX" => {
                    let mut parts = args.split_whitespace();
                    let index = parts
                        .next()
                        .and_then(|index| index.parse::<u8>().ok())
                        .ok_or_else(|| malformed("invalid index number"))?;
                    let time = parts
                        .next()
                        .and_then(parse_msf)
                        .ok_or_else(|| malformed("invalid index time"))?;
                    let track = sheet
                        .tracks
                        .last_mut()
                        .ok_or_else(|| malformed("INDEX outside of TRACK"))?;
                    if index == 1 {
                        track.start = Some(time);
                    }
                }
                "PREGAP" => {
                    let time = parse_msf(args).ok_or_else(|| malformed("invalid pregap time"))?;
                    let track = sheet
                        .tracks
                        .last_mut()
                        .ok_or_else(|| malformed("PREGAP outside of TRACK"))?;
                    track.pregap = time;
                }
                _ => match CdTextField::from_cue_command(command) {
                    Some(field) => {
                        let value = unquote(args);
                        if value.is_empty() {
                            continue;
                        }
                        let cdtext = match sheet.tracks.last_mut() {
                            Some(track) => &mut track.cdtext,
                            None => &mut sheet.album,
                        };
                        cdtext.set(field, value);
                    }
                    None => {
                        log::debug!("Ignoring unknown CUE command {command} in line {line_number}");
                    }
                },
            }
        }

        Ok(sheet)
    }

    /// Build the disc described by this CUE sheet.
    ///
    /// `file_frames` returns the length of a referenced data file in frames; it determines the
    /// offsets of tracks in subsequent files and the lead-out.
    ///
    /// # Errors
    ///
    /// Returns an error if a track has no `INDEX 01`, the track numbers are not consecutive, the
    /// resulting table of contents is invalid or `file_frames` fails.
    pub fn into_disc<F>(self, mut file_frames: F) -> Result<CueSheetDisc, DiscError>
    where
        F: FnMut(&str) -> Result<u32, DiscError>,
    {
        let first_track = self
            .tracks
            .first()
            .map(|track| track.number)
            .ok_or(DiscError::InvalidToc("disc has no tracks"))?;

        let mut offsets = Vec::with_capacity(self.tracks.len());
        let mut tracks = BTreeMap::new();
        let mut base = LEAD_IN_FRAMES;
        let mut current_file: Option<usize> = None;
        for (position, track) in self.tracks.into_iter().enumerate() {
            if usize::from(track.number) != usize::from(first_track) + position {
                return Err(DiscError::InvalidToc("track numbers are not consecutive"));
            }

            if current_file != Some(track.file) {
                if let Some(previous) = current_file {
                    base = advance(base, file_frames(&self.files[previous])?)?;
                }
                current_file = Some(track.file);
            }

            base = advance(base, track.pregap)?;
            let start = track
                .start
                .ok_or(DiscError::MissingTrackStart(track.number))?;
            offsets.push(advance(base, start)?);
            if !track.cdtext.is_empty() {
                let _previous = tracks.insert(track.number, track.cdtext);
            }
        }

        let leadout = match current_file {
            Some(file) => advance(base, file_frames(&self.files[file])?)?,
            None => return Err(DiscError::InvalidToc("disc has no tracks")),
        };

        Ok(CueSheetDisc {
            toc: Toc::new(first_track, offsets, leadout)?,
            album: Some(self.album).filter(|cdtext| !cdtext.is_empty()),
            tracks,
        })
    }
}

/// A disc image described by a CUE sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueSheetDisc {
    /// Table of contents.
    toc: Toc,
    /// Album CD-TEXT.
    album: Option<CdText>,
    /// Track CD-TEXT by track number.
    tracks: BTreeMap<u8, CdText>,
}

impl CueSheetDisc {
    /// Open a CUE sheet. Data files are looked up relative to the CUE sheet.
    ///
    /// If the sheet carries no CD-TEXT commands but names a `CDTEXTFILE`, the CD-TEXT is read
    /// from that file instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the CUE sheet or its data files cannot be read or the CUE sheet is
    /// malformed.
    pub fn open(path: &Path) -> Result<Self, DiscError> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let directory = path.parent().unwrap_or_else(|| Path::new(""));

        let mut sheet = CueSheet::parse(&text)?;
        let cdtext_file = sheet.cdtext_file.take();
        let mut disc = sheet.into_disc(|name| {
            let data_path = directory.join(name);
            let size = fs::metadata(&data_path)
                .inspect_err(|err| {
                    log::debug!("Failed to read data file {}: {err}", data_path.display());
                })?
                .len();
            u32::try_from(size / BYTES_PER_FRAME)
                .map_err(|_| DiscError::InvalidToc("data file too large"))
        })?;

        if let Some(name) = cdtext_file {
            if disc.album.is_none() && disc.tracks.is_empty() {
                let cdtext_path = directory.join(name);
                log::debug!("Reading CD-TEXT from {}", cdtext_path.display());
                disc.set_cdtext(packs::decode(&fs::read(cdtext_path)?));
            }
        }

        Ok(disc)
    }

    /// Replace the CD-TEXT with decoded packs, keyed by track number (`0` for the album).
    fn set_cdtext(&mut self, mut cdtext: BTreeMap<u8, CdText>) {
        self.album = cdtext.remove(&0);
        self.tracks = cdtext;
    }
}

impl Disc for CueSheetDisc {
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
