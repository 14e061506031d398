// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Table of contents.

use super::DiscError;

/// Number of frames (sectors) per second of audio.
pub const FRAMES_PER_SECOND: u32 = 75;

/// Number of frames before the first track (2 seconds).
pub const LEAD_IN_FRAMES: u32 = 2 * FRAMES_PER_SECOND;

/// Maximum number of tracks on an audio CD.
const MAX_TRACKS: usize = 99;

/// Table of contents of an audio CD.
///
/// All offsets are frame offsets including the lead-in, i.e. the first track of a disc usually
/// starts at frame 150.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    /// Number of the first track.
    first_track: u8,
    /// Start offset of each track. Never empty.
    offsets: Vec<u32>,
    /// Offset of the lead-out.
    leadout: u32,
}

impl Toc {
    /// Create a new table of contents.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no tracks, too many tracks, the offsets are not strictly
    /// increasing or the lead-out does not come after the last track.
    pub fn new(first_track: u8, offsets: Vec<u32>, leadout: u32) -> Result<Self, DiscError> {
        let Some(&last_offset) = offsets.last() else {
            return Err(DiscError::InvalidToc("disc has no tracks"));
        };
        if first_track == 0 {
            return Err(DiscError::InvalidToc("track numbers start at 1"));
        }
        if usize::from(first_track) + offsets.len() - 1 > MAX_TRACKS {
            return Err(DiscError::InvalidToc("too many tracks"));
        }
        if offsets.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(DiscError::InvalidToc("track offsets are not increasing"));
        }
        if leadout <= last_offset {
            return Err(DiscError::InvalidToc("lead-out precedes last track"));
        }

        Ok(Self {
            first_track,
            offsets,
            leadout,
        })
    }

    /// Number of the first track.
    pub fn first_track_num(&self) -> u8 {
        self.first_track
    }

    /// Number of tracks.
    #[expect(clippy::cast_possible_truncation)]
    pub fn track_count(&self) -> u8 {
        // Bounded by MAX_TRACKS in the constructor.
        self.offsets.len() as u8
    }

    /// Start offsets of all tracks.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Total length of the disc in seconds (counted from the start of the lead-in).
    pub fn length_secs(&self) -> u32 {
        self.leadout / FRAMES_PER_SECOND
    }

    /// Length of the track at the given position (0-based) in seconds.
    pub fn track_length_secs(&self, position: usize) -> Option<u32> {
        let offset = *self.offsets.get(position)?;
        let length = match self.offsets.get(position + 1) {
            Some(next) => (next - offset) / FRAMES_PER_SECOND,
            None => self.length_secs() - offset / FRAMES_PER_SECOND,
        };
        Some(length)
    }

    /// The FreeDB disc ID, used as key for CDDB queries.
    pub fn freedb_id(&self) -> u32 {
        let checksum: u32 = self
            .offsets
            .iter()
            .map(|offset| digit_sum(offset / FRAMES_PER_SECOND))
            .sum();
        let first_offset = self.offsets[0];
        let playing_time = self.length_secs() - first_offset / FRAMES_PER_SECOND;
        ((checksum % 0xff) << 24) | (playing_time << 8) | u32::from(self.track_count())
    }

    /// The FreeDB disc ID as 8 lowercase hex digits.
    pub fn freedb_id_string(&self) -> String {
        format!("{:08x}", self.freedb_id())
    }
}

/// Sum of the decimal digits of a number.
fn digit_sum(mut value: u32) -> u32 {
    let mut sum = 0;
    while value > 0 {
        sum += value % 10;
        value /= 10;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eleven_track_toc() -> Toc {
        Toc::new(
            1,
            vec![
                150, 44942, 61305, 72755, 96360, 130485, 147315, 164275, 190702, 205412, 220437,
            ],
            242_457,
        )
        .unwrap()
    }

    #[test]
    fn test_freedb_id() {
        let toc = eleven_track_toc();
        assert_eq!(toc.freedb_id(), 0xb40c_9e0b);
        assert_eq!(toc.freedb_id_string(), "b40c9e0b");

        let toc = Toc::new(1, vec![150, 15000, 30000], 45000).unwrap();
        assert_eq!(toc.freedb_id_string(), "08025603");
    }

    #[test]
    fn test_track_lengths() {
        let toc = eleven_track_toc();
        assert_eq!(toc.track_count(), 11);
        assert_eq!(toc.length_secs(), 3232);
        assert_eq!(toc.track_length_secs(0), Some(597));
        assert_eq!(toc.track_length_secs(9), Some(200));
        assert_eq!(toc.track_length_secs(10), Some(293));
        assert_eq!(toc.track_length_secs(11), None);
    }

    #[test]
    fn test_invalid_toc() {
        assert!(Toc::new(1, vec![], 1000).is_err());
        assert!(Toc::new(0, vec![150], 1000).is_err());
        assert!(Toc::new(1, vec![150, 150], 1000).is_err());
        assert!(Toc::new(1, vec![150, 900], 900).is_err());
        assert!(Toc::new(99, vec![150, 900], 1000).is_err());
        assert!(Toc::new(99, vec![150], 1000).is_ok());
    }

    #[test]
    fn test_digit_sum() {
        assert_eq!(digit_sum(0), 0);
        assert_eq!(digit_sum(2), 2);
        assert_eq!(digit_sum(599), 23);
    }
}
