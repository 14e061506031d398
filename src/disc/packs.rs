// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Binary CD-TEXT packs, as stored in the lead-in of a disc or in a `CDTEXTFILE`.
//!
//! Only the first block (language) with single-byte characters is decoded. Text is read as
//! ISO 8859-1.

use crate::cdtext::{CdText, CdTextField};
use cdtext::{CDText, CDTextPackType, CDTextTrackNumber};
use std::collections::BTreeMap;

/// Size of a single pack.
const PACK_SIZE: usize = 18;

/// Size of the header in front of the packs in a `READ TOC/PMA/ATIP` response.
const HEADER_SIZE: usize = 4;

/// Size of the binary genre code in front of the genre text.
const GENRE_CODE_SIZE: usize = 2;

/// Highest track number.
const MAX_TRACK: u8 = 99;

/// Text of consecutive packs of the same type.
#[derive(Debug)]
struct Run {
    /// Pack type.
    pack_type: CDTextPackType,
    /// Track the first string belongs to (`0` for the album).
    first_track: u8,
    /// Concatenated payloads.
    text: Vec<u8>,
}

/// Field that the text of a pack type is stored in.
fn field(pack_type: CDTextPackType, track: u8) -> Option<CdTextField> {
    let field = match pack_type {
        CDTextPackType::Title => CdTextField::Title,
        CDTextPackType::Performers => CdTextField::Performer,
        CDTextPackType::Songwriters => CdTextField::Songwriter,
        CDTextPackType::Composers => CdTextField::Composer,
        CDTextPackType::Arrangers => CdTextField::Arranger,
        CDTextPackType::Message => CdTextField::Message,
        CDTextPackType::DiscID => CdTextField::DiscId,
        CDTextPackType::Genre => CdTextField::Genre,
        CDTextPackType::Code if track == 0 => CdTextField::UpcEan,
        CDTextPackType::Code => CdTextField::Isrc,
        CDTextPackType::TOC
        | CDTextPackType::AdditionalTOC
        | CDTextPackType::ClosedInfo
        | CDTextPackType::BlockSizeInfo => return None,
    };
    Some(field)
}

/// Decode ISO 8859-1 text.
fn latin1(text: &[u8]) -> String {
    text.iter().copied().map(char::from).collect()
}

/// Decode raw CD-TEXT packs into records keyed by track number (`0` for the album).
///
/// A leading `READ TOC/PMA/ATIP` header and trailing partial packs are skipped. Packs of unknown
/// type are ignored.
pub fn decode(data: &[u8]) -> BTreeMap<u8, CdText> {
    let data = if data.len() % PACK_SIZE >= HEADER_SIZE {
        &data[HEADER_SIZE..]
    } else {
        data
    };
    let data = &data[..data.len() - data.len() % PACK_SIZE];

    let mut runs: Vec<Run> = Vec::new();
    for pack in CDText::from_data(data).iter_pack_chunks().flatten() {
        if pack.block_number != 0 || pack.is_double_byte_characters {
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.pack_type == pack.pack_type => {
                run.text.extend_from_slice(&pack.payload);
            }
            _ => runs.push(Run {
                pack_type: pack.pack_type,
                first_track: match pack.track_number {
                    CDTextTrackNumber::WholeAlbum => 0,
                    CDTextTrackNumber::Track(number) => number,
                },
                text: pack.payload.to_vec(),
            }),
        }
    }

    let mut records: BTreeMap<u8, CdText> = BTreeMap::new();
    for run in runs {
        let text = if run.pack_type == CDTextPackType::Genre {
            run.text.get(GENRE_CODE_SIZE..).unwrap_or_default()
        } else {
            run.text.as_slice()
        };

        // A single tab repeats the string of the previous track.
        let mut previous: Option<String> = None;
        for (track, value) in (run.first_track..=MAX_TRACK).zip(text.split(|byte| *byte == 0)) {
            let Some(field) = field(run.pack_type, track) else {
                break;
            };
            let value = match value {
                b"\t" => previous.clone(),
                b"" => None,
                value => Some(latin1(value)),
            };
            if let Some(value) = value {
                records.entry(track).or_default().set(field, value.as_str());
                previous = Some(value);
            }
        }
    }

    records
}
