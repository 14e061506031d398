// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Report the CD-TEXT stored on the disc.

use super::ReportOptions;
use crate::cdtext::{CdText, DISPLAY_FIELD};
use crate::disc::Disc;
use crate::output::{Output, ITEM_DEPTH, QUERY_DEPTH, SECTION_DEPTH, TRACK_FIELD_DEPTH};
use std::io::{self, Write};

/// Source name used in `<query>` elements.
const SOURCE: &str = "CD-TEXT";

/// Print every present field of a record.
fn write_fields<W: Write>(output: &mut Output<W>, depth: usize, cdtext: &CdText) -> io::Result<()> {
    for (field, value) in cdtext.iter() {
        output.field(depth, field.name(), field.name(), value)?;
    }
    Ok(())
}

/// Print the CD-TEXT of the disc.
///
/// Tracks are listed from the first track number up to, but not including, the track count.
///
/// Returns `false` if the disc carries no usable CD-TEXT.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn report<W: Write>(
    output: &mut Output<W>,
    options: &ReportOptions,
    disc: &dyn Disc,
) -> io::Result<bool> {
    let Some(album) = disc
        .cdtext(0)
        .filter(|album| album.get(DISPLAY_FIELD).is_some())
    else {
        output.empty(
            QUERY_DEPTH,
            "query",
            &[("source", &SOURCE), ("num_matches", &0)],
        )?;
        return Ok(false);
    };

    output.open(
        QUERY_DEPTH,
        "query",
        &[("source", &SOURCE), ("match", &1), ("num_matches", &1)],
    )?;

    if options.album {
        output.open(SECTION_DEPTH, "albuminfo", &[])?;
        write_fields(output, ITEM_DEPTH, album)?;
        output.close(SECTION_DEPTH, "albuminfo")?;
    }

    if options.listing {
        output.open(SECTION_DEPTH, "tracklisting", &[])?;
        for number in disc.first_track_num()..disc.track_count() {
            let Some(cdtext) = disc.cdtext(number) else {
                continue;
            };

            if output.is_xml() {
                output.open(ITEM_DEPTH, "track", &[("number", &number)])?;
                write_fields(output, TRACK_FIELD_DEPTH, cdtext)?;
                output.close(ITEM_DEPTH, "track")?;
            } else if let Some(title) = cdtext.display_text() {
                output.plain(format_args!("{number}:{title}"))?;
            }
        }
        output.close(SECTION_DEPTH, "tracklisting")?;
    }

    output.close(QUERY_DEPTH, "query")?;
    Ok(true)
}
