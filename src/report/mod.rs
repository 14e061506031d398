// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Reports about the metadata of a disc.

pub mod cddb;
pub mod cdtext;

use crate::cddb::CddbService;
use crate::disc::{Disc, DiscError};
use crate::output::Output;
use std::io::{self, Write};

/// What to report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Report album-level information.
    pub album: bool,
    /// Report the track listing.
    pub listing: bool,
    /// Query CD-TEXT.
    pub cdtext: bool,
    /// Query CDDB.
    pub cddb: bool,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// All requested sources were queried.
    Completed,
    /// The disc could not be opened, nothing was queried.
    NoDisc,
}

/// Print the report for the disc.
///
/// The XML envelope is always closed, even if the disc could not be opened.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn run<W: Write, S: CddbService>(
    output: &mut Output<W>,
    options: &ReportOptions,
    disc: Result<Box<dyn Disc>, DiscError>,
    service: &mut S,
) -> io::Result<Outcome> {
    output.prolog()?;

    let disc = match disc {
        Ok(disc) => disc,
        Err(err) => {
            log::error!("Failed to open disc: {err}");
            output.epilogue()?;
            return Ok(Outcome::NoDisc);
        }
    };
    log::debug!(
        "Disc has {} track(s) starting at track {} (FreeDB ID {})",
        disc.track_count(),
        disc.first_track_num(),
        disc.toc().freedb_id_string()
    );

    if options.cdtext && !cdtext::report(output, options, disc.as_ref())? {
        log::info!("No CD-TEXT found on disc");
    }

    if options.cddb {
        cddb::report(output, options, disc.as_ref(), service)?;
    }

    drop(disc);
    output.epilogue()?;
    Ok(Outcome::Completed)
}
