// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Report the matches of a CDDB query.

use super::ReportOptions;
use crate::cddb::{CddbDisc, CddbService, CddbTrack};
use crate::disc::Disc;
use crate::output::{Output, ITEM_DEPTH, QUERY_DEPTH, SECTION_DEPTH, TRACK_FIELD_DEPTH};
use std::borrow::Cow;
use std::io::{self, Write};

/// Source name used in `<query>` elements.
const SOURCE: &str = "CDDB";

/// Printed for a track without title in plain mode.
const NULL_TITLE: &str = "(null)";

/// Album-level fields of a CDDB match, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlbumField {
    /// Album title.
    Title,
    /// Album artist.
    Artist,
    /// Free-text genre.
    Genre,
    /// CDDB category.
    Category,
    /// Release year.
    Year,
    /// Extended disc data.
    ExtData,
}

impl AlbumField {
    /// All fields, in output order.
    const ALL: [AlbumField; 6] = [
        Self::Title,
        Self::Artist,
        Self::Genre,
        Self::Category,
        Self::Year,
        Self::ExtData,
    ];

    /// XML tag name.
    fn tag(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Artist => "artist",
            Self::Genre => "genre",
            Self::Category => "category",
            Self::Year => "year",
            Self::ExtData => "extra_data",
        }
    }

    /// Plain text label.
    fn label(self) -> &'static str {
        match self {
            Self::Title => "TITLE",
            Self::Artist => "ARTIST",
            Self::Genre => "GENRE",
            Self::Category => "CATEGORY",
            Self::Year => "YEAR",
            Self::ExtData => "EXTDATA",
        }
    }

    /// Value of this field, if present.
    fn value(self, disc: &CddbDisc) -> Option<Cow<'_, str>> {
        match self {
            Self::Title => text(&disc.title),
            Self::Artist => text(&disc.artist),
            Self::Genre => text(&disc.genre),
            Self::Category => Some(Cow::Borrowed(disc.category.as_str()))
                .filter(|category| !category.is_empty()),
            Self::Year => (disc.year != 0).then(|| Cow::Owned(disc.year.to_string())),
            Self::ExtData => text(&disc.ext_data),
        }
    }
}

/// Borrow an optional text value.
fn text(value: &Option<String>) -> Option<Cow<'_, str>> {
    value.as_deref().map(Cow::Borrowed)
}

/// Print a single track.
fn write_track<W: Write>(output: &mut Output<W>, track: &CddbTrack) -> io::Result<()> {
    if !output.is_xml() {
        let title = track.title.as_deref().unwrap_or(NULL_TITLE);
        return output.plain(format_args!("{}:{title}", track.number));
    }

    output.open(ITEM_DEPTH, "track", &[("number", &track.number)])?;
    if track.length != 0 {
        output.field(TRACK_FIELD_DEPTH, "length", "LENGTH", track.length)?;
    }
    let text_fields = [
        ("title", "TITLE", &track.title),
        ("artist", "ARTIST", &track.artist),
        ("extra_data", "EXTDATA", &track.ext_data),
    ];
    for (tag, label, value) in text_fields {
        if let Some(value) = value {
            output.field(TRACK_FIELD_DEPTH, tag, label, value)?;
        }
    }
    output.close(ITEM_DEPTH, "track")
}

/// Print a single match.
fn write_match<W: Write>(
    output: &mut Output<W>,
    options: &ReportOptions,
    disc: &CddbDisc,
    number: usize,
    num_matches: usize,
) -> io::Result<()> {
    output.open(
        QUERY_DEPTH,
        "query",
        &[
            ("source", &SOURCE),
            ("match", &number),
            ("num_matches", &num_matches),
        ],
    )?;

    if options.album {
        output.open(SECTION_DEPTH, "albuminfo", &[])?;
        for field in AlbumField::ALL {
            if let Some(value) = field.value(disc) {
                output.field(ITEM_DEPTH, field.tag(), field.label(), value)?;
            }
        }
        output.close(SECTION_DEPTH, "albuminfo")?;
    }

    if options.listing {
        output.open(SECTION_DEPTH, "tracklisting", &[])?;
        for track in &disc.tracks {
            write_track(output, track)?;
        }
        output.close(SECTION_DEPTH, "tracklisting")?;
    }

    output.close(QUERY_DEPTH, "query")
}

/// Query CDDB for the disc and print every match.
///
/// CDDB errors are printed as part of the output and never abort the report.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn report<W: Write, S: CddbService>(
    output: &mut Output<W>,
    options: &ReportOptions,
    disc: &dyn Disc,
    service: &mut S,
) -> io::Result<()> {
    let toc = disc.toc();
    let matches = match service.matches(toc) {
        Ok(matches) => matches,
        Err(err) => {
            log::warn!("CDDB query failed: {err}");
            output.error(&err)?;
            return output.empty(
                QUERY_DEPTH,
                "query",
                &[("source", &SOURCE), ("num_matches", &0)],
            );
        }
    };

    let num_matches = matches.len();
    if num_matches == 0 {
        return output.empty(
            QUERY_DEPTH,
            "query",
            &[("source", &SOURCE), ("num_matches", &0)],
        );
    }

    for (index, (candidate, result)) in matches.enumerate() {
        let cddb_disc = match result {
            Ok(cddb_disc) => cddb_disc,
            Err(err) => {
                log::warn!(
                    "Failed to read CDDB entry {}/{}: {err}",
                    candidate.category,
                    candidate.disc_id
                );
                output.error(&err)?;
                CddbDisc::from_candidate(&candidate, toc)
            }
        };
        write_match(output, options, &cddb_disc, index + 1, num_matches)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use crate::report::tests::{FakeDisc, FakeService};

    fn render(
        format: OutputFormat,
        options: &ReportOptions,
        fail_query: bool,
    ) -> String {
        let mut output = Output::new(Vec::new(), format);
        let mut service = FakeService { fail_query };
        report(&mut output, options, &FakeDisc::new(), &mut service).unwrap();
        String::from_utf8(output.into_inner()).unwrap()
    }

    #[test]
    fn test_album_xml() {
        let options = ReportOptions {
            album: true,
            cddb: true,
            ..ReportOptions::default()
        };
        assert_eq!(
            render(OutputFormat::Xml, &options, false),
            "\t<query source=\"CDDB\" match=\"1\" num_matches=\"2\">\n\
             \t\t<albuminfo>\n\
             \t\t\t\t<title>Foo</title>\n\
             \t\t\t\t<artist>The Foos</artist>\n\
             \t\t\t\t<category>rock</category>\n\
             \t\t\t\t<year>1999</year>\n\
             \t\t</albuminfo>\n\
             \t</query>\n\
             <error msg=\"CDDB server error: 401 No such CD entry in database.\" />\n\
             \t<query source=\"CDDB\" match=\"2\" num_matches=\"2\">\n\
             \t\t<albuminfo>\n\
             \t\t\t\t<title>Foo &lt;Live&gt;</title>\n\
             \t\t\t\t<artist>The Foos</artist>\n\
             \t\t\t\t<category>misc</category>\n\
             \t\t</albuminfo>\n\
             \t</query>\n"
        );
    }

    #[test]
    fn test_listing_xml() {
        let options = ReportOptions {
            listing: true,
            cddb: true,
            ..ReportOptions::default()
        };
        let xml = render(OutputFormat::Xml, &options, false);
        assert!(xml.starts_with(
            "\t<query source=\"CDDB\" match=\"1\" num_matches=\"2\">\n\
             \t\t<tracklisting>\n\
             \t\t\t\t<track number=\"1\">\n\
             \t\t\t\t\t\t<length>198</length>\n\
             \t\t\t\t\t\t<title>Intro</title>\n\
             \t\t\t\t\t\t<artist>The Foos</artist>\n\
             \t\t\t\t</track>\n\
             \t\t\t\t<track number=\"2\">\n\
             \t\t\t\t\t\t<length>200</length>\n\
             \t\t\t\t\t\t<title>Duet</title>\n\
             \t\t\t\t\t\t<artist>Guest Star</artist>\n\
             \t\t\t\t\t\t<extra_data>Bonus</extra_data>\n\
             \t\t\t\t</track>\n\
             \t\t\t\t<track number=\"3\">\n\
             \t\t\t\t\t\t<length>200</length>\n\
             \t\t\t\t\t\t<artist>The Foos</artist>\n\
             \t\t\t\t</track>\n\
             \t\t</tracklisting>\n\
             \t</query>\n"
        ));
    }

    #[test]
    fn test_plain() {
        let options = ReportOptions {
            album: true,
            listing: true,
            cddb: true,
            ..ReportOptions::default()
        };
        assert_eq!(
            render(OutputFormat::Plain, &options, false),
            "TITLE:Foo\n\
             ARTIST:The Foos\n\
             CATEGORY:rock\n\
             YEAR:1999\n\
             1:Intro\n\
             2:Duet\n\
             3:(null)\n\
             CDDB server error: 401 No such CD entry in database.\n\
             TITLE:Foo <Live>\n\
             ARTIST:The Foos\n\
             CATEGORY:misc\n\
             1:(null)\n\
             2:(null)\n\
             3:(null)\n"
        );
    }

    #[test]
    fn test_query_failure() {
        let options = ReportOptions {
            album: true,
            cddb: true,
            ..ReportOptions::default()
        };
        assert_eq!(
            render(OutputFormat::Xml, &options, true),
            "<error msg=\"unable to resolve CDDB server cddb.invalid\" />\n\
             \t<query source=\"CDDB\" num_matches=\"0\" />\n"
        );
        assert_eq!(
            render(OutputFormat::Plain, &options, true),
            "unable to resolve CDDB server cddb.invalid\n"
        );
    }
}
