// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Parser for xmcd database entries.

use super::{split_artist_title, track_number, CddbCandidate, CddbDisc, CddbTrack};
use crate::disc::Toc;
use std::collections::HashMap;

/// Decode the `\n`, `\t` and `\\` escapes of an xmcd value.
fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Parse an xmcd entry read for the given candidate.
///
/// Track lengths are not part of the entry and are taken from the table of contents instead.
pub fn parse_entry(entry: &str, candidate: &CddbCandidate, toc: &Toc) -> CddbDisc {
    let mut values: HashMap<&str, String> = HashMap::new();
    for line in entry.lines() {
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        values
            .entry(key.trim())
            .or_default()
            .push_str(value.trim_end_matches('\r'));
    }

    let get = |key: &str| {
        values
            .get(key)
            .map(|value| unescape(value))
            .filter(|value| !value.is_empty())
    };

    let (artist, title) = get("DTITLE")
        .or_else(|| candidate.header.clone())
        .map_or((None, None), |dtitle| {
            let (artist, title) = split_artist_title(&dtitle);
            (Some(artist.to_string()), Some(title.to_string()))
        });

    let tracks = (0..usize::from(toc.track_count()))
        .map(|position| {
            let (track_artist, track_title) = match get(&format!("TTITLE{position}")) {
                Some(ttitle) => match ttitle.split_once(" / ") {
                    Some((artist, title)) => (Some(artist.to_string()), Some(title.to_string())),
                    None => (None, Some(ttitle)),
                },
                None => (None, None),
            };
            CddbTrack {
                number: track_number(position),
                title: track_title,
                artist: track_artist.or_else(|| artist.clone()),
                length: toc.track_length_secs(position).unwrap_or(0),
                ext_data: get(&format!("EXTT{position}")),
            }
        })
        .collect();

    CddbDisc {
        category: candidate.category.clone(),
        disc_id: candidate.disc_id.clone(),
        title,
        artist,
        genre: get("DGENRE"),
        year: get("DYEAR")
            .and_then(|year| year.trim().parse().ok())
            .unwrap_or(0),
        ext_data: get("EXTD"),
        tracks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = "# xmcd CD database file
#
# Track frame offsets:
#\t150
#\t15000
#\t30000
#
# Disc length: 600 seconds
#
DISCID=08025603
DTITLE=The Foos / Foo
DYEAR=1999
DGENRE=Alternative Rock
TTITLE0=Intro
TTITLE1=Guest Star / Duet
TTITLE2=A very long title that is continued
TTITLE2= on the next line
EXTD=Recorded live.\\nMastered at home.
EXTT0=
EXTT1=Bonus
EXTT2=
PLAYORDER=
";

    fn toc() -> Toc {
        Toc::new(1, vec![150, 15000, 30000], 45000).unwrap()
    }

    fn candidate() -> CddbCandidate {
        CddbCandidate::from_query_line("rock 08025603 The Foos / Foo").unwrap()
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"a\tb"), "a\tb");
        assert_eq!(unescape(r"a\\nb"), r"a\nb");
        assert_eq!(unescape(r"a\xb"), r"a\xb");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_parse_album() {
        let disc = parse_entry(ENTRY, &candidate(), &toc());
        assert_eq!(disc.category, "rock");
        assert_eq!(disc.disc_id, "08025603");
        assert_eq!(disc.title.as_deref(), Some("Foo"));
        assert_eq!(disc.artist.as_deref(), Some("The Foos"));
        assert_eq!(disc.genre.as_deref(), Some("Alternative Rock"));
        assert_eq!(disc.year, 1999);
        assert_eq!(
            disc.ext_data.as_deref(),
            Some("Recorded live.\nMastered at home.")
        );
    }

    #[test]
    fn test_parse_tracks() {
        let disc = parse_entry(ENTRY, &candidate(), &toc());
        assert_eq!(disc.tracks.len(), 3);

        let track = &disc.tracks[0];
        assert_eq!(track.number, 1);
        assert_eq!(track.title.as_deref(), Some("Intro"));
        assert_eq!(track.artist.as_deref(), Some("The Foos"));
        assert_eq!(track.length, 198);
        assert_eq!(track.ext_data, None);

        let track = &disc.tracks[1];
        assert_eq!(track.title.as_deref(), Some("Duet"));
        assert_eq!(track.artist.as_deref(), Some("Guest Star"));
        assert_eq!(track.ext_data.as_deref(), Some("Bonus"));

        let track = &disc.tracks[2];
        assert_eq!(
            track.title.as_deref(),
            Some("A very long title that is continued on the next line")
        );
        assert_eq!(track.length, 200);
    }

    #[test]
    fn test_parse_sparse_entry() {
        let disc = parse_entry("DTITLE=Foo\nDYEAR=unknown\n", &candidate(), &toc());
        assert_eq!(disc.title.as_deref(), Some("Foo"));
        assert_eq!(disc.artist.as_deref(), Some("Foo"));
        assert_eq!(disc.year, 0);
        assert_eq!(disc.genre, None);
        assert_eq!(disc.ext_data, None);
        assert!(disc.tracks.iter().all(|track| track.title.is_none()));
    }

    #[test]
    fn test_parse_entry_without_title() {
        let disc = parse_entry("DISCID=08025603\n", &candidate(), &toc());
        assert_eq!(disc.title.as_deref(), Some("Foo"));
        assert_eq!(disc.artist.as_deref(), Some("The Foos"));
    }
}
