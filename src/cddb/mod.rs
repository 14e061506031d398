// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! CDDB lookups.

mod cache;
mod client;
mod protocol;
mod xmcd;

use crate::disc::Toc;
use std::io;
use std::vec;
use thiserror::Error;

pub use cache::{CacheError, CddbCache};
pub use client::CddbClient;
pub use protocol::{Connection, Response};
pub use xmcd::parse_entry;

/// A CDDB error.
#[derive(Error, Debug)]
pub enum CddbError {
    /// I/O Error.
    #[error("Input/Output error ({0})")]
    Io(#[from] io::Error),
    /// The configured port is not a valid TCP port.
    #[error("invalid CDDB port {0}")]
    InvalidPort(i64),
    /// The server hostname did not resolve to any address.
    #[error("unable to resolve CDDB server {0}")]
    UnknownHost(String),
    /// The server closed the connection.
    #[error("CDDB server closed the connection")]
    ConnectionClosed,
    /// The server sent a line that is not a valid response.
    #[error("malformed CDDB response: {0}")]
    MalformedResponse(String),
    /// The server refused the connection.
    #[error("CDDB server refused connection: {0}")]
    Refused(Response),
    /// The handshake failed.
    #[error("CDDB handshake failed: {0}")]
    Handshake(Response),
    /// The server answered a query or read command with an error.
    #[error("CDDB server error: {0}")]
    Server(Response),
}

/// One candidate match of a CDDB query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CddbCandidate {
    /// CDDB category (e.g. `rock`).
    pub category: String,
    /// FreeDB disc ID (8 hex digits).
    pub disc_id: String,
    /// Disc title as `artist / title`, if the source provided one.
    pub header: Option<String>,
}

impl CddbCandidate {
    /// Parse a `category discid artist / title` query result line.
    pub fn from_query_line(line: &str) -> Option<Self> {
        let mut parts = line.trim().splitn(3, ' ');
        let category = parts.next().filter(|part| !part.is_empty())?;
        let disc_id = parts.next().filter(|part| !part.is_empty())?;
        let header = parts
            .next()
            .map(str::trim)
            .filter(|header| !header.is_empty());
        Some(Self {
            category: category.to_string(),
            disc_id: disc_id.to_string(),
            header: header.map(ToString::to_string),
        })
    }
}

/// Split a CDDB `artist / title` string.
///
/// Without separator, artist and title are the same.
fn split_artist_title(value: &str) -> (&str, &str) {
    value.split_once(" / ").unwrap_or((value, value))
}

/// A track of a CDDB disc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CddbTrack {
    /// Track number, starting at 1.
    pub number: u32,
    /// Track title.
    pub title: Option<String>,
    /// Track artist, falls back to the disc artist.
    pub artist: Option<String>,
    /// Track length in seconds, `0` if unknown.
    pub length: u32,
    /// Extended track data.
    pub ext_data: Option<String>,
}

/// A CDDB disc entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CddbDisc {
    /// CDDB category.
    pub category: String,
    /// FreeDB disc ID.
    pub disc_id: String,
    /// Album title.
    pub title: Option<String>,
    /// Album artist.
    pub artist: Option<String>,
    /// Genre (free text, unlike the category).
    pub genre: Option<String>,
    /// Release year, `0` if unknown.
    pub year: u32,
    /// Extended disc data.
    pub ext_data: Option<String>,
    /// Tracks in disc order.
    pub tracks: Vec<CddbTrack>,
}

impl CddbDisc {
    /// Build a disc from a query result alone, without the full entry.
    pub fn from_candidate(candidate: &CddbCandidate, toc: &Toc) -> Self {
        let (artist, title) = candidate
            .header
            .as_deref()
            .map(split_artist_title)
            .map_or((None, None), |(artist, title)| {
                (Some(artist.to_string()), Some(title.to_string()))
            });
        let tracks = (0..usize::from(toc.track_count()))
            .map(|position| CddbTrack {
                number: track_number(position),
                artist: artist.clone(),
                length: toc.track_length_secs(position).unwrap_or(0),
                ..CddbTrack::default()
            })
            .collect();
        Self {
            category: candidate.category.clone(),
            disc_id: candidate.disc_id.clone(),
            title,
            artist,
            tracks,
            ..Self::default()
        }
    }
}

/// 1-based track number for a 0-based position.
fn track_number(position: usize) -> u32 {
    u32::try_from(position + 1).unwrap_or(u32::MAX)
}

/// A service that answers CDDB queries.
pub trait CddbService {
    /// Query the service for discs matching the table of contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or answers with an error.
    fn query(&mut self, toc: &Toc) -> Result<Vec<CddbCandidate>, CddbError>;

    /// Read the full entry of a candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be fetched.
    fn read(&mut self, candidate: &CddbCandidate, toc: &Toc) -> Result<CddbDisc, CddbError>;

    /// Query the service and return the matches as a lazy iterator that reads each entry when
    /// it is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn matches<'a>(&'a mut self, toc: &'a Toc) -> Result<Matches<'a, Self>, CddbError>
    where
        Self: Sized,
    {
        let candidates = self.query(toc)?;
        log::debug!("CDDB query returned {} match(es)", candidates.len());
        Ok(Matches {
            service: self,
            toc,
            candidates: candidates.into_iter(),
        })
    }
}

/// Lazy, single-pass iterator over the matches of a CDDB query.
///
/// Yields each candidate together with the result of reading its full entry.
#[derive(Debug)]
pub struct Matches<'a, S> {
    /// Service used to read the entries.
    service: &'a mut S,
    /// Table of contents the query was made for.
    toc: &'a Toc,
    /// Remaining candidates.
    candidates: vec::IntoIter<CddbCandidate>,
}

impl<S: CddbService> Iterator for Matches<'_, S> {
    type Item = (CddbCandidate, Result<CddbDisc, CddbError>);

    fn next(&mut self) -> Option<Self::Item> {
        let candidate = self.candidates.next()?;
        let result = self.service.read(&candidate, self.toc);
        Some((candidate, result))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.candidates.size_hint()
    }
}

impl<S: CddbService> ExactSizeIterator for Matches<'_, S> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct CountingService {
        reads: usize,
    }

    impl CddbService for CountingService {
        fn query(&mut self, _toc: &Toc) -> Result<Vec<CddbCandidate>, CddbError> {
            Ok(vec![
                CddbCandidate::from_query_line("rock 08025603 The Foos / Foo").unwrap(),
                CddbCandidate::from_query_line("misc 08025603 Foo").unwrap(),
            ])
        }

        fn read(&mut self, candidate: &CddbCandidate, toc: &Toc) -> Result<CddbDisc, CddbError> {
            self.reads += 1;
            Ok(CddbDisc::from_candidate(candidate, toc))
        }
    }

    fn toc() -> Toc {
        Toc::new(1, vec![150, 15000, 30000], 45000).unwrap()
    }

    #[test]
    fn test_candidate_from_query_line() {
        let candidate = CddbCandidate::from_query_line("rock 08025603 The Foos / Foo").unwrap();
        assert_eq!(candidate.category, "rock");
        assert_eq!(candidate.disc_id, "08025603");
        assert_eq!(candidate.header.as_deref(), Some("The Foos / Foo"));

        let candidate = CddbCandidate::from_query_line("rock 08025603").unwrap();
        assert_eq!(candidate.header, None);

        assert!(CddbCandidate::from_query_line("rock").is_none());
        assert!(CddbCandidate::from_query_line("").is_none());
    }

    #[test]
    fn test_split_artist_title() {
        assert_eq!(split_artist_title("The Foos / Foo"), ("The Foos", "Foo"));
        assert_eq!(split_artist_title("Foo"), ("Foo", "Foo"));
        assert_eq!(split_artist_title("AC/DC / Back"), ("AC/DC", "Back"));
    }

    #[test]
    fn test_disc_from_candidate() {
        let candidate = CddbCandidate::from_query_line("rock 08025603 The Foos / Foo").unwrap();
        let disc = CddbDisc::from_candidate(&candidate, &toc());
        assert_eq!(disc.category, "rock");
        assert_eq!(disc.title.as_deref(), Some("Foo"));
        assert_eq!(disc.artist.as_deref(), Some("The Foos"));
        assert_eq!(disc.year, 0);
        assert_eq!(disc.tracks.len(), 3);
        assert_eq!(disc.tracks[0].number, 1);
        assert_eq!(disc.tracks[0].length, 198);
        assert_eq!(disc.tracks[2].artist.as_deref(), Some("The Foos"));
        assert_eq!(disc.tracks[2].title, None);
    }

    #[test]
    fn test_matches_are_read_lazily() {
        let toc = toc();
        let mut service = CountingService::default();
        let mut matches = service.matches(&toc).unwrap();
        assert_eq!(matches.len(), 2);

        let (candidate, result) = matches.next().unwrap();
        assert_eq!(candidate.category, "rock");
        assert!(result.is_ok());
        assert_eq!(matches.len(), 1);

        let (candidate, _) = matches.next().unwrap();
        assert_eq!(candidate.category, "misc");
        assert!(matches.next().is_none());
        assert_eq!(service.reads, 2);
    }
}
