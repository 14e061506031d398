// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! CD-TEXT records.

use std::collections::BTreeMap;
use std::fmt;

/// Kind of a CD-TEXT field.
///
/// The declaration order is the order in which fields are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CdTextField {
    /// Name of the arranger(s).
    Arranger,
    /// Name of the composer(s).
    Composer,
    /// Disc identification information.
    DiscId,
    /// Genre identification and genre information.
    Genre,
    /// Message from the content provider or artist.
    Message,
    /// International Standard Recording Code.
    Isrc,
    /// Name of the performer(s).
    Performer,
    /// Size information of the block.
    SizeInfo,
    /// Name of the songwriter(s).
    Songwriter,
    /// Title of the album or the track.
    Title,
    /// Table of contents information.
    TocInfo,
    /// Second table of contents information.
    TocInfo2,
    /// UPC/EAN code of the album.
    UpcEan,
}

/// The field used for one-line-per-track listings.
pub const DISPLAY_FIELD: CdTextField = CdTextField::Title;

impl CdTextField {
    /// All field kinds, in output order.
    pub const ALL: [CdTextField; 13] = [
        Self::Arranger,
        Self::Composer,
        Self::DiscId,
        Self::Genre,
        Self::Message,
        Self::Isrc,
        Self::Performer,
        Self::SizeInfo,
        Self::Songwriter,
        Self::Title,
        Self::TocInfo,
        Self::TocInfo2,
        Self::UpcEan,
    ];

    /// Name of the field, used both as plain text label and as XML tag name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Arranger => "ARRANGER",
            Self::Composer => "COMPOSER",
            Self::DiscId => "DISC_ID",
            Self::Genre => "GENRE",
            Self::Message => "MESSAGE",
            Self::Isrc => "ISRC",
            Self::Performer => "PERFORMER",
            Self::SizeInfo => "SIZE_INFO",
            Self::Songwriter => "SONGWRITER",
            Self::Title => "TITLE",
            Self::TocInfo => "TOC_INFO",
            Self::TocInfo2 => "TOC_INFO2",
            Self::UpcEan => "UPC_EAN",
        }
    }

    /// Look up the field that a CUE sheet command sets.
    pub fn from_cue_command(command: &str) -> Option<Self> {
        let field = match command.to_ascii_uppercase().as_str() {
            "ARRANGER" => Self::Arranger,
            "COMPOSER" => Self::Composer,
            "DISC_ID" => Self::DiscId,
            "GENRE" => Self::Genre,
            "MESSAGE" => Self::Message,
            "ISRC" => Self::Isrc,
            "PERFORMER" => Self::Performer,
            "SIZE_INFO" => Self::SizeInfo,
            "SONGWRITER" => Self::Songwriter,
            "TITLE" => Self::Title,
            "TOC_INFO" | "TOC_INFO1" => Self::TocInfo,
            "TOC_INFO2" => Self::TocInfo2,
            "UPC_EAN" => Self::UpcEan,
            _ => return None,
        };
        Some(field)
    }
}

impl fmt::Display for CdTextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The CD-TEXT fields of the album or of a single track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdText {
    /// Present fields.
    fields: BTreeMap<CdTextField, String>,
}

impl CdText {
    /// Get the value of a field, if present.
    pub fn get(&self, field: CdTextField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Set the value of a field, replacing an earlier value.
    pub fn set(&mut self, field: CdTextField, value: impl Into<String>) {
        if let Some(previous) = self.fields.insert(field, value.into()) {
            log::debug!("Replacing CD-TEXT field {field} (was {previous:?})");
        }
    }

    /// Builder-style variant of [`CdText::set`].
    #[must_use]
    pub fn with(mut self, field: CdTextField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns `true` if no field is present.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The value of the [`DISPLAY_FIELD`].
    pub fn display_text(&self) -> Option<&str> {
        self.get(DISPLAY_FIELD)
    }

    /// Yields the present fields in output order.
    pub fn iter(&self) -> impl Iterator<Item = (CdTextField, &str)> {
        self.fields
            .iter()
            .map(|(field, value)| (*field, value.as_str()))
    }
}
