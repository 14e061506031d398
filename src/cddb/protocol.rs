// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! The CDDBP line protocol.

use super::{CddbCandidate, CddbError};
use crate::disc::Toc;
use itertools::Itertools;
use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};

/// Client name sent in the handshake.
const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");

/// Client version sent in the handshake.
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol level requested after the handshake (UTF-8 entries).
const PROTOCOL_LEVEL: u8 = 6;

/// Status line sent by a CDDB server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Three digit status code.
    pub code: u16,
    /// Remaining text of the status line.
    pub text: String,
}

impl Response {
    /// Parse a status line.
    fn parse(line: &str) -> Result<Self, CddbError> {
        let code = line
            .get(..3)
            .filter(|code| code.bytes().all(|byte| byte.is_ascii_digit()))
            .and_then(|code| code.parse().ok())
            .ok_or_else(|| CddbError::MalformedResponse(line.to_string()))?;
        let text = line.get(3..).unwrap_or_default().trim().to_string();
        Ok(Self { code, text })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// An established CDDBP connection.
#[derive(Debug)]
pub struct Connection<S> {
    /// Buffered stream to the server.
    stream: BufReader<S>,
}

impl<S: Read + Write> Connection<S> {
    /// Wait for the server greeting, then introduce ourselves and switch to UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses the connection or the handshake fails.
    pub fn handshake(stream: S, email: &str) -> Result<Self, CddbError> {
        let mut connection = Self {
            stream: BufReader::new(stream),
        };

        let greeting = connection.read_response()?;
        if !matches!(greeting.code, 200 | 201) {
            return Err(CddbError::Refused(greeting));
        }

        let (user, host) = email.split_once('@').unwrap_or((email, "localhost"));
        let hello = connection.command(&format!(
            "cddb hello {user} {host} {CLIENT_NAME} {CLIENT_VERSION}"
        ))?;
        if !matches!(hello.code, 200 | 402) {
            return Err(CddbError::Handshake(hello));
        }

        let proto = connection.command(&format!("proto {PROTOCOL_LEVEL}"))?;
        if !matches!(proto.code, 201 | 502) {
            log::debug!("Server does not support protocol level {PROTOCOL_LEVEL}: {proto}");
        }

        Ok(connection)
    }

    /// Read a single line, without the line terminator.
    fn read_line(&mut self) -> Result<String, CddbError> {
        let mut buffer = Vec::new();
        if self.stream.read_until(b'\n', &mut buffer)? == 0 {
            return Err(CddbError::ConnectionClosed);
        }
        let line = String::from_utf8_lossy(&buffer);
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read a status line.
    fn read_response(&mut self) -> Result<Response, CddbError> {
        let line = self.read_line()?;
        log::debug!("CDDB < {line}");
        Response::parse(&line)
    }

    /// Read a multi-line body terminated by a single `.`.
    fn read_body(&mut self) -> Result<Vec<String>, CddbError> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            if line == "." {
                return Ok(lines);
            }
            match line.strip_prefix("..") {
                Some(rest) => lines.push(format!(".{rest}")),
                None => lines.push(line),
            }
        }
    }

    /// Send a command and read the status line of the response.
    fn command(&mut self, command: &str) -> Result<Response, CddbError> {
        log::debug!("CDDB > {command}");
        let stream = self.stream.get_mut();
        stream.write_all(command.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        self.read_response()
    }

    /// Query the server for discs matching the table of contents.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O errors or if the server reports an error.
    pub fn query(&mut self, toc: &Toc) -> Result<Vec<CddbCandidate>, CddbError> {
        let response = self.command(&format!(
            "cddb query {disc_id} {track_count} {offsets} {length}",
            disc_id = toc.freedb_id_string(),
            track_count = toc.track_count(),
            offsets = toc.offsets().iter().join(" "),
            length = toc.length_secs(),
        ))?;

        let code = response.code;
        match code {
            200 => CddbCandidate::from_query_line(&response.text)
                .map(|candidate| vec![candidate])
                .ok_or(CddbError::MalformedResponse(response.text)),
            202 => Ok(Vec::new()),
            210 | 211 => {
                let lines = self.read_body()?;
                Ok(lines
                    .iter()
                    .filter_map(|line| {
                        let candidate = CddbCandidate::from_query_line(line);
                        if candidate.is_none() {
                            log::warn!("Ignoring malformed CDDB query result: {line}");
                        }
                        candidate
                    })
                    .collect())
            }
            _ => Err(CddbError::Server(response)),
        }
    }

    /// Read the xmcd entry of a disc.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O errors or if the server reports an error.
    pub fn read(&mut self, category: &str, disc_id: &str) -> Result<String, CddbError> {
        let response = self.command(&format!("cddb read {category} {disc_id}"))?;
        if response.code != 210 {
            return Err(CddbError::Server(response));
        }

        let mut entry = self.read_body()?.join("\n");
        entry.push('\n');
        Ok(entry)
    }

    /// Close the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be sent.
    pub fn quit(&mut self) -> Result<(), CddbError> {
        let response = self.command("quit")?;
        if response.code != 230 {
            log::debug!("Unexpected response to quit: {response}");
        }
        Ok(())
    }
}
