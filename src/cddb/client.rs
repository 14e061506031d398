// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! CDDB client with caching support.

use super::{
    parse_entry, CacheError, CddbCache, CddbCandidate, CddbDisc, CddbError, CddbService,
    Connection,
};
use crate::config::CddbSettings;
use crate::disc::Toc;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

/// Configurable CDDBP client.
///
/// The connection to the server is opened on first use and closed when the client is dropped.
#[derive(Debug)]
pub struct CddbClient {
    /// Settings
    settings: CddbSettings,
    /// Cache
    cache: Option<CddbCache>,
    /// Open connection, if any.
    connection: Option<Connection<TcpStream>>,
}

impl CddbClient {
    /// Create a new CDDB client. This does not touch the network.
    pub fn new(settings: CddbSettings) -> Self {
        let cache = settings.cache_dir.clone().map(CddbCache::new);
        Self {
            settings,
            cache,
            connection: None,
        }
    }

    /// Resolve the server address.
    fn address(&self) -> Result<SocketAddr, CddbError> {
        let port = u16::try_from(self.settings.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or(CddbError::InvalidPort(self.settings.port))?;
        let server = self.settings.server.as_str();
        (server, port)
            .to_socket_addrs()
            .inspect_err(|err| log::debug!("Failed to resolve {server}: {err}"))
            .ok()
            .and_then(|mut addresses| addresses.next())
            .ok_or_else(|| CddbError::UnknownHost(server.to_string()))
    }

    /// Open a new connection and perform the handshake.
    fn connect(&self) -> Result<Connection<TcpStream>, CddbError> {
        let address = self.address()?;
        let timeout = self.settings.timeout();
        log::debug!("Connecting to CDDB server {address} (timeout: {timeout:?})");

        let stream = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&address, timeout)?,
            None => TcpStream::connect(address)?,
        };
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        Connection::handshake(stream, &self.settings.email)
    }

    /// The open connection, connecting first if necessary.
    fn connection(&mut self) -> Result<&mut Connection<TcpStream>, CddbError> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => self.connect()?,
        };
        Ok(self.connection.insert(connection))
    }

    /// Drop the connection if the error left it in an unknown state.
    fn check_connection<T>(&mut self, result: Result<T, CddbError>) -> Result<T, CddbError> {
        if matches!(
            result,
            Err(CddbError::Io(_) | CddbError::ConnectionClosed | CddbError::MalformedResponse(_))
        ) {
            self.connection = None;
        }
        result
    }
}

impl CddbService for CddbClient {
    fn query(&mut self, toc: &Toc) -> Result<Vec<CddbCandidate>, CddbError> {
        let disc_id = toc.freedb_id_string();
        if let Some(candidate) = self.cache.as_ref().and_then(|cache| cache.find(&disc_id)) {
            log::debug!(
                "Found CDDB entry {}/{} in cache",
                candidate.category,
                candidate.disc_id
            );
            return Ok(vec![candidate]);
        }

        let result = self.connection().and_then(|connection| connection.query(toc));
        self.check_connection(result)
    }

    fn read(&mut self, candidate: &CddbCandidate, toc: &Toc) -> Result<CddbDisc, CddbError> {
        let CddbCandidate {
            category, disc_id, ..
        } = candidate;

        if let Some(cache) = &self.cache {
            match cache.get(category, disc_id) {
                Ok(entry) => return Ok(parse_entry(&entry, candidate, toc)),
                Err(CacheError::CacheMiss) => (),
                Err(err) => {
                    log::debug!("Failed to get CDDB entry {category}/{disc_id} from cache: {err}");
                }
            }
        }

        let result = self
            .connection()
            .and_then(|connection| connection.read(category, disc_id));
        let entry = self.check_connection(result)?;

        if let Some(cache) = &self.cache {
            match cache.insert(category, disc_id, &entry) {
                Ok(()) => log::debug!("Inserted CDDB entry {category}/{disc_id} into cache"),
                Err(err) => {
                    log::warn!("Failed to insert CDDB entry {category}/{disc_id} into cache: {err}");
                }
            }
        }

        Ok(parse_entry(&entry, candidate, toc))
    }
}

impl Drop for CddbClient {
    fn drop(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(err) = connection.quit() {
                log::debug!("Failed to close CDDB connection: {err}");
            }
        }
    }
}
