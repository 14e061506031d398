// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Raw CD-TEXT from Linux drives, read with `READ TOC/PMA/ATIP` through the SCSI generic driver.

use libc::{c_int, c_uchar, c_uint, c_ushort, c_void};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::ptr;

/// `SG_IO` ioctl request.
const SG_IO: libc::Ioctl = 0x2285;

/// Transfer direction: from the device.
const SG_DXFER_FROM_DEV: c_int = -3;

/// The command ended with a check condition.
const SG_INFO_CHECK: c_uint = 0x1;

/// `READ TOC/PMA/ATIP` operation code.
const READ_TOC: u8 = 0x43;

/// `READ TOC/PMA/ATIP` response format with the CD-TEXT packs.
const FORMAT_CDTEXT: u8 = 0x05;

/// Size of the response header.
const HEADER_SIZE: usize = 4;

/// Size of the sense buffer.
const SENSE_SIZE: u8 = 32;

/// Command timeout in milliseconds.
const TIMEOUT_MS: c_uint = 10_000;

/// `struct sg_io_hdr` from `<scsi/sg.h>`.
// Most fields are only read by the kernel.
#[allow(dead_code)]
#[repr(C)]
struct SgIoHeader {
    /// Always `'S'`.
    interface_id: c_int,
    /// Data transfer direction.
    dxfer_direction: c_int,
    /// Length of the command block.
    cmd_len: c_uchar,
    /// Size of the sense buffer.
    mx_sb_len: c_uchar,
    /// Number of scatter-gather elements (unused).
    iovec_count: c_ushort,
    /// Size of the data buffer.
    dxfer_len: c_uint,
    /// Data buffer.
    dxferp: *mut c_void,
    /// Command block.
    cmdp: *mut c_uchar,
    /// Sense buffer.
    sbp: *mut c_uchar,
    /// Timeout in milliseconds.
    timeout: c_uint,
    /// Request flags.
    flags: c_uint,
    /// Packet ID (unused).
    pack_id: c_int,
    /// User pointer (unused).
    usr_ptr: *mut c_void,
    /// SCSI status.
    status: c_uchar,
    /// Shifted SCSI status.
    masked_status: c_uchar,
    /// Messaging level data.
    msg_status: c_uchar,
    /// Number of sense bytes written.
    sb_len_wr: c_uchar,
    /// Host adapter errors.
    host_status: c_ushort,
    /// Driver errors.
    driver_status: c_ushort,
    /// Number of bytes not transferred.
    resid: c_int,
    /// Command duration in milliseconds.
    duration: c_uint,
    /// Auxiliary information.
    info: c_uint,
}

/// Command block that reads the CD-TEXT packs into a buffer of the given size.
fn command(allocation_length: u16) -> [u8; 10] {
    let [high, low] = allocation_length.to_be_bytes();
    [READ_TOC, 0, FORMAT_CDTEXT, 0, 0, 0, 0, high, low, 0]
}

/// Send `READ TOC/PMA/ATIP` for the CD-TEXT packs and return the number of bytes received.
#[allow(unsafe_code)]
fn read_toc_cdtext(file: &File, buffer: &mut [u8]) -> io::Result<usize> {
    let allocation_length = u16::try_from(buffer.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "buffer too large"))?;
    let mut command = command(allocation_length);
    let mut sense = vec![0u8; usize::from(SENSE_SIZE)];

    let mut header = SgIoHeader {
        interface_id: c_int::from(b'S'),
        dxfer_direction: SG_DXFER_FROM_DEV,
        cmd_len: 10,
        mx_sb_len: SENSE_SIZE,
        iovec_count: 0,
        dxfer_len: c_uint::from(allocation_length),
        dxferp: buffer.as_mut_ptr().cast(),
        cmdp: command.as_mut_ptr(),
        sbp: sense.as_mut_ptr(),
        timeout: TIMEOUT_MS,
        flags: 0,
        pack_id: 0,
        usr_ptr: ptr::null_mut(),
        status: 0,
        masked_status: 0,
        msg_status: 0,
        sb_len_wr: 0,
        host_status: 0,
        driver_status: 0,
        resid: 0,
        duration: 0,
        info: 0,
    };

    // SAFETY: all pointers in `header` refer to live buffers of the stated sizes.
    let result = unsafe { libc::ioctl(file.as_raw_fd(), SG_IO, ptr::from_mut(&mut header)) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    if header.info & SG_INFO_CHECK != 0 || header.status != 0 {
        log::debug!(
            "READ TOC/PMA/ATIP failed (status {:#04x}, {} sense bytes, took {} ms)",
            header.status,
            header.sb_len_wr,
            header.duration
        );
        return Err(io::Error::other("drive rejected the CD-TEXT request"));
    }

    let missing = usize::try_from(header.resid).unwrap_or(0);
    Ok(buffer.len().saturating_sub(missing))
}

/// Read the raw CD-TEXT of the disc in the drive at `device`, including the response header.
///
/// Returns an empty buffer if the disc has no CD-TEXT.
///
/// # Errors
///
/// Returns an error if the device cannot be opened or rejects the request.
pub(super) fn read_cdtext(device: &str) -> io::Result<Vec<u8>> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(device)?;

    let mut header = [0u8; HEADER_SIZE];
    if read_toc_cdtext(&file, &mut header)? < HEADER_SIZE {
        return Ok(Vec::new());
    }
    let length = (usize::from(u16::from_be_bytes([header[0], header[1]])) + 2)
        .min(usize::from(u16::MAX));
    if length <= HEADER_SIZE {
        return Ok(Vec::new());
    }

    let mut data = vec![0; length];
    let received = read_toc_cdtext(&file, &mut data)?;
    data.truncate(received);
    log::debug!("Read {received} bytes of CD-TEXT from {device}");
    Ok(data)
}
