// -*- coding: utf-8 -*-
//
// usbfill - Removable storage filler
//
// Copyright 2024 usbfill contributors
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT
//

use anyhow as ah;
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Segment write result code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentWrite {
    /// The whole buffer has been written.
    Ok,
    /// Out of disk space.
    DiskFull,
}

/// Segment create result code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentCreate {
    /// A new file has been created and is open.
    Created,
    /// A file exists at the path. It has not been touched.
    Exists,
}

/// Output file I/O used by the writer.
///
/// An implementation holds at most one open segment at a time.
pub trait SegmentIo {
    /// Create a new segment file at `path` and keep it open.
    /// An existing file is never opened or truncated.
    fn create(&mut self, path: &Path) -> ah::Result<SegmentCreate>;

    /// Write the complete buffer to the open segment.
    fn write(&mut self, buffer: &[u8]) -> ah::Result<SegmentWrite>;

    /// Flush and close the open segment.
    /// The handle is released even if flushing fails.
    fn close(&mut self) -> ah::Result<()>;

    fn is_open(&self) -> bool;
}

/// Bookkeeping for one rollover segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFile {
    pub index: u64,
    pub path: PathBuf,
    pub written: u64,
}

/// Path of the segment with the given index below the volume root.
pub fn segment_path(root: &Path, prefix: &str, index: u64) -> PathBuf {
    root.join(format!("{prefix}_{index}.bin"))
}

#[cfg(unix)]
fn is_disk_full(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::ENOSPC)
}

#[cfg(windows)]
fn is_disk_full(e: &io::Error) -> bool {
    use winapi::shared::winerror::{ERROR_DISK_FULL, ERROR_HANDLE_DISK_FULL};
    matches!(
        e.raw_os_error().map(|c| c as u32),
        Some(ERROR_DISK_FULL | ERROR_HANDLE_DISK_FULL)
    )
}

/// Shrink an output to a given length.
trait Truncate {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write the whole buffer at `offset`.
/// If that fails, cut off whatever part of the buffer already landed,
/// so the output ends at `offset` again.
fn write_or_rewind<F>(out: &mut F, offset: u64, buffer: &[u8]) -> io::Result<()>
where
    F: Write + Truncate,
{
    let result = out.write_all(buffer);
    if result.is_err() {
        if let Err(e) = out.truncate(offset) {
            eprintln!("Warning: Failed to drop partial write: {e}");
        }
    }
    result
}

/// Segment I/O on regular files.
#[derive(Debug, Default)]
pub struct SegmentFile {
    path: PathBuf,
    file: Option<File>,
    /// Bytes completely written to the open file.
    written: u64,
}

impl SegmentFile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SegmentIo for SegmentFile {
    fn create(&mut self, path: &Path) -> ah::Result<SegmentCreate> {
        if self.file.is_some() {
            return Err(ah::format_err!(
                "Cannot open {:?}: segment {:?} is still open",
                path,
                self.path
            ));
        }
        let file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Ok(SegmentCreate::Exists);
            }
            Err(e) => {
                return Err(ah::format_err!(
                    "Failed to open file for writing {:?}: {}",
                    path,
                    e
                ));
            }
        };
        self.path = path.into();
        self.file = Some(file);
        self.written = 0;
        Ok(SegmentCreate::Created)
    }

    fn write(&mut self, buffer: &[u8]) -> ah::Result<SegmentWrite> {
        let Some(file) = self.file.as_mut() else {
            return Err(ah::format_err!("No file object"));
        };
        if let Err(e) = write_or_rewind(file, self.written, buffer) {
            if is_disk_full(&e) {
                return Ok(SegmentWrite::DiskFull);
            }
            return Err(ah::format_err!(
                "Failed to write to file {:?}: {}",
                self.path,
                e
            ));
        }
        self.written += buffer.len() as u64;
        Ok(SegmentWrite::Ok)
    }

    fn close(&mut self) -> ah::Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        if let Err(e) = file.sync_all() {
            return Err(ah::format_err!("Failed to flush {:?}: {}", self.path, e));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for SegmentFile {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            eprintln!("Warning: Failed to close segment: {e}");
        }
    }
}


// vim: ts=4 sw=4 expandtab
