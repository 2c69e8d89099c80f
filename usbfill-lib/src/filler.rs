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

use crate::generator::NextRandom;
use crate::segment::{OutputFile, SegmentCreate, SegmentIo, SegmentWrite, segment_path};
use crate::seed::{DEFAULT_SEED_LEN, gen_seed_string};
use crate::shared::{ByteCounter, CompletionSignal};
use crate::util::{GIB, MIB, prettybytes};
use anyhow as ah;
use std::path::{Path, PathBuf};

/// Console verbosity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum FillQuiet {
    /// Live progress line and all messages.
    #[default]
    Normal = 0,
    /// Final progress line and summary only.
    Reduced = 1,
    /// No informational output.
    NoInfo = 2,
    /// No warnings.
    NoWarn = 3,
}

/// Parameters of one fill session. They do not change while it runs.
#[derive(Clone, Debug)]
pub struct FillConfig {
    /// Root directory of the volume to fill.
    pub root: PathBuf,
    /// File name tag of the segment files.
    pub prefix: String,
    /// Total number of bytes to write.
    pub target_capacity: u64,
    /// Rollover threshold of one segment file.
    pub file_size_limit: u64,
    /// I/O chunk size.
    pub buffer_size: usize,
    /// Generator seed.
    pub seed: String,
    pub quiet: FillQuiet,
}

impl FillConfig {
    pub const DEFAULT_FILE_SIZE_LIMIT: u64 = 4 * GIB;
    pub const DEFAULT_BUFFER_SIZE: usize = MIB as usize;
    pub const DEFAULT_PREFIX: &'static str = "filldata";

    pub fn new(root: &Path, target_capacity: u64) -> Self {
        Self {
            root: root.into(),
            prefix: Self::DEFAULT_PREFIX.to_string(),
            target_capacity,
            file_size_limit: Self::DEFAULT_FILE_SIZE_LIMIT,
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
            seed: gen_seed_string(DEFAULT_SEED_LEN),
            quiet: FillQuiet::Normal,
        }
    }

    pub fn validate(&self) -> ah::Result<()> {
        if self.file_size_limit == 0 {
            return Err(ah::format_err!("The file size limit must not be zero."));
        }
        if self.buffer_size == 0 {
            return Err(ah::format_err!("The buffer size must not be zero."));
        }
        if self.prefix.is_empty() || self.prefix.contains(['/', '\\', ':']) {
            return Err(ah::format_err!(
                "Invalid file name prefix '{}'.",
                self.prefix
            ));
        }
        if !self.root.is_dir() {
            return Err(ah::format_err!(
                "Volume root {:?} is not a directory.",
                self.root
            ));
        }
        Ok(())
    }
}

/// Informational line for a segment index that is already taken.
fn skip_notice(quiet: FillQuiet, path: &Path) -> Option<String> {
    (quiet < FillQuiet::NoInfo).then(|| format!("\nSkipping existing file: {}", path.display()))
}

/// Sequential multi-file writer.
///
/// Writes `target_capacity` bytes of generator output below the volume root,
/// rolling over to a new segment file whenever the current one reaches
/// `file_size_limit`. Progress is published through the shared [`ByteCounter`]
/// and loop exit through the [`CompletionSignal`].
pub struct Filler<S, G> {
    config: FillConfig,
    io: S,
    generator: G,
    counter: ByteCounter,
    completion: CompletionSignal,
    total_written: u64,
    next_index: u64,
    current: Option<OutputFile>,
    files: Vec<OutputFile>,
}

impl<S: SegmentIo, G: NextRandom> Filler<S, G> {
    pub fn new(
        config: FillConfig,
        io: S,
        generator: G,
        counter: ByteCounter,
        completion: CompletionSignal,
    ) -> Self {
        Self {
            config,
            io,
            generator,
            counter,
            completion,
            total_written: 0,
            next_index: 0,
            current: None,
            files: Vec::new(),
        }
    }

    /// Run the write loop to completion.
    /// Returns the number of bytes written.
    ///
    /// The open segment is closed and the completion signal is raised
    /// on every exit path.
    pub fn run(&mut self) -> ah::Result<u64> {
        let _complete = self.completion.guard();

        let result = self.fill_loop();
        let close_result = self.close_current();
        match (result, close_result) {
            (Ok(()), Ok(())) => Ok(self.total_written),
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                if self.config.quiet < FillQuiet::NoWarn {
                    eprintln!("\nWarning: {close_err}");
                }
                Err(e)
            }
        }
    }

    fn fill_loop(&mut self) -> ah::Result<()> {
        let target = self.config.target_capacity;
        let limit = self.config.file_size_limit;
        let mut buffer = vec![0_u8; self.config.buffer_size];

        while self.total_written < target {
            let in_file = match &self.current {
                Some(current) => current.written,
                None => {
                    self.open_next()?;
                    0
                }
            };

            let write_size = (buffer.len() as u64)
                .min(target - self.total_written)
                .min(limit - in_file);
            if write_size == 0 {
                break;
            }

            let chunk = &mut buffer[..write_size as usize];
            self.generator.fill(chunk);
            match self.io.write(chunk) {
                Ok(SegmentWrite::Ok) => (),
                Ok(SegmentWrite::DiskFull) => {
                    return Err(ah::format_err!(
                        "Out of disk space on {:?} after writing {}.",
                        self.config.root,
                        prettybytes(self.total_written)
                    ));
                }
                Err(e) => return Err(e),
            }

            self.total_written += write_size;
            self.counter.add(write_size);

            if let Some(current) = self.current.as_mut() {
                current.written += write_size;
                if current.written == limit {
                    self.close_current()?;
                }
            }
        }
        Ok(())
    }

    /// Open the first segment path at or after the next index
    /// that does not exist, yet.
    fn open_next(&mut self) -> ah::Result<()> {
        loop {
            let index = self.next_index;
            let Some(next) = index.checked_add(1) else {
                return Err(ah::format_err!("Segment file index overflow."));
            };
            self.next_index = next;

            let path = segment_path(&self.config.root, &self.config.prefix, index);
            if self.io.create(&path)? == SegmentCreate::Exists {
                if let Some(notice) = skip_notice(self.config.quiet, &path) {
                    println!("{notice}");
                }
                continue;
            }

            self.current = Some(OutputFile {
                index,
                path,
                written: 0,
            });
            return Ok(());
        }
    }

    fn close_current(&mut self) -> ah::Result<()> {
        let Some(current) = self.current.take() else {
            return Ok(());
        };
        self.files.push(current);
        self.io.close()
    }

    /// Bytes written so far.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// All segments created so far, in creation order.
    pub fn files(&self) -> &[OutputFile] {
        &self.files
    }

    pub fn into_parts(self) -> (S, Vec<OutputFile>) {
        (self.io, self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorChaCha8;
    use crate::segment::SegmentFile;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    /// Segment I/O that fails the write which would push the total
    /// over `fail_after` bytes.
    struct FaultySegment {
        inner: SegmentFile,
        fail_after: u64,
        written: u64,
        closes: usize,
        disk_full: bool,
    }

    impl FaultySegment {
        fn new(fail_after: u64, disk_full: bool) -> Self {
            Self {
                inner: SegmentFile::new(),
                fail_after,
                written: 0,
                closes: 0,
                disk_full,
            }
        }
    }

    impl SegmentIo for FaultySegment {
        fn create(&mut self, path: &Path) -> ah::Result<SegmentCreate> {
            self.inner.create(path)
        }

        fn write(&mut self, buffer: &[u8]) -> ah::Result<SegmentWrite> {
            if self.written + buffer.len() as u64 > self.fail_after {
                if self.disk_full {
                    return Ok(SegmentWrite::DiskFull);
                }
                return Err(ah::format_err!("Injected write fault"));
            }
            self.written += buffer.len() as u64;
            self.inner.write(buffer)
        }

        fn close(&mut self) -> ah::Result<()> {
            self.closes += 1;
            self.inner.close()
        }

        fn is_open(&self) -> bool {
            self.inner.is_open()
        }
    }

    fn config(dir: &TempDir, target: u64, limit: u64, bufsize: usize) -> FillConfig {
        let mut config = FillConfig::new(dir.path(), target);
        config.file_size_limit = limit;
        config.buffer_size = bufsize;
        config.seed = "test".to_string();
        config.quiet = FillQuiet::NoWarn;
        config
    }

    fn filler<S: SegmentIo>(config: FillConfig, io: S) -> Filler<S, GeneratorChaCha8> {
        let generator = GeneratorChaCha8::new(config.seed.as_bytes());
        Filler::new(
            config,
            io,
            generator,
            ByteCounter::new(),
            CompletionSignal::new(),
        )
    }

    fn sizes(files: &[OutputFile]) -> Vec<u64> {
        files.iter().map(|f| f.written).collect()
    }

    #[test]
    fn test_rollover() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 10 * MIB, 4 * MIB, MIB as usize);
        let mut f = filler(cfg, SegmentFile::new());
        assert_eq!(f.run().unwrap(), 10 * MIB);
        assert_eq!(f.total_written(), 10 * MIB);
        assert_eq!(f.counter.get(), 10 * MIB);
        assert!(f.completion.is_set());
        assert_eq!(sizes(f.files()), [4 * MIB, 4 * MIB, 2 * MIB]);

        for (i, file) in f.files().iter().enumerate() {
            assert_eq!(file.index, i as u64);
            assert_eq!(file.path, segment_path(dir.path(), "filldata", i as u64));
            assert_eq!(fs::metadata(&file.path).unwrap().len(), file.written);
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
        assert!(!f.io.is_open());
    }

    #[test]
    fn test_exact_multiple() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 8 * 1000, 4 * 1000, 1024);
        let mut f = filler(cfg, SegmentFile::new());
        assert_eq!(f.run().unwrap(), 8000);
        // No empty trailing segment is created.
        assert_eq!(sizes(f.files()), [4000, 4000]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_limit_smaller_than_buffer() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 1000, 300, 4096);
        let mut f = filler(cfg, SegmentFile::new());
        assert_eq!(f.run().unwrap(), 1000);
        assert_eq!(sizes(f.files()), [300, 300, 300, 100]);
    }

    #[test]
    fn test_zero_capacity() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 0, 4 * MIB, MIB as usize);
        let mut f = filler(cfg, SegmentFile::new());
        assert_eq!(f.run().unwrap(), 0);
        assert!(f.files().is_empty());
        assert!(f.completion.is_set());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_skip_existing() {
        let dir = tempdir().unwrap();
        let existing0 = segment_path(dir.path(), "filldata", 0);
        let existing2 = segment_path(dir.path(), "filldata", 2);
        fs::write(&existing0, b"keep me").unwrap();
        fs::write(&existing2, b"me too").unwrap();

        let cfg = config(&dir, 3000, 1000, 512);
        let mut f = filler(cfg, SegmentFile::new());
        assert_eq!(f.run().unwrap(), 3000);

        let indices: Vec<u64> = f.files().iter().map(|f| f.index).collect();
        assert_eq!(indices, [1, 3, 4]);
        assert_eq!(fs::read(&existing0).unwrap(), b"keep me");
        assert_eq!(fs::read(&existing2).unwrap(), b"me too");
    }

    /// Segment I/O where another writer grabs each path just before it is opened.
    struct ContendedSegment {
        inner: SegmentFile,
        grabbed: Vec<PathBuf>,
    }

    impl SegmentIo for ContendedSegment {
        fn create(&mut self, path: &Path) -> ah::Result<SegmentCreate> {
            if self.grabbed.len() < 2 {
                fs::write(path, b"other").unwrap();
                self.grabbed.push(path.to_path_buf());
            }
            self.inner.create(path)
        }

        fn write(&mut self, buffer: &[u8]) -> ah::Result<SegmentWrite> {
            self.inner.write(buffer)
        }

        fn close(&mut self) -> ah::Result<()> {
            self.inner.close()
        }

        fn is_open(&self) -> bool {
            self.inner.is_open()
        }
    }

    #[test]
    fn test_file_created_concurrently_is_kept() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 1500, 1000, 512);
        let io = ContendedSegment {
            inner: SegmentFile::new(),
            grabbed: Vec::new(),
        };
        let mut f = filler(cfg, io);
        assert_eq!(f.run().unwrap(), 1500);

        let indices: Vec<u64> = f.files().iter().map(|f| f.index).collect();
        assert_eq!(indices, [2, 3]);
        for path in &f.io.grabbed {
            assert_eq!(fs::read(path).unwrap(), b"other");
        }
    }

    #[test]
    fn test_skip_notice() {
        let path = Path::new("/mnt/filldata_0.bin");
        for quiet in [FillQuiet::Normal, FillQuiet::Reduced] {
            let notice = skip_notice(quiet, path).unwrap();
            assert_eq!(notice, "\nSkipping existing file: /mnt/filldata_0.bin");
        }
        assert_eq!(skip_notice(FillQuiet::NoInfo, path), None);
        assert_eq!(skip_notice(FillQuiet::NoWarn, path), None);
    }

    #[test]
    fn test_write_failure() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 10 * 1000, 4000, 1000);
        let mut f = filler(cfg, FaultySegment::new(2500, false));
        let err = f.run().unwrap_err();
        assert_eq!(err.to_string(), "Injected write fault");

        // Two chunks made it into the first segment.
        assert_eq!(f.total_written(), 2000);
        assert_eq!(f.counter.get(), 2000);
        assert_eq!(sizes(f.files()), [2000]);
        assert!(f.completion.is_set());
        assert!(!f.io.is_open());
        assert_eq!(f.io.closes, 1);
        assert_eq!(fs::metadata(&f.files()[0].path).unwrap().len(), 2000);
    }

    #[test]
    fn test_write_failure_in_later_segment() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 10 * 1000, 1000, 600);
        // Segments take a 600 byte chunk and a 400 byte tail.
        // The fault hits the tail of the second segment.
        let mut f = filler(cfg, FaultySegment::new(1700, false));
        assert!(f.run().is_err());
        assert_eq!(f.total_written(), 1600);
        assert_eq!(sizes(f.files()), [1000, 600]);
        let (io, files) = f.into_parts();
        assert!(!io.is_open());
        assert_eq!(io.closes, 2);
        assert_eq!(fs::metadata(&files[1].path).unwrap().len(), 600);
    }

    #[test]
    fn test_disk_full() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 10 * 1000, 4000, 1000);
        let mut f = filler(cfg, FaultySegment::new(4000, true));
        // Disk space runs out at the start of the second segment.
        let err = f.run().unwrap_err();
        assert!(err.to_string().starts_with("Out of disk space"));
        assert_eq!(f.total_written(), 4000);
        assert_eq!(sizes(f.files()), [4000, 0]);
        assert!(!f.io.is_open());
        assert_eq!(f.io.closes, 2);
    }

    #[test]
    fn test_open_failure() {
        let dir = tempdir().unwrap();
        let mut cfg = config(&dir, 1000, 4000, 1000);
        cfg.root = dir.path().join("gone");
        let mut f = filler(cfg, SegmentFile::new());
        let err = f.run().unwrap_err();
        assert!(err.to_string().starts_with("Failed to open file for writing"));
        assert_eq!(f.total_written(), 0);
        assert!(f.files().is_empty());
        assert!(f.completion.is_set());
    }

    #[test]
    fn test_random_content() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, 64 * 1024, 32 * 1024, 4096);
        let mut f = filler(cfg, SegmentFile::new());
        f.run().unwrap();
        let a = fs::read(&f.files()[0].path).unwrap();
        let b = fs::read(&f.files()[1].path).unwrap();
        assert_ne!(a, b);
        assert!(a.iter().any(|x| *x != a[0]));
    }

    #[test]
    fn test_validate() {
        let dir = tempdir().unwrap();
        let ok = config(&dir, 1000, 100, 10);
        ok.validate().unwrap();

        let mut c = ok.clone();
        c.file_size_limit = 0;
        assert!(c.validate().is_err());
        let mut c = ok.clone();
        c.buffer_size = 0;
        assert!(c.validate().is_err());
        let mut c = ok.clone();
        c.prefix = "a/b".to_string();
        assert!(c.validate().is_err());
        let mut c = ok.clone();
        c.prefix = String::new();
        assert!(c.validate().is_err());
        let mut c = ok;
        c.root = dir.path().join("does-not-exist");
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let c = FillConfig::new(Path::new("/mnt"), 42);
        assert_eq!(c.file_size_limit, 4 * 1024 * 1024 * 1024);
        assert_eq!(c.buffer_size, 1024 * 1024);
        assert_eq!(c.prefix, "filldata");
        assert_eq!(c.seed.len(), DEFAULT_SEED_LEN);
        assert_eq!(c.quiet, FillQuiet::Normal);
    }
}

// vim: ts=4 sw=4 expandtab
