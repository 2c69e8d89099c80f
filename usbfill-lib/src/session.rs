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

use crate::filler::{FillConfig, FillQuiet, Filler};
use crate::generator::GeneratorChaCha8;
use crate::progress::{PROGRESS_INTERVAL, Reporter};
use crate::segment::{OutputFile, SegmentFile, SegmentIo};
use crate::shared::{ByteCounter, CompletionSignal};
use crate::util::{Hhmmss as _, format_with_separators, prettybytes};
use anyhow as ah;
use std::{
    io::{Write, stdout},
    thread,
    time::{Duration, Instant},
};

/// Outcome of a fill session.
///
/// The byte total and the file list are valid even if `result` is an error.
#[derive(Debug)]
pub struct FillReport {
    pub total_written: u64,
    pub files: Vec<OutputFile>,
    pub elapsed: Duration,
    pub result: ah::Result<()>,
}

impl FillReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Human readable summary line.
    pub fn summary(&self) -> String {
        format!(
            "Total bytes written: {} ({}) in {} file{}, took {}.",
            format_with_separators(self.total_written),
            prettybytes(self.total_written),
            self.files.len(),
            if self.files.len() == 1 { "" } else { "s" },
            self.elapsed.hhmmss(),
        )
    }
}

/// One run of the writer and the progress reporter.
pub struct FillSession {
    config: FillConfig,
    interval: Duration,
}

impl FillSession {
    pub fn new(config: FillConfig) -> ah::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            interval: PROGRESS_INTERVAL,
        })
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    /// Fill the volume with regular segment files, reporting to stdout.
    pub fn run(self) -> FillReport {
        self.run_with(SegmentFile::new(), stdout())
    }

    /// Fill the volume through `io`, rendering progress to `out`.
    ///
    /// The writer runs on the calling thread, the reporter on its own.
    pub fn run_with<S, W>(self, io: S, mut out: W) -> FillReport
    where
        S: SegmentIo,
        W: Write + Send + 'static,
    {
        let counter = ByteCounter::new();
        let completion = CompletionSignal::new();
        let start = Instant::now();
        let quiet = self.config.quiet;

        let reporter = Reporter::new(
            counter.clone(),
            completion.clone(),
            self.config.target_capacity,
            start,
            quiet,
        )
        .with_interval(self.interval);
        let reporter_thread = match thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || reporter.run(&mut out))
        {
            Ok(handle) => handle,
            Err(e) => {
                return FillReport {
                    total_written: 0,
                    files: Vec::new(),
                    elapsed: start.elapsed(),
                    result: Err(ah::format_err!("Failed to start progress reporter: {}", e)),
                };
            }
        };

        let generator = GeneratorChaCha8::new(self.config.seed.as_bytes());
        let mut filler = Filler::new(self.config, io, generator, counter.clone(), completion);
        let result = filler.run().map(|_| ());

        match reporter_thread.join() {
            Ok(Ok(_)) => (),
            Ok(Err(e)) => {
                if quiet < FillQuiet::NoWarn {
                    eprintln!("Warning: Progress output failed: {e}");
                }
            }
            Err(_) => {
                if quiet < FillQuiet::NoWarn {
                    eprintln!("Warning: Progress reporter panicked.");
                }
            }
        }

        let (_, files) = filler.into_parts();
        FillReport {
            total_written: counter.get(),
            files,
            elapsed: start.elapsed(),
            result,
        }
    }
}


// vim: ts=4 sw=4 expandtab
