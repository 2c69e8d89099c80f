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

use crate::filler::FillQuiet;
use crate::shared::{ByteCounter, CompletionSignal};
use crate::util::{format_with_separators, prettybytes};
use anyhow as ah;
use std::{
    io::Write,
    thread,
    time::{Duration, Instant},
};

/// Sampling interval of the live progress line.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Granularity of the completion check while waiting for the next sample.
const POLL_SLICE: Duration = Duration::from_millis(10);

const BAR_WIDTH: usize = 50;

/// Progress at one point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSnapshot {
    pub bytes_done: u64,
    pub target: u64,
    pub elapsed: Duration,
    /// The writer has finished.
    pub done: bool,
}

impl ProgressSnapshot {
    /// Completed fraction in the range 0.0 to 1.0.
    pub fn fraction(&self) -> f64 {
        if self.target == 0 {
            1.0
        } else {
            (self.bytes_done as f64 / self.target as f64).min(1.0)
        }
    }

    /// Average rate since session start, in bytes per second.
    pub fn rate(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.bytes_done as f64 / secs) as u64
        } else {
            0
        }
    }

    /// ETA in whole minutes: elapsed time scaled up by the completed fraction.
    /// None while nothing has been written.
    pub fn eta_minutes(&self) -> Option<u64> {
        if self.done {
            return Some(0);
        }
        let fraction = self.fraction();
        if fraction <= 0.0 {
            return None;
        }
        let secs = self.elapsed.as_secs_f64();
        Some((secs / fraction / 60.0) as u64)
    }

    /// Render the progress line, starting with a carriage return.
    pub fn render(&self) -> String {
        let fraction = self.fraction();
        let pos = ((BAR_WIDTH as f64 * fraction) as usize).min(BAR_WIDTH);
        let eta = match self.eta_minutes() {
            Some(m) => format!("{m} minutes"),
            None => "calculating".to_string(),
        };
        format!(
            "\r[{}{}] {:6.2}% {}/{} bytes {}/s Remaining: {}   ",
            "=".repeat(pos),
            " ".repeat(BAR_WIDTH - pos),
            fraction * 100.0,
            format_with_separators(self.bytes_done),
            format_with_separators(self.target),
            prettybytes(self.rate()),
            eta,
        )
    }
}

/// Periodic progress sampler.
///
/// Reads the shared byte counter at a fixed cadence until the writer
/// raises the completion signal, then renders one last line from the
/// final counter value.
pub struct Reporter {
    counter: ByteCounter,
    completion: CompletionSignal,
    target: u64,
    start: Instant,
    interval: Duration,
    quiet: FillQuiet,
}

impl Reporter {
    pub fn new(
        counter: ByteCounter,
        completion: CompletionSignal,
        target: u64,
        start: Instant,
        quiet: FillQuiet,
    ) -> Self {
        Self {
            counter,
            completion,
            target,
            start,
            interval: PROGRESS_INTERVAL,
            quiet,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn snapshot(&self, done: bool) -> ProgressSnapshot {
        ProgressSnapshot {
            bytes_done: self.counter.get(),
            target: self.target,
            elapsed: self.start.elapsed(),
            done,
        }
    }

    /// Sleep until the next sample is due or the writer has finished.
    fn wait_interval(&self) {
        let deadline = Instant::now() + self.interval;
        while !self.completion.is_set() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(POLL_SLICE.min(deadline - now));
        }
    }

    fn print(out: &mut impl Write, snapshot: &ProgressSnapshot) -> ah::Result<()> {
        out.write_all(snapshot.render().as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Run the sampling loop. Returns the final snapshot.
    pub fn run(&self, out: &mut impl Write) -> ah::Result<ProgressSnapshot> {
        while !self.completion.is_set() {
            if self.quiet == FillQuiet::Normal {
                Self::print(out, &self.snapshot(false))?;
            }
            self.wait_interval();
        }

        // The counter is read after the signal has been observed,
        // so this sample includes the writer's last chunk.
        let last = self.snapshot(true);
        if self.quiet <= FillQuiet::Reduced {
            Self::print(out, &last)?;
            writeln!(out)?;
        }
        Ok(last)
    }
}


// vim: ts=4 sw=4 expandtab
