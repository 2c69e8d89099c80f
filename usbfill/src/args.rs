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
use clap::builder::ValueParser;
use clap::error::ErrorKind::{DisplayHelp, DisplayVersion};
use clap::Parser;
use std::ffi::OsString;
use usbfill_lib::{FillConfig, FillQuiet, parsebytes};

/// Upper bound of the I/O chunk size.
const MAX_BUFFER_SIZE: u64 = 1024 * 1024 * 1024;

const ABOUT: &str = "\
Removable storage (USB stick, SD-Card) filler.

This program fills the free space of a removable volume with pseudo random data.
The data is written to a sequence of files, each of them at most --file-size bytes big.
Existing files are never overwritten.
";

#[cfg(not(target_os = "windows"))]
const EXAMPLE: &str = "\
Example usage:
usbfill /media/usbstick";

#[cfg(target_os = "windows")]
const EXAMPLE: &str = "\
Example usage:
usbfill E:";

#[cfg(not(target_os = "windows"))]
const HELP_VOLUME_LONG: &str = "\
Mount point of the volume to fill.
The files are created in this directory.";

#[cfg(target_os = "windows")]
const HELP_VOLUME_LONG: &str = "\
Drive letter (e.g. E or E:) or directory of the volume to fill.
The files are created in this directory.";

/// All command line arguments.
pub struct Args {
    pub volume: String,
    pub file_size: u64,
    pub buffer_size: usize,
    pub max_bytes: u64,
    pub prefix: String,
    pub seed: Option<String>,
    pub yes: bool,
    pub force: bool,
    pub quiet: FillQuiet,
}

#[derive(Debug, Parser)]
#[command(
    name = "usbfill",
    version = env!("CARGO_PKG_VERSION"),
    about = ABOUT,
    after_help = EXAMPLE,
    verbatim_doc_comment
)]
struct CliArgs {
    /// Volume to fill.
    #[arg(verbatim_doc_comment, value_name = "VOLUME", help = HELP_VOLUME_LONG)]
    volume: String,

    /// Maximum size of one output file.
    /// A new file is started whenever the current one reaches this size.
    /// The default fits the file size limit of FAT32 formatted media.
    #[arg(
        verbatim_doc_comment,
        short = 'F',
        long = "file-size",
        value_name = "BYTES",
        default_value = "4 GiB",
        value_parser = ValueParser::new(parsebytes)
    )]
    file_size: u64,

    /// Size of one write request.
    #[arg(
        verbatim_doc_comment,
        short = 'B',
        long = "buffer-size",
        value_name = "BYTES",
        default_value = "1 MiB",
        value_parser = ValueParser::new(parsebytes)
    )]
    buffer_size: u64,

    /// Number of bytes to write.
    /// If not given, then all free space of the volume will be filled.
    #[arg(
        verbatim_doc_comment,
        short = 'b',
        long = "bytes",
        value_name = "BYTES",
        default_value_t = u64::MAX,
        hide_default_value = true,
        value_parser = ValueParser::new(parsebytes)
    )]
    max_bytes: u64,

    /// Name prefix of the output files.
    /// The files are named PREFIX_N.bin with N counting up from 0.
    #[arg(
        verbatim_doc_comment,
        short = 'p',
        long = "prefix",
        value_name = "NAME",
        default_value = FillConfig::DEFAULT_PREFIX
    )]
    prefix: String,

    /// The seed to use for random number stream generation.
    /// If no seed is given, then a random seed will be generated.
    #[arg(verbatim_doc_comment, short = 'S', long = "seed", value_name = "SEED")]
    seed: Option<String>,

    /// Do not ask for confirmation before writing.
    #[arg(verbatim_doc_comment, short = 'y', long = "yes")]
    yes: bool,

    /// Also fill volumes that are not on removable USB media.
    #[arg(verbatim_doc_comment, short = 'f', long = "force")]
    force: bool,

    /// Quiet level:
    /// 0: Normal verboseness.
    /// 1: Reduced verboseness.
    /// 2: No informational output.
    /// 3: No warnings.
    #[arg(
        verbatim_doc_comment,
        short = 'q',
        long = "quiet",
        value_name = "LVL",
        default_value = "0",
        value_parser = parse_quiet
    )]
    quiet: FillQuiet,
}

impl CliArgs {
    fn into_args(self) -> ah::Result<Args> {
        if self.file_size == 0 {
            return Err(ah::format_err!("--file-size must not be zero."));
        }
        if self.buffer_size == 0 || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(ah::format_err!(
                "--buffer-size must be between 1 byte and 1 GiB."
            ));
        }
        let Ok(buffer_size) = usize::try_from(self.buffer_size) else {
            return Err(ah::format_err!("--buffer-size is too big."));
        };
        if self.seed.as_ref().is_some_and(String::is_empty) {
            return Err(ah::format_err!("--seed must not be empty."));
        }

        Ok(Args {
            volume: self.volume,
            file_size: self.file_size,
            buffer_size,
            max_bytes: self.max_bytes,
            prefix: self.prefix,
            seed: self.seed,
            yes: self.yes,
            force: self.force,
            quiet: self.quiet,
        })
    }
}

fn parse_quiet(value: &str) -> Result<FillQuiet, String> {
    let lvl = value.parse::<u8>().map_err(|e| e.to_string())?;
    let quiet = match lvl {
        x if x == FillQuiet::Normal as u8 => FillQuiet::Normal,
        x if x == FillQuiet::Reduced as u8 => FillQuiet::Reduced,
        x if x == FillQuiet::NoInfo as u8 => FillQuiet::NoInfo,
        x if x == FillQuiet::NoWarn as u8 => FillQuiet::NoWarn,
        _ => {
            return Err(format!(
                "Invalid quiet level '{value}'. Allowed: 0, 1, 2, 3."
            ));
        }
    };
    Ok(quiet)
}

/// Parse all command line arguments and put them into a structure.
pub fn parse_args<I, T>(args: I) -> ah::Result<Args>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match CliArgs::try_parse_from(args) {
        Ok(cli) => cli.into_args(),
        Err(e) => {
            if matches!(e.kind(), DisplayHelp | DisplayVersion) {
                print!("{e}");
                std::process::exit(0);
            }
            Err(ah::format_err!("{}", e))
        }
    }
}


// vim: ts=4 sw=4 expandtab
