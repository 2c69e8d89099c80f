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

mod args;

use anyhow as ah;
use args::{Args, parse_args};
use chrono::prelude::*;
use std::{
    env::args_os,
    io::{BufRead as _, Write as _, stdin, stdout},
    path::Path,
};
use usbfill_lib::{FillConfig, FillQuiet, FillSession, prettybytes};
use usbfill_volume::{Volume, VolumeOsIntf as _};

/// Warn about data destruction and ask the user to go ahead.
/// Returns true, if the user answered with yes.
fn confirm(root: &Path, capacity: u64) -> ah::Result<bool> {
    println!(
        "WARNING: This will fill {} of free space on {:?} with random data.",
        prettybytes(capacity),
        root
    );
    println!("The free space can not be used until the created files are deleted.");
    print!("Do you want to proceed? (y/n): ");
    stdout().flush()?;

    let mut answer = String::new();
    stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y"))
}

fn print_seed(seed: &str) {
    println!("The generated --seed is:\n    {seed}");
    println!("Use this seed to reproduce the written data.\n");
}

/// Build the session parameters from the command line.
/// A random seed is generated, if none was given.
fn new_config(args: &Args, root: &Path, capacity: u64) -> FillConfig {
    let mut config = FillConfig::new(root, capacity);
    config.prefix.clone_from(&args.prefix);
    config.file_size_limit = args.file_size;
    config.buffer_size = args.buffer_size;
    if let Some(seed) = &args.seed {
        config.seed.clone_from(seed);
    }
    config.quiet = args.quiet;
    config
}

/// Main program entry point.
fn main() -> ah::Result<()> {
    let args = parse_args(args_os())?;

    let volume = Volume::resolve(&args.volume)?;
    if !args.force && !volume.is_removable()? {
        return Err(ah::format_err!(
            "{:?} is not on a removable USB drive. \
             Use --force to fill it anyway.",
            volume.root()
        ));
    }

    let free = volume.free_bytes()?;
    let capacity = free.min(args.max_bytes);

    if !args.yes && !confirm(volume.root(), capacity)? {
        println!("Operation canceled by user.");
        return Ok(());
    }

    let config = new_config(&args, volume.root(), capacity);
    let session = FillSession::new(config)?;
    if args.quiet < FillQuiet::NoInfo {
        if args.seed.is_none() {
            print_seed(&session.config().seed);
        }
        println!(
            "[{}] Filling {:?} with {} ({} free) ...",
            Local::now().format("%F %R"),
            volume.root(),
            prettybytes(capacity),
            prettybytes(free),
        );
    }

    let report = session.run();
    if args.quiet < FillQuiet::NoInfo || !report.is_ok() {
        println!("{}", report.summary());
    }
    if report.is_ok() && args.quiet == FillQuiet::Normal {
        println!("Done!");
    }

    report.result
}

// vim: ts=4 sw=4 expandtab
