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

mod filler;
mod generator;
mod progress;
mod seed;
mod segment;
mod session;
mod shared;
mod util;

pub use filler::{FillConfig, FillQuiet, Filler};
pub use generator::{GeneratorChaCha8, NextRandom};
pub use progress::{PROGRESS_INTERVAL, ProgressSnapshot, Reporter};
pub use seed::{DEFAULT_SEED_LEN, gen_seed_string};
pub use segment::{
    OutputFile, SegmentCreate, SegmentFile, SegmentIo, SegmentWrite, segment_path,
};
pub use session::{FillReport, FillSession};
pub use shared::{ByteCounter, CompletionGuard, CompletionSignal};
pub use util::{format_with_separators, parsebytes, prettybytes};

// vim: ts=4 sw=4 expandtab
