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

use rand::Rng as _;
use rand::distr::Alphanumeric;

/// Length of a generated fill seed.
pub const DEFAULT_SEED_LEN: usize = 40;

/// Generate a new alphanumeric random seed from the thread RNG.
///
/// length: The number of ASCII characters to return.
pub fn gen_seed_string(length: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}


// vim: ts=4 sw=4 expandtab
