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

mod chacha;

pub use crate::generator::chacha::GeneratorChaCha8;

/// Source of fill data.
pub trait NextRandom: Send {
    /// Overwrite the whole buffer with uniformly distributed random bytes.
    fn fill(&mut self, buf: &mut [u8]);
}

// vim: ts=4 sw=4 expandtab
