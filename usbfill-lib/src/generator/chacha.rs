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
use crate::util::fold;
use rand::{RngCore as _, SeedableRng as _};
use rand_chacha::ChaCha8Rng;

/// ChaCha8 stream generator.
///
/// Eight rounds are plenty for making the written data unpredictable
/// and the reduced round count keeps the generator ahead of USB media.
pub struct GeneratorChaCha8 {
    rng: ChaCha8Rng,
}

impl GeneratorChaCha8 {
    /// Size of the ChaCha key, in bytes.
    const KEY_SIZE: usize = 32;

    pub fn new(seed: &[u8]) -> Self {
        let mut key = [0_u8; Self::KEY_SIZE];
        key.copy_from_slice(&fold(seed, Self::KEY_SIZE));
        Self {
            rng: ChaCha8Rng::from_seed(key),
        }
    }
}

impl NextRandom for GeneratorChaCha8 {
    fn fill(&mut self, buf: &mut [u8]) {
        self.rng.fill_bytes(buf);
    }
}


// vim: ts=4 sw=4 expandtab
