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

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

/// Monotonic count of bytes written in a session.
///
/// Only the writer adds to it. Any number of observers may read it
/// at any time without taking a lock.
#[derive(Clone, Debug, Default)]
pub struct ByteCounter(Arc<AtomicU64>);

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&self, count: u64) {
        self.0.fetch_add(count, Ordering::Release);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// One-shot flag raised by the writer when its loop has exited.
#[derive(Clone, Debug, Default)]
pub struct CompletionSignal(Arc<AtomicBool>);

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Get a guard that raises the signal when dropped.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard(self.clone())
    }
}

/// Raises the [`CompletionSignal`] on every exit path, unwinding included.
pub struct CompletionGuard(CompletionSignal);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.set();
    }
}


// vim: ts=4 sw=4 expandtab
