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

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "windows")))]
std::compile_error!("Your operating system is not supported, yet.");

use anyhow as ah;
use std::path::Path;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

/// OS interface for probing the volume to be filled.
pub trait VolumeOsIntf: Sized {
    /// Resolve the user supplied volume argument to a root directory
    /// and check that it can be filled.
    fn resolve(volume: &str) -> ah::Result<Self>;

    /// Root directory of the volume.
    fn root(&self) -> &Path;

    /// Number of bytes the current user may still write to the volume.
    fn free_bytes(&self) -> ah::Result<u64>;

    /// Whether the volume lives on removable USB media.
    fn is_removable(&self) -> ah::Result<bool>;
}

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use crate::linux::VolumeLinux as Volume;

#[cfg(target_os = "windows")]
pub use crate::windows::VolumeWindows as Volume;

// vim: ts=4 sw=4 expandtab
