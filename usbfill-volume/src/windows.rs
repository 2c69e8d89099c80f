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

use super::VolumeOsIntf;
use anyhow as ah;
use std::{
    ffi::OsStr,
    io,
    iter::once,
    mem::size_of,
    os::windows::ffi::OsStrExt as _,
    path::{Path, PathBuf},
    ptr::null_mut,
};
use winapi::{
    ctypes::c_void,
    shared::{minwindef::DWORD, ntdef::ULARGE_INTEGER},
    um::{
        fileapi::{CreateFileW, GetDiskFreeSpaceExW, GetDriveTypeW, OPEN_EXISTING},
        handleapi::{CloseHandle, INVALID_HANDLE_VALUE},
        ioapiset::DeviceIoControl,
        winbase::DRIVE_REMOVABLE,
        winioctl::{
            IOCTL_STORAGE_QUERY_PROPERTY, PropertyStandardQuery, STORAGE_DEVICE_DESCRIPTOR,
            STORAGE_PROPERTY_QUERY, StorageDeviceProperty,
        },
        winnt::{FILE_SHARE_READ, FILE_SHARE_WRITE},
    },
};

/// `STORAGE_BUS_TYPE::BusTypeUsb`
const BUS_TYPE_USB: u32 = 7;

/// Mounted volume on Windows.
pub struct VolumeWindows {
    root: PathBuf,
    /// Drive letter, if the volume was given as one.
    letter: Option<char>,
}

fn to_wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(once(0)).collect()
}

/// Parse a drive letter argument such as `E`, `e:` or `E:\`.
fn parse_drive_letter(volume: &str) -> Option<char> {
    let re = regex::Regex::new(r"^([a-zA-Z]):?\\?$").ok()?;
    let caps = re.captures(volume)?;
    caps.get(1)?
        .as_str()
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
}

impl VolumeWindows {
    /// Query the bus type of the drive through the raw volume handle.
    fn is_usb_bus(letter: char) -> ah::Result<bool> {
        let raw = to_wide(OsStr::new(&format!("\\\\.\\{letter}:")));
        // SAFETY: raw is a NUL terminated wide string. No access rights are requested.
        let handle = unsafe {
            CreateFileW(
                raw.as_ptr(),
                0,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                null_mut(),
                OPEN_EXISTING,
                0,
                null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(ah::format_err!(
                "Failed to open handle for drive {}: {}",
                letter,
                io::Error::last_os_error()
            ));
        }

        let mut query = STORAGE_PROPERTY_QUERY::default();
        query.PropertyId = StorageDeviceProperty;
        query.QueryType = PropertyStandardQuery;
        let mut buffer = [0_u8; 1024];
        let mut returned: DWORD = 0;
        // SAFETY: handle is valid, query and buffer are live for the call
        // and their sizes are passed along.
        let ok = unsafe {
            DeviceIoControl(
                handle,
                IOCTL_STORAGE_QUERY_PROPERTY,
                &mut query as *mut _ as *mut c_void,
                size_of::<STORAGE_PROPERTY_QUERY>() as DWORD,
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len() as DWORD,
                &mut returned,
                null_mut(),
            )
        };
        let err = io::Error::last_os_error();
        // SAFETY: handle is valid and not used afterwards.
        unsafe { CloseHandle(handle) };
        if ok == 0 {
            return Err(ah::format_err!(
                "Failed to get the bus type of drive {}: {}",
                letter,
                err
            ));
        }
        if (returned as usize) < size_of::<STORAGE_DEVICE_DESCRIPTOR>() {
            return Ok(false);
        }

        // SAFETY: The buffer holds a complete descriptor. It may be unaligned.
        let desc = unsafe {
            std::ptr::read_unaligned(buffer.as_ptr() as *const STORAGE_DEVICE_DESCRIPTOR)
        };
        Ok(desc.BusType == BUS_TYPE_USB)
    }
}

impl VolumeOsIntf for VolumeWindows {
    fn resolve(volume: &str) -> ah::Result<Self> {
        let letter = parse_drive_letter(volume);
        let root = match letter {
            Some(l) => PathBuf::from(format!("{l}:\\")),
            None => PathBuf::from(volume),
        };
        if !root.is_dir() {
            return Err(ah::format_err!("Volume {:?} is not a directory.", root));
        }
        Ok(Self { root, letter })
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn free_bytes(&self) -> ah::Result<u64> {
        let root = to_wide(self.root.as_os_str());
        let mut avail = ULARGE_INTEGER::default();
        // SAFETY: root is a NUL terminated wide string, avail is writable.
        let ok = unsafe { GetDiskFreeSpaceExW(root.as_ptr(), &mut avail, null_mut(), null_mut()) };
        if ok == 0 {
            return Err(ah::format_err!(
                "Failed to get disk space information of {:?}: {}",
                self.root,
                io::Error::last_os_error()
            ));
        }
        // SAFETY: The union was filled in by GetDiskFreeSpaceExW().
        Ok(unsafe { *avail.QuadPart() })
    }

    fn is_removable(&self) -> ah::Result<bool> {
        let Some(letter) = self.letter else {
            // Only whole drives given by letter are probed.
            return Ok(false);
        };
        let root = to_wide(self.root.as_os_str());
        // SAFETY: root is a NUL terminated wide string.
        let drive_type = unsafe { GetDriveTypeW(root.as_ptr()) };
        if drive_type != DRIVE_REMOVABLE {
            return Ok(false);
        }
        Self::is_usb_bus(letter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drive_letter() {
        assert_eq!(parse_drive_letter("E"), Some('E'));
        assert_eq!(parse_drive_letter("e:"), Some('E'));
        assert_eq!(parse_drive_letter("F:\\"), Some('F'));
        assert_eq!(parse_drive_letter("EF"), None);
        assert_eq!(parse_drive_letter("E:\\dir"), None);
        assert_eq!(parse_drive_letter(""), None);
    }
}

// vim: ts=4 sw=4 expandtab
