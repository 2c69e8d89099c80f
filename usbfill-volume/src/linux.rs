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
    ffi::CString,
    fs::{canonicalize, metadata, read_to_string},
    io,
    mem::MaybeUninit,
    os::unix::{ffi::OsStrExt as _, fs::MetadataExt as _},
    path::{Path, PathBuf},
};

const SYSFS: &str = "/sys";

/// Mounted volume on Linux.
pub struct VolumeLinux {
    root: PathBuf,
}

/// Split a `st_dev` value into its major and minor number.
fn dev_major_minor(dev: u64) -> (u64, u64) {
    let major = ((dev >> 8) & 0xfff) | ((dev >> 32) & !0xfff);
    let minor = (dev & 0xff) | ((dev >> 12) & !0xff);
    (major, minor)
}

/// Look up the block device `major:minor` in sysfs.
/// Returns true, if the whole disk is flagged removable and hangs off a USB bus.
fn sysfs_is_removable_usb(sysfs: &Path, major: u64, minor: u64) -> ah::Result<bool> {
    let link = sysfs.join(format!("dev/block/{major}:{minor}"));
    let Ok(mut dev_dir) = canonicalize(&link) else {
        // Not backed by a block device (tmpfs, network, ...).
        return Ok(false);
    };
    if dev_dir.join("partition").exists() {
        // The removable flag is kept by the parent disk.
        dev_dir.pop();
    }

    let removable = match read_to_string(dev_dir.join("removable")) {
        Ok(flag) => flag.trim() == "1",
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            return Err(ah::format_err!(
                "Failed to read removable flag of {:?}: {}",
                dev_dir,
                e
            ));
        }
    };
    let usb = dev_dir
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with("usb"));

    Ok(removable && usb)
}

impl VolumeOsIntf for VolumeLinux {
    fn resolve(volume: &str) -> ah::Result<Self> {
        let root = match canonicalize(volume) {
            Ok(p) => p,
            Err(e) => {
                return Err(ah::format_err!("Failed to resolve volume {:?}: {}", volume, e));
            }
        };
        if !root.is_dir() {
            return Err(ah::format_err!(
                "Volume {:?} is not a directory. \
                 Please mount the device and pass its mount point.",
                root
            ));
        }
        Ok(Self { root })
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn free_bytes(&self) -> ah::Result<u64> {
        let Ok(cpath) = CString::new(self.root.as_os_str().as_bytes()) else {
            return Err(ah::format_err!("Failed to convert path {:?}.", self.root));
        };
        let mut st = MaybeUninit::<libc::statvfs>::uninit();
        // SAFETY: cpath is a valid NUL terminated string and st points to
        // writable memory of the size of a statvfs struct.
        let res = unsafe { libc::statvfs(cpath.as_ptr(), st.as_mut_ptr()) };
        if res != 0 {
            return Err(ah::format_err!(
                "Failed to get disk space information of {:?}: {}",
                self.root,
                io::Error::last_os_error()
            ));
        }
        // SAFETY: statvfs() succeeded and initialized the struct.
        let st = unsafe { st.assume_init() };

        #[allow(clippy::useless_conversion)]
        let free = u64::from(st.f_bavail).saturating_mul(u64::from(st.f_frsize));
        Ok(free)
    }

    fn is_removable(&self) -> ah::Result<bool> {
        let meta = match metadata(&self.root) {
            Ok(m) => m,
            Err(e) => {
                return Err(ah::format_err!("Failed to stat {:?}: {}", self.root, e));
            }
        };
        let (major, minor) = dev_major_minor(meta.dev());
        sysfs_is_removable_usb(Path::new(SYSFS), major, minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    #[test]
    fn test_dev_major_minor() {
        assert_eq!(dev_major_minor(0x0811), (8, 17));
        assert_eq!(dev_major_minor(0xb300), (179, 0));
        // Large minor numbers spill into the upper bits.
        assert_eq!(dev_major_minor(0x0011_0300), (259, 256));
    }

    fn fake_sysfs(removable: &str, bus: &str) -> tempfile::TempDir {
        let sys = tempdir().unwrap();
        let disk = sys
            .path()
            .join(format!("devices/pci0000:00/0000:00:14.0/{bus}/2-1/host6/block/sdb"));
        let part = disk.join("sdb1");
        create_dir_all(&part).unwrap();
        write(disk.join("removable"), removable).unwrap();
        write(part.join("partition"), "1\n").unwrap();
        create_dir_all(sys.path().join("dev/block")).unwrap();
        symlink(&part, sys.path().join("dev/block/8:17")).unwrap();
        symlink(&disk, sys.path().join("dev/block/8:16")).unwrap();
        sys
    }

    #[test]
    fn test_sysfs_usb_stick() {
        let sys = fake_sysfs("1\n", "usb2");
        assert!(sysfs_is_removable_usb(sys.path(), 8, 17).unwrap());
        assert!(sysfs_is_removable_usb(sys.path(), 8, 16).unwrap());
    }

    #[test]
    fn test_sysfs_fixed_disk() {
        let sys = fake_sysfs("0\n", "usb2");
        assert!(!sysfs_is_removable_usb(sys.path(), 8, 17).unwrap());
        let sys = fake_sysfs("1\n", "ata1");
        assert!(!sysfs_is_removable_usb(sys.path(), 8, 17).unwrap());
    }

    #[test]
    fn test_sysfs_no_block_device() {
        let sys = fake_sysfs("1\n", "usb2");
        assert!(!sysfs_is_removable_usb(sys.path(), 0, 42).unwrap());
    }

    #[test]
    fn test_resolve() {
        let dir = tempdir().unwrap();
        let vol = VolumeLinux::resolve(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(vol.root(), canonicalize(dir.path()).unwrap());
        assert!(vol.free_bytes().is_ok());
        assert!(vol.is_removable().is_ok());

        let file = dir.path().join("file");
        write(&file, b"x").unwrap();
        assert!(VolumeLinux::resolve(file.to_str().unwrap()).is_err());
        assert!(VolumeLinux::resolve(dir.path().join("nope").to_str().unwrap()).is_err());
    }
}

// vim: ts=4 sw=4 expandtab
