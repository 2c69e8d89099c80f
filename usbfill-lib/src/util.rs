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
use std::fmt::Write as _;
use std::time::Duration;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;
const PIB: u64 = 1024 * TIB;
const EIB: u64 = 1024 * PIB;

const KB: u64 = 1000;
const MB: u64 = 1000 * KB;
const GB: u64 = 1000 * MB;
const TB: u64 = 1000 * GB;
const PB: u64 = 1000 * TB;
const EB: u64 = 1000 * PB;

/// Byte count suffixes, longest match first.
const SUFFIXES: [(&str, u64); 18] = [
    ("eib", EIB),
    ("pib", PIB),
    ("tib", TIB),
    ("gib", GIB),
    ("mib", MIB),
    ("kib", KIB),
    ("eb", EB),
    ("pb", PB),
    ("tb", TB),
    ("gb", GB),
    ("mb", MB),
    ("kb", KB),
    ("e", EIB),
    ("p", PIB),
    ("t", TIB),
    ("g", GIB),
    ("m", MIB),
    ("k", KIB),
];

/// Render a byte count in binary units (kiB, MiB, GiB, ...).
pub fn prettybytes(count: u64) -> String {
    let mut ret = String::new();
    let _ = match count {
        0..KIB => write!(ret, "{count} bytes"),
        KIB..MIB => write!(ret, "{:.1} kiB", (count as f64) / (KIB as f64)),
        MIB..GIB => write!(ret, "{:.1} MiB", (count as f64) / (MIB as f64)),
        GIB..TIB => write!(ret, "{:.2} GiB", ((count / MIB) as f64) / (KIB as f64)),
        TIB..PIB => write!(ret, "{:.4} TiB", ((count / MIB) as f64) / (MIB as f64)),
        PIB..EIB => write!(ret, "{:.4} PiB", ((count / GIB) as f64) / (MIB as f64)),
        EIB..=u64::MAX => write!(ret, "{:.4} EiB", ((count / TIB) as f64) / (MIB as f64)),
    };
    ret
}

/// Format an integer with a comma between each group of three digits.
pub fn format_with_separators(n: u64) -> String {
    let digits = n.to_string();
    let mut ret = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            ret.push(',');
        }
        ret.push(c);
    }
    ret
}

fn try_one_parsebytes(s: &str, suffix: &str, factor: u64) -> ah::Result<u64> {
    let Some(s) = s.strip_suffix(suffix) else {
        return Err(ah::format_err!("Value suffix does not match."));
    };
    let s = s.trim();
    if let Ok(value) = s.parse::<u64>() {
        let Some(prod) = value.checked_mul(factor) else {
            return Err(ah::format_err!("Value integer overflow."));
        };
        Ok(prod)
    } else if let Ok(value) = s.parse::<f64>() {
        let factor = factor as f64;
        if value < 0.0 || value.log2() + factor.log2() >= 61.0 {
            return Err(ah::format_err!("Value float out of range."));
        }
        Ok((value * factor).round() as u64)
    } else {
        Err(ah::format_err!("Value is neither integer nor float."))
    }
}

/// Parse a byte count with an optional binary or decimal unit suffix.
pub fn parsebytes(s: &str) -> ah::Result<u64> {
    let s = s.trim().to_lowercase();
    SUFFIXES
        .iter()
        .find_map(|(suffix, factor)| try_one_parsebytes(&s, suffix, *factor).ok())
        .or_else(|| s.parse::<u64>().ok())
        .ok_or_else(|| ah::format_err!("Cannot parse byte count: {}", s))
}

pub trait Hhmmss {
    fn hhmmss(&self) -> String;
}

impl Hhmmss for Duration {
    fn hhmmss(&self) -> String {
        let secs = self.as_secs();
        let secs_lim = (99 * 60 * 60) + (59 * 60) + 59;
        let lim = if secs > secs_lim { ">" } else { "" };
        let secs = secs.min(secs_lim);
        let h = secs / (60 * 60);
        let m = (secs % (60 * 60)) / 60;
        let s = secs % 60;
        format!("{lim}{h:02}h:{m:02}m:{s:02}s")
    }
}

/// Fold a byte slice into a smaller byte vector using XOR operation.
/// If `output_size` is bigger than `input.len()`, the trailing bytes
/// will be filled with zeros.
pub fn fold(input: &[u8], output_size: usize) -> Vec<u8> {
    let mut output = vec![0; output_size];
    if output_size > 0 {
        for (i, data) in input.iter().enumerate() {
            output[i % output_size] ^= data;
        }
    }
    output
}


// vim: ts=4 sw=4 expandtab
