// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Package assembly and verification, grounded on `spec.md` §6's exact
//! binary layout and reusing `cis_boot_core::package`/`cis_boot_core::verify`
//! so this tool and the on-device parser can never silently drift apart.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};

use cis_boot_core::config::{HEADER_SIZE, PACKAGE_MAGIC};
use cis_boot_core::package;
use cis_boot_core::testutil::MemFile;
use cis_boot_core::verify;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Builds `output` from `image_a`, `image_b`, and an optional `ext_data`
/// blob: 24-byte header, the three bodies back to back, then a 4-byte LE
/// CRC-32/ISO-HDLC trailer over everything preceding it.
pub fn build(
    image_a: &Path,
    image_b: &Path,
    ext_data: Option<&Path>,
    version: &str,
    output: &Path,
) -> Result<()> {
    let body_a = fs::read(image_a).with_context(|| format!("reading {}", image_a.display()))?;
    let body_b = fs::read(image_b).with_context(|| format!("reading {}", image_b.display()))?;
    let body_ext = match ext_data {
        Some(p) => fs::read(p).with_context(|| format!("reading {}", p.display()))?,
        None => Vec::new(),
    };

    if version.len() > 8 {
        bail!("version string {:?} is longer than 8 bytes", version);
    }

    let mut bytes = Vec::with_capacity(HEADER_SIZE + body_a.len() + body_b.len() + body_ext.len() + 4);
    bytes.extend_from_slice(&PACKAGE_MAGIC);
    bytes.extend_from_slice(&(body_a.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&(body_b.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&(body_ext.len() as u32).to_le_bytes());
    let mut version_field = [0u8; 8];
    version_field[..version.len()].copy_from_slice(version.as_bytes());
    bytes.extend_from_slice(&version_field);

    bytes.extend_from_slice(&body_a);
    bytes.extend_from_slice(&body_b);
    bytes.extend_from_slice(&body_ext);

    let digest = CRC32.checksum(&bytes);
    bytes.extend_from_slice(&digest.to_le_bytes());

    fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;

    println!(
        "wrote {} ({} bytes: {} header + {} + {} + {} bodies + 4 trailer)",
        output.display(),
        bytes.len(),
        HEADER_SIZE,
        body_a.len(),
        body_b.len(),
        body_ext.len(),
    );
    Ok(())
}

/// Parses the header and runs the same `verify` the bootloader does on
/// device, against an in-memory copy of the file.
pub fn check(file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    if bytes.len() < HEADER_SIZE {
        bail!("file is shorter than the {}-byte header", HEADER_SIZE);
    }

    let header_bytes: [u8; HEADER_SIZE] = bytes[..HEADER_SIZE].try_into().unwrap();
    let header = package::parse_header(&header_bytes).map_err(|_| anyhow::anyhow!("bad magic"))?;

    let expected_len = header.expected_total_len();
    if bytes.len() as u64 != expected_len {
        bail!(
            "length mismatch: file is {} bytes, header implies {}",
            bytes.len(),
            expected_len
        );
    }

    let mut file = MemFile::new(bytes);
    let mut chunk = [0u8; 4096];
    verify::verify(&mut file, &mut chunk).map_err(|e| anyhow::anyhow!("{:?}", e))?;

    let mut version_buf = [0u8; package::VERSION_LEN + 1];
    println!(
        "OK: size_a={} size_b={} size_ext={} version={:?}",
        header.size_a,
        header.size_b,
        header.size_ext,
        header.version_str(&mut version_buf)
    );
    Ok(())
}
