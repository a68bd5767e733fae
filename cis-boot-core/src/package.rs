//! C3 — Package Format Parser.
//!
//! Grounded on `original_source/CM7/Application/Src/update.c`'s
//! `update_processPackageFile`: magic is checked before any size field is
//! even looked at, so a corrupt header never drives arithmetic on garbage.

use crate::config::{HEADER_SIZE, PACKAGE_MAGIC};
use crate::error::{BootError, BootResult};

/// Raw 8-byte version field, right-padded with NUL or space.
pub const VERSION_LEN: usize = 8;

/// Fixed 24-byte package header: magic, three region sizes, and a raw
/// version field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageHeader {
    pub size_a: u32,
    pub size_b: u32,
    pub size_ext: u32,
    /// Raw 8-byte version field, unchanged from the wire (not yet NUL-terminated).
    pub version_raw: [u8; VERSION_LEN],
}

impl PackageHeader {
    /// Body offset of region A's image (right after the header).
    pub fn body_a_offset(&self) -> u32 {
        HEADER_SIZE as u32
    }

    /// Body offset of region B's image.
    pub fn body_b_offset(&self) -> u32 {
        self.body_a_offset() + self.size_a
    }

    /// Body offset of the auxiliary data.
    pub fn body_ext_offset(&self) -> u32 {
        self.body_b_offset() + self.size_b
    }

    /// Total package length implied by the header plus the trailing CRC:
    /// `24 + size_a + size_b + size_ext + 4`.
    pub fn expected_total_len(&self) -> u64 {
        HEADER_SIZE as u64
            + self.size_a as u64
            + self.size_b as u64
            + self.size_ext as u64
            + crate::config::TRAILER_SIZE as u64
    }

    /// Copy the version into a NUL-terminated buffer, as
    /// `original_source/CM7/Application/Src/update.c` does when it builds
    /// its local `char version[9]`. `buf` must be at least `VERSION_LEN + 1`.
    pub fn version_str<'a>(&self, buf: &'a mut [u8; VERSION_LEN + 1]) -> &'a str {
        buf[..VERSION_LEN].copy_from_slice(&self.version_raw);
        buf[VERSION_LEN] = 0;
        let nul_pos = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        core::str::from_utf8(&buf[..nul_pos]).unwrap_or("")
    }
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Parses a fixed-size header buffer. A header whose magic != `BOOT` yields
/// `InvalidPackage` before any other field is interpreted.
pub fn parse_header(bytes: &[u8; HEADER_SIZE]) -> BootResult<PackageHeader> {
    if bytes[0..4] != PACKAGE_MAGIC {
        return Err(BootError::InvalidPackage);
    }

    let size_a = read_u32_le(&bytes[4..8]);
    let size_b = read_u32_le(&bytes[8..12]);
    let size_ext = read_u32_le(&bytes[12..16]);
    let mut version_raw = [0u8; VERSION_LEN];
    version_raw.copy_from_slice(&bytes[16..24]);

    Ok(PackageHeader {
        size_a,
        size_b,
        size_ext,
        version_raw,
    })
}

/// Each region size must not exceed its reserved flash capacity.
pub fn validate_region_sizes(header: &PackageHeader, cap_a: u32, cap_b: u32) -> BootResult<()> {
    if header.size_a > cap_a || header.size_b > cap_b {
        return Err(BootError::InvalidPackage);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(size_a: u32, size_b: u32, size_ext: u32, version: &[u8; 8]) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"BOOT");
        buf[4..8].copy_from_slice(&size_a.to_le_bytes());
        buf[8..12].copy_from_slice(&size_b.to_le_bytes());
        buf[12..16].copy_from_slice(&size_ext.to_le_bytes());
        buf[16..24].copy_from_slice(version);
        buf
    }

    #[test]
    fn parses_a_well_formed_header() {
        let bytes = header_bytes(128, 64, 16, b"v1.2.3\0\0");
        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.size_a, 128);
        assert_eq!(header.size_b, 64);
        assert_eq!(header.size_ext, 16);
        let mut buf = [0u8; VERSION_LEN + 1];
        assert_eq!(header.version_str(&mut buf), "v1.2.3");
    }

    #[test]
    fn rejects_bad_magic_before_reading_sizes() {
        let mut bytes = header_bytes(0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, b"garbage\0");
        bytes[0..4].copy_from_slice(b"XXXX");
        assert_eq!(parse_header(&bytes), Err(BootError::InvalidPackage));
    }

    #[test]
    fn computes_body_offsets() {
        let bytes = header_bytes(128, 64, 16, b"v1\0\0\0\0\0\0");
        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.body_a_offset(), 24);
        assert_eq!(header.body_b_offset(), 24 + 128);
        assert_eq!(header.body_ext_offset(), 24 + 128 + 64);
        assert_eq!(header.expected_total_len(), 24 + 128 + 64 + 16 + 4);
    }

    #[test]
    fn rejects_oversized_region() {
        let bytes = header_bytes(2000, 64, 16, b"v1\0\0\0\0\0\0");
        let header = parse_header(&bytes).unwrap();
        assert_eq!(
            validate_region_sizes(&header, 1024, 1024),
            Err(BootError::InvalidPackage)
        );
    }
}
