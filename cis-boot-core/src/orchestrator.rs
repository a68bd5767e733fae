//! C8 — Update Orchestrator, grounded on
//! `original_source/CM7/Application/Src/update.c`'s `update_processPackageFile`.
//!
//! Verify first, so a bad package never touches flash. Back up both regions
//! before erasing either, so rollback stays possible even if the first erase
//! succeeds and the second write fails. Erase both before programming
//! either. File position is always set explicitly before a read stage — no
//! stage assumes where the previous one left the cursor.

use crate::config::BootConfig;
use crate::error::BootResult;
use crate::package::PackageHeader;
use crate::ports::{CrcAccumulator, File, FileSystem, FlashDriver};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::{extractor, flash_region, verify};

/// Number of phases `ProgressTracker` should be initialized with for a run
/// of [`run_update`].
pub const TOTAL_PHASES: u32 = 8;

/// Runs the eight phases against an already-open, already-parsed package.
/// Any phase's error aborts the pipeline immediately; the persistent state is
/// left untouched here — that is the Boot-Mode Selector's responsibility.
#[allow(clippy::too_many_arguments)]
pub fn run_update(
    file: &mut impl File,
    header: &PackageHeader,
    config: &BootConfig,
    flash: &mut impl FlashDriver,
    fs: &mut impl FileSystem,
    crc: &mut impl CrcAccumulator,
    chunk_buf: &mut [u8],
    tracker: &mut ProgressTracker,
    sink: &mut impl ProgressSink,
) -> BootResult<()> {
    let len = file.len()?;
    if len < crate::config::TRAILER_SIZE as u64 {
        return Err(crate::error::BootError::InvalidPackage);
    }
    let trailer_pos = len - crate::config::TRAILER_SIZE as u64;

    file.seek(trailer_pos)?;
    let mut trailer = [0u8; crate::config::TRAILER_SIZE];
    file.read_exact(&mut trailer)?;
    let expected = u32::from_le_bytes(trailer);

    // Phase 1: verify.
    verify::verify_against(file, chunk_buf, trailer_pos, expected, crc, |cur, total| {
        tracker.update(sink, 1, cur, total)
    })?;

    // Phase 2/3: back up both regions before any erase.
    flash_region::backup(
        fs,
        flash,
        config.region_a.start_addr,
        header.size_a,
        config.backup_a_path,
        config.backup_a_tmp_path,
        chunk_buf,
        |cur, total| tracker.update(sink, 2, cur, total),
    )?;
    flash_region::backup(
        fs,
        flash,
        config.region_b.start_addr,
        header.size_b,
        config.backup_b_path,
        config.backup_b_tmp_path,
        chunk_buf,
        |cur, total| tracker.update(sink, 3, cur, total),
    )?;

    // Phase 4/5: erase both regions before any program.
    flash_region::erase(flash, config.region_a, header.size_a, |cur, total| {
        tracker.update(sink, 4, cur, total)
    })?;
    flash_region::erase(flash, config.region_b, header.size_b, |cur, total| {
        tracker.update(sink, 5, cur, total)
    })?;

    // Phase 6/7: program both regions from the package body.
    file.seek(header.body_a_offset() as u64)?;
    flash_region::program(flash, file, config.region_a.start_addr, header.size_a, chunk_buf, |cur, total| {
        tracker.update(sink, 6, cur, total)
    })?;

    file.seek(header.body_b_offset() as u64)?;
    flash_region::program(flash, file, config.region_b.start_addr, header.size_b, chunk_buf, |cur, total| {
        tracker.update(sink, 7, cur, total)
    })?;

    // Phase 8: extract the auxiliary data tail.
    file.seek(header.body_ext_offset() as u64)?;
    extractor::extract_external(file, header.size_ext, fs, config.external_data_path, chunk_buf, |cur, total| {
        tracker.update(sink, 8, cur, total)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;
    use crate::package;
    use crate::progress::ProgressTracker;
    use crate::testutil::{MemFile, MemFlash, MemFs};
    use crate::verify::Crc32IsoHdlc;

    fn package_bytes(body_a: &[u8], body_b: &[u8], body_ext: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"BOOT");
        bytes.extend_from_slice(&(body_a.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(body_b.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(body_ext.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"v1.0.0\0\0");
        bytes.extend_from_slice(body_a);
        bytes.extend_from_slice(body_b);
        bytes.extend_from_slice(body_ext);
        let digest = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(&bytes);
        bytes.extend_from_slice(&digest.to_le_bytes());
        bytes
    }

    struct NullSink;
    impl ProgressSink for NullSink {
        fn report(&mut self, _percent: u32) {}
    }

    #[derive(Default)]
    struct RecordingSink(std::vec::Vec<u32>);
    impl ProgressSink for RecordingSink {
        fn report(&mut self, percent: u32) {
            self.0.push(percent);
        }
    }

    fn config() -> BootConfig {
        BootConfig {
            region_a: RegionConfig { start_addr: 0x0804_0000, capacity: 4096 },
            region_b: RegionConfig { start_addr: 0x0810_0000, capacity: 4096 },
            ..Default::default()
        }
    }

    #[test]
    fn runs_all_eight_phases_and_programs_both_regions() {
        let body_a = std::vec![0xAAu8; 96];
        let body_b = std::vec![0xBBu8; 64];
        let body_ext = std::vec![0xCCu8; 40];
        let bytes = package_bytes(&body_a, &body_b, &body_ext);
        let header_bytes: [u8; 24] = bytes[..24].try_into().unwrap();
        let header = package::parse_header(&header_bytes).unwrap();

        let mut file = MemFile::new(bytes);
        let config = config();
        let mut flash = MemFlash::new(config.region_a.start_addr, config.region_a.capacity, config.region_b.start_addr, config.region_b.capacity, 1024);
        let mut fs = MemFs::new();
        let mut crc_acc = Crc32IsoHdlc::new();
        let mut chunk = [0u8; 32];
        let mut tracker = ProgressTracker::init(TOTAL_PHASES);
        let mut sink = NullSink;

        run_update(&mut file, &header, &config, &mut flash, &mut fs, &mut crc_acc, &mut chunk, &mut tracker, &mut sink).unwrap();

        assert_eq!(flash.region_a_bytes(96), body_a.as_slice());
        assert_eq!(flash.region_b_bytes(64), body_b.as_slice());
        assert_eq!(fs.get(config.external_data_path).unwrap(), body_ext);
        assert!(fs.exists(config.backup_a_path).unwrap());
        assert!(fs.exists(config.backup_b_path).unwrap());
    }

    #[test]
    fn a_crc_mismatch_aborts_before_any_flash_mutation() {
        let body_a = std::vec![0xAAu8; 64];
        let mut bytes = package_bytes(&body_a, &[], &[]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let header_bytes: [u8; 24] = bytes[..24].try_into().unwrap();
        let header = package::parse_header(&header_bytes).unwrap();

        let mut file = MemFile::new(bytes);
        let config = config();
        let mut flash = MemFlash::new(config.region_a.start_addr, config.region_a.capacity, config.region_b.start_addr, config.region_b.capacity, 1024);
        let mut fs = MemFs::new();
        let mut crc_acc = Crc32IsoHdlc::new();
        let mut chunk = [0u8; 32];
        let mut tracker = ProgressTracker::init(TOTAL_PHASES);
        let mut sink = NullSink;

        let result = run_update(&mut file, &header, &config, &mut flash, &mut fs, &mut crc_acc, &mut chunk, &mut tracker, &mut sink);
        assert_eq!(result, Err(crate::error::BootError::CrcMismatch));
        assert!(!fs.exists(config.backup_a_path).unwrap());
        assert_eq!(flash.region_a_bytes(64), std::vec![0xFFu8; 64].as_slice());
    }

    #[test]
    fn progress_is_monotone_and_ends_at_100() {
        let body_a = std::vec![1u8; 64];
        let body_b = std::vec![2u8; 64];
        let bytes = package_bytes(&body_a, &body_b, &[]);
        let header_bytes: [u8; 24] = bytes[..24].try_into().unwrap();
        let header = package::parse_header(&header_bytes).unwrap();

        let mut file = MemFile::new(bytes);
        let config = config();
        let mut flash = MemFlash::new(config.region_a.start_addr, config.region_a.capacity, config.region_b.start_addr, config.region_b.capacity, 1024);
        let mut fs = MemFs::new();
        let mut crc_acc = Crc32IsoHdlc::new();
        let mut chunk = [0u8; 32];
        let mut tracker = ProgressTracker::init(TOTAL_PHASES);
        let mut sink = RecordingSink::default();

        run_update(&mut file, &header, &config, &mut flash, &mut fs, &mut crc_acc, &mut chunk, &mut tracker, &mut sink).unwrap();

        assert_eq!(sink.0.last(), Some(&100));
        assert!(sink.0.windows(2).all(|w| w[0] <= w[1]));
    }
}
