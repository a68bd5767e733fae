//! C9 — Rollback Orchestrator. Entered only when the
//! Boot-Mode Selector observes `TESTING` at startup — the previous probe
//! never confirmed itself.

use crate::config::BootConfig;
use crate::error::{BootError, BootResult};
use crate::ports::{File, FileSystem, FlashDriver};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::flash_region;

/// Number of phases `ProgressTracker` should be initialized with for a run
/// of [`run_rollback`].
pub const TOTAL_PHASES: u32 = 4;

/// Erases and re-programs both regions from their saved backups. Both
/// backups must exist up front — a partial rollback is worse than refusing
/// to start one.
pub fn run_rollback(
    config: &BootConfig,
    flash: &mut impl FlashDriver,
    fs: &mut impl FileSystem,
    chunk_buf: &mut [u8],
    tracker: &mut ProgressTracker,
    sink: &mut impl ProgressSink,
) -> BootResult<()> {
    if !fs.exists(config.backup_a_path)? || !fs.exists(config.backup_b_path)? {
        return Err(BootError::NoBackup);
    }

    let mut backup_a = fs.open_read(config.backup_a_path)?;
    let size_a = backup_a.len()? as u32;
    let mut backup_b = fs.open_read(config.backup_b_path)?;
    let size_b = backup_b.len()? as u32;

    flash_region::erase(flash, config.region_a, size_a, |cur, total| tracker.update(sink, 1, cur, total))?;
    flash_region::erase(flash, config.region_b, size_b, |cur, total| tracker.update(sink, 2, cur, total))?;

    backup_a.seek(0)?;
    flash_region::program(flash, &mut backup_a, config.region_a.start_addr, size_a, chunk_buf, |cur, total| {
        tracker.update(sink, 3, cur, total)
    })?;

    backup_b.seek(0)?;
    flash_region::program(flash, &mut backup_b, config.region_b.start_addr, size_b, chunk_buf, |cur, total| {
        tracker.update(sink, 4, cur, total)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;
    use crate::testutil::{MemFlash, MemFs};

    struct NullSink;
    impl ProgressSink for NullSink {
        fn report(&mut self, _percent: u32) {}
    }

    fn config() -> BootConfig {
        BootConfig {
            region_a: RegionConfig { start_addr: 0x0804_0000, capacity: 4096 },
            region_b: RegionConfig { start_addr: 0x0810_0000, capacity: 4096 },
            ..Default::default()
        }
    }

    #[test]
    fn restores_both_regions_byte_for_byte_from_their_backups() {
        let config = config();
        let mut flash = MemFlash::new(config.region_a.start_addr, config.region_a.capacity, config.region_b.start_addr, config.region_b.capacity, 1024);
        let mut fs = MemFs::new();
        fs.put(config.backup_a_path, std::vec![0xAAu8; 70]);
        fs.put(config.backup_b_path, std::vec![0xBBu8; 50]);
        let mut chunk = [0u8; 32];
        let mut tracker = ProgressTracker::init(TOTAL_PHASES);
        let mut sink = NullSink;

        run_rollback(&config, &mut flash, &mut fs, &mut chunk, &mut tracker, &mut sink).unwrap();

        assert_eq!(flash.region_a_bytes(70), std::vec![0xAAu8; 70].as_slice());
        assert_eq!(flash.region_b_bytes(50), std::vec![0xBBu8; 50].as_slice());
    }

    #[test]
    fn missing_either_backup_aborts_with_no_backup() {
        let config = config();
        let mut flash = MemFlash::new(config.region_a.start_addr, config.region_a.capacity, config.region_b.start_addr, config.region_b.capacity, 1024);
        let mut fs = MemFs::new();
        fs.put(config.backup_a_path, std::vec![0xAAu8; 70]);
        let mut chunk = [0u8; 32];
        let mut tracker = ProgressTracker::init(TOTAL_PHASES);
        let mut sink = NullSink;

        let result = run_rollback(&config, &mut flash, &mut fs, &mut chunk, &mut tracker, &mut sink);
        assert_eq!(result, Err(BootError::NoBackup));
    }

    #[test]
    fn no_backup_check_happens_before_any_erase() {
        let config = config();
        let mut flash = MemFlash::new(config.region_a.start_addr, config.region_a.capacity, config.region_b.start_addr, config.region_b.capacity, 1024);
        let mut fs = MemFs::new();
        let mut chunk = [0u8; 32];
        let mut tracker = ProgressTracker::init(TOTAL_PHASES);
        let mut sink = NullSink;

        run_rollback(&config, &mut flash, &mut fs, &mut chunk, &mut tracker, &mut sink).unwrap_err();
        assert_eq!(flash.region_a_bytes(64), std::vec![0xFFu8; 64].as_slice());
    }
}
