//! Boot-Mode Selector, grounded on the state
//! transition table in `original_source/CM7/Core/Src/main.c`.
//!
//! This is the only place in the crate that reads and writes the
//! persistent store; C8 and C9 never touch it themselves, so every
//! transition is visible in one function.

use crate::config::{BootConfig, HEADER_SIZE};
use crate::error::{BootError, BootResult};
use crate::package::{self, PackageHeader, VERSION_LEN};
use crate::ports::{CrcAccumulator, Display, File, FileSystem, FlashDriver, SystemControl};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::state::{PersistentStore, UpdateState};
use crate::{locator, orchestrator, rollback};

struct DisplaySink<'a, D: Display> {
    display: &'a mut D,
}

impl<'a, D: Display> ProgressSink for DisplaySink<'a, D> {
    fn report(&mut self, percent: u32) {
        self.display.show_progress(percent.min(100) as u8);
    }
}

/// Reads the persisted state once and dispatches exactly one of:
/// jump-to-app, run the update orchestrator, run the rollback orchestrator,
/// finalize, or abort — then either jumps to the application or resets.
/// Never returns.
#[allow(clippy::too_many_arguments)]
pub fn run_boot(
    store: &mut impl PersistentStore,
    fs: &mut impl FileSystem,
    flash: &mut impl FlashDriver,
    crc: &mut impl CrcAccumulator,
    display: &mut impl Display,
    system: &mut impl SystemControl,
    config: &BootConfig,
    chunk_buf: &mut [u8],
) -> ! {
    match store.read() {
        UpdateState::None => system.jump_to_app(config.region_a.start_addr),

        UpdateState::Received => {
            match try_install(fs, flash, crc, display, config, chunk_buf) {
                Ok(()) => {
                    let _ = store.write(UpdateState::ToTest);
                    display.show_testing_reboot();
                }
                // A corrupt CRC or an unparseable header both mean this
                // exact package will never become installable — drop to
                // NONE rather than retry it forever. Every other failure
                // (I/O, flash, no package located yet) is potentially
                // transient, so the state is left at RECEIVED to retry.
                Err(BootError::CrcMismatch) | Err(BootError::InvalidPackage) => {
                    let _ = store.write(UpdateState::None);
                    display.show_failed();
                }
                Err(_) => {
                    display.show_failed();
                }
            }
            system.reset()
        }

        UpdateState::ToTest => {
            let _ = store.write(UpdateState::Testing);
            system.jump_to_app(config.region_a.start_addr)
        }

        UpdateState::Testing => {
            display.show_restore_previous();
            let outcome = {
                let mut tracker = ProgressTracker::init(rollback::TOTAL_PHASES);
                let mut sink = DisplaySink { display };
                rollback::run_rollback(config, flash, fs, chunk_buf, &mut tracker, &mut sink)
            };
            match outcome {
                Ok(()) => {
                    let _ = store.write(UpdateState::ToTest);
                    display.show_success_reboot();
                }
                Err(_) => {
                    display.show_failed();
                }
            }
            system.reset()
        }

        UpdateState::Done => {
            let _ = store.write(UpdateState::None);
            display.show_success_reboot();
            system.reset()
        }
    }
}

/// Locates, parses, and installs whatever package matches the naming
/// convention. Never touches the persistent store — `run_boot` does that
/// around the call.
fn try_install(
    fs: &mut impl FileSystem,
    flash: &mut impl FlashDriver,
    crc: &mut impl CrcAccumulator,
    display: &mut impl Display,
    config: &BootConfig,
    chunk_buf: &mut [u8],
) -> BootResult<()> {
    let path = locator::find_package(fs, config.package_search_dir, config.package_prefix, config.package_extension)?;
    let mut file = fs.open_read(path.as_str())?;

    let mut header_bytes = [0u8; HEADER_SIZE];
    file.read_exact(&mut header_bytes)?;
    let header: PackageHeader = package::parse_header(&header_bytes)?;
    package::validate_region_sizes(&header, config.region_a.capacity, config.region_b.capacity)?;

    let mut version_buf = [0u8; VERSION_LEN + 1];
    display.show_version(header.version_str(&mut version_buf));

    let mut tracker = ProgressTracker::init(orchestrator::TOTAL_PHASES);
    let mut sink = DisplaySink { display };
    orchestrator::run_update(&mut file, &header, config, flash, fs, crc, chunk_buf, &mut tracker, &mut sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;
    use crate::testutil::{MemDisplay, MemFlash, MemFs, MemPersistentStore, PanicSystemControl, SystemEvent};
    use crate::verify::Crc32IsoHdlc;

    fn config() -> BootConfig {
        BootConfig {
            region_a: RegionConfig { start_addr: 0x0804_0000, capacity: 4096 },
            region_b: RegionConfig { start_addr: 0x0810_0000, capacity: 4096 },
            ..Default::default()
        }
    }

    fn run_and_catch(
        store: &mut MemPersistentStore,
        fs: &mut MemFs,
        flash: &mut MemFlash,
        display: &mut MemDisplay,
        config: &BootConfig,
    ) -> SystemEvent {
        let mut crc = Crc32IsoHdlc::new();
        let mut chunk = [0u8; 32];
        let mut system = PanicSystemControl;
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(std::boxed::Box::new(|_| {}));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_boot(store, fs, flash, &mut crc, display, &mut system, config, &mut chunk)
        }));
        std::panic::set_hook(prev_hook);
        *result.unwrap_err().downcast::<SystemEvent>().unwrap()
    }

    fn flash_for(config: &BootConfig) -> MemFlash {
        MemFlash::new(config.region_a.start_addr, config.region_a.capacity, config.region_b.start_addr, config.region_b.capacity, 1024)
    }

    fn package_bytes(body_a: &[u8], body_b: &[u8]) -> std::vec::Vec<u8> {
        let mut bytes = std::vec::Vec::new();
        bytes.extend_from_slice(b"BOOT");
        bytes.extend_from_slice(&(body_a.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(body_b.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(b"v1.0.0\0\0");
        bytes.extend_from_slice(body_a);
        bytes.extend_from_slice(body_b);
        let digest = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(&bytes);
        bytes.extend_from_slice(&digest.to_le_bytes());
        bytes
    }

    #[test]
    fn none_jumps_straight_to_region_a() {
        let config = config();
        let mut store = MemPersistentStore::default();
        let mut fs = MemFs::new();
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::JumpToApp(config.region_a.start_addr));
    }

    #[test]
    fn to_test_persists_testing_then_jumps() {
        let config = config();
        let mut store = MemPersistentStore { state: UpdateState::ToTest, write_count: 0 };
        let mut fs = MemFs::new();
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::JumpToApp(config.region_a.start_addr));
        assert_eq!(store.state, UpdateState::Testing);
    }

    #[test]
    fn done_finalizes_to_none_and_resets() {
        let config = config();
        let mut store = MemPersistentStore { state: UpdateState::Done, write_count: 0 };
        let mut fs = MemFs::new();
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::Reset);
        assert_eq!(store.state, UpdateState::None);
        assert_eq!(display.success_reboot_shown, 1);
    }

    #[test]
    fn received_with_a_valid_package_installs_and_persists_to_test() {
        let config = config();
        let mut store = MemPersistentStore { state: UpdateState::Received, write_count: 0 };
        let mut fs = MemFs::new();
        fs.put("/firmware/cis_package_1.bin", package_bytes(&[0xAA; 64], &[0xBB; 32]));
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::Reset);
        assert_eq!(store.state, UpdateState::ToTest);
        assert_eq!(display.testing_reboot_shown, 1);
        assert_eq!(flash.region_a_bytes(64), &[0xAAu8; 64][..]);
    }

    #[test]
    fn received_with_no_package_present_leaves_state_unchanged() {
        let config = config();
        let mut store = MemPersistentStore { state: UpdateState::Received, write_count: 0 };
        let mut fs = MemFs::new();
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::Reset);
        assert_eq!(store.state, UpdateState::Received);
        assert_eq!(display.failed_shown, 1);
    }

    #[test]
    fn received_with_bad_magic_drops_to_none() {
        let config = config();
        let mut store = MemPersistentStore { state: UpdateState::Received, write_count: 0 };
        let mut fs = MemFs::new();
        let mut bytes = package_bytes(&[0xAA; 64], &[]);
        bytes[0..4].copy_from_slice(b"XXXX");
        fs.put("/firmware/cis_package_1.bin", bytes);
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::Reset);
        assert_eq!(store.state, UpdateState::None);
        assert_eq!(display.failed_shown, 1);
    }

    #[test]
    fn received_with_a_corrupt_crc_drops_to_none() {
        let config = config();
        let mut store = MemPersistentStore { state: UpdateState::Received, write_count: 0 };
        let mut fs = MemFs::new();
        let mut bytes = package_bytes(&[0xAA; 64], &[]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs.put("/firmware/cis_package_1.bin", bytes);
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::Reset);
        assert_eq!(store.state, UpdateState::None);
        assert_eq!(display.failed_shown, 1);
    }

    #[test]
    fn testing_with_backups_rolls_back_and_persists_to_test() {
        let config = config();
        let mut store = MemPersistentStore { state: UpdateState::Testing, write_count: 0 };
        let mut fs = MemFs::new();
        fs.put(config.backup_a_path, std::vec![0xAAu8; 64]);
        fs.put(config.backup_b_path, std::vec![0xBBu8; 32]);
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::Reset);
        assert_eq!(store.state, UpdateState::ToTest);
        assert_eq!(display.success_reboot_shown, 1);
        assert_eq!(display.restore_previous_shown, 1);
        assert_eq!(flash.region_a_bytes(64), &[0xAAu8; 64][..]);
    }

    #[test]
    fn testing_without_backups_shows_failure_and_leaves_state() {
        let config = config();
        let mut store = MemPersistentStore { state: UpdateState::Testing, write_count: 0 };
        let mut fs = MemFs::new();
        let mut flash = flash_for(&config);
        let mut display = MemDisplay::default();
        let event = run_and_catch(&mut store, &mut fs, &mut flash, &mut display, &config);
        assert_eq!(event, SystemEvent::Reset);
        assert_eq!(store.state, UpdateState::Testing);
        assert_eq!(display.failed_shown, 1);
        assert_eq!(display.restore_previous_shown, 1);
    }
}
