//! The ports (traits) behind which every hardware collaborator lives: the
//! filesystem driver, the flash driver, the hardware CRC accelerator, and
//! the display. The core only knows these shapes; concrete implementations
//! are wired up by the binary crate.

use crate::error::BootResult;

/// A single open file or stream. Positions are absolute — the orchestrators
/// always seek explicitly before reading, never assuming where a previous
/// stage left the cursor.
pub trait File {
    fn read(&mut self, buf: &mut [u8]) -> BootResult<usize>;
    fn write(&mut self, buf: &[u8]) -> BootResult<usize>;
    fn seek(&mut self, pos: u64) -> BootResult<()>;
    fn len(&self) -> BootResult<u64>;

    /// Read until `buf` is full or return `Io` — every caller in this crate
    /// needs exact reads, never short ones.
    fn read_exact(&mut self, buf: &mut [u8]) -> BootResult<()> {
        let n = self.read(buf)?;
        if n != buf.len() {
            return Err(crate::error::BootError::Io);
        }
        Ok(())
    }

    /// Write the whole buffer, same exactness contract as `read_exact`.
    fn write_all(&mut self, buf: &[u8]) -> BootResult<()> {
        let n = self.write(buf)?;
        if n != buf.len() {
            return Err(crate::error::BootError::Io);
        }
        Ok(())
    }
}

/// C3–C7's filesystem port.
pub trait FileSystem {
    type File: File;

    fn open_read(&mut self, path: &str) -> BootResult<Self::File>;
    /// Truncating create-for-write.
    fn create_write(&mut self, path: &str) -> BootResult<Self::File>;
    fn exists(&mut self, path: &str) -> BootResult<bool>;
    fn rename(&mut self, from: &str, to: &str) -> BootResult<()>;

    /// Invoke `visit(name, is_dir)` for every entry directly under `dir`,
    /// in driver-defined order, until `visit` returns `false` or entries run
    /// out. Callback-based rather than an iterator so the trait stays
    /// object-safe and allocation-free in `no_std`.
    fn visit_dir(&mut self, dir: &str, visit: &mut dyn FnMut(&str, bool) -> bool) -> BootResult<()>;
}

/// C5/C9's flash driver port.
pub trait FlashDriver {
    fn bank_of(&self, addr: u32) -> u8;
    fn sector_of(&self, addr: u32) -> u32;
    fn sector_size(&self) -> u32;

    fn erase_sector(&mut self, bank: u8, sector: u32) -> BootResult<()>;

    /// Commit one 32-byte-aligned block. Implementations own the
    /// write-then-verify retry policy; this port only ever sees the final outcome.
    fn write_block32(&mut self, addr: u32, block: &[u8; WRITE_BLOCK_SIZE]) -> BootResult<()>;

    /// Direct memory-mapped read — flash is directly addressable.
    fn read(&self, addr: u32, buf: &mut [u8]);
}

use crate::config::WRITE_BLOCK_SIZE;

/// C4's CRC accumulator port: a resettable streaming CRC-32/ISO-HDLC digest
/// fed raw bytes. `finalize` returns the complete checksum (the algorithm's
/// own reflect/XOR-out already folded in) and leaves the accumulator ready
/// for the next `reset`, matching `crc::Digest::update`/`finalize`.
pub trait CrcAccumulator {
    fn reset(&mut self);
    fn update(&mut self, bytes: &[u8]);
    fn finalize(&mut self) -> u32;
}

/// The six display screens, one call each, no return value. Grounded
/// directly on `original_source/CM7/Application/Src/update_gui.c`'s six
/// `gui_display*` functions.
pub trait Display {
    /// "version / do not power off" (`gui_displayVersion`).
    fn show_version(&mut self, version: &str);
    /// "progress bar 0..100" (`gui_displayUpdateProcess`).
    fn show_progress(&mut self, percent: u8);
    /// "restore previous version" (`gui_displayRestorePreviousVersion`).
    fn show_restore_previous(&mut self);
    /// "failed" (`gui_displayUpdateFailed`).
    fn show_failed(&mut self);
    /// "testing/reboot" (`gui_displayUpdateTesting`).
    fn show_testing_reboot(&mut self);
    /// "success/reboot" (`gui_displayUpdateSuccess`).
    fn show_success_reboot(&mut self);
}

/// The two opaque, non-returning control-flow transfers the core never
/// implements itself.
pub trait SystemControl {
    /// Transfer execution to the vector table at `region_base`.
    fn jump_to_app(&mut self, region_base: u32) -> !;
    /// Unconditional system reset.
    fn reset(&mut self) -> !;
}
