//! Host-side test doubles for the ports in [`crate::ports`]. Only compiled
//! for this crate's own tests and for the `std` feature (`cis-package-gen`
//! reuses [`MemFile`]-style helpers are not needed there, but `MemFs`
//! doubles as a quick in-memory staging area in a couple of integration
//! tests). Never shipped into the `no_std` binary crate.

extern crate std;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use crate::error::{BootError, BootResult};
use crate::ports::{File, FileSystem};

/// An in-memory file backed by a shared, resizable byte buffer.
#[derive(Clone)]
pub struct MemFile {
    bytes: Rc<RefCell<Vec<u8>>>,
    pos: usize,
}

impl MemFile {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Rc::new(RefCell::new(bytes)),
            pos: 0,
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        Rc::try_unwrap(self.bytes)
            .map(RefCell::into_inner)
            .unwrap_or_else(|rc| rc.borrow().clone())
    }
}

impl File for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> BootResult<usize> {
        let data = self.bytes.borrow();
        if self.pos > data.len() {
            return Ok(0);
        }
        let remaining = data.len() - self.pos;
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> BootResult<usize> {
        let mut data = self.bytes.borrow_mut();
        let end = self.pos + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn seek(&mut self, pos: u64) -> BootResult<()> {
        self.pos = pos as usize;
        Ok(())
    }

    fn len(&self) -> BootResult<u64> {
        Ok(self.bytes.borrow().len() as u64)
    }
}

/// An in-memory flat filesystem (no real directory nesting — entries are
/// distinguished purely by their full path string, which is all C3–C7 need).
#[derive(Default)]
pub struct MemFs {
    files: BTreeMap<String, Rc<RefCell<Vec<u8>>>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_string(), Rc::new(RefCell::new(bytes)));
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).map(|b| b.borrow().clone())
    }
}

fn basename<'a>(dir: &str, path: &'a str) -> Option<&'a str> {
    let dir = dir.trim_end_matches('/');
    let rest = path.strip_prefix(dir)?.strip_prefix('/')?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn open_read(&mut self, path: &str) -> BootResult<Self::File> {
        self.files
            .get(path)
            .map(|b| MemFile {
                bytes: b.clone(),
                pos: 0,
            })
            .ok_or(BootError::Io)
    }

    fn create_write(&mut self, path: &str) -> BootResult<Self::File> {
        let bytes = Rc::new(RefCell::new(Vec::new()));
        self.files.insert(path.to_string(), bytes.clone());
        Ok(MemFile { bytes, pos: 0 })
    }

    fn exists(&mut self, path: &str) -> BootResult<bool> {
        Ok(self.files.contains_key(path))
    }

    fn rename(&mut self, from: &str, to: &str) -> BootResult<()> {
        let bytes = self.files.remove(from).ok_or(BootError::Io)?;
        self.files.insert(to.to_string(), bytes);
        Ok(())
    }

    fn visit_dir(&mut self, dir: &str, visit: &mut dyn FnMut(&str, bool) -> bool) -> BootResult<()> {
        let names: Vec<String> = self
            .files
            .keys()
            .filter_map(|p| basename(dir, p))
            .map(|s| s.to_string())
            .collect();
        for name in names {
            if !visit(&name, false) {
                break;
            }
        }
        Ok(())
    }
}

/// A byte-addressable flash model covering two regions, with
/// real-NOR-flash AND-on-write semantics (a write can only clear bits;
/// erase resets a sector to all-`0xFF`) so tests exercise the
/// pad-with-`0xFF` behavior of [`crate::flash_region::program`].
pub struct MemFlash {
    region_a_base: u32,
    region_a: Vec<u8>,
    region_b_base: u32,
    region_b: Vec<u8>,
    sector_size: u32,
    pub fail_erase_sectors: std::collections::BTreeSet<u32>,
    pub fail_write_addrs: std::collections::BTreeSet<u32>,
}

impl MemFlash {
    pub fn new(region_a_base: u32, cap_a: u32, region_b_base: u32, cap_b: u32, sector_size: u32) -> Self {
        Self {
            region_a_base,
            region_a: std::vec![0xFFu8; cap_a as usize],
            region_b_base,
            region_b: std::vec![0xFFu8; cap_b as usize],
            sector_size,
            fail_erase_sectors: Default::default(),
            fail_write_addrs: Default::default(),
        }
    }

    fn region_for(&mut self, addr: u32) -> (&mut Vec<u8>, u32) {
        if addr >= self.region_b_base {
            (&mut self.region_b, self.region_b_base)
        } else {
            (&mut self.region_a, self.region_a_base)
        }
    }

    pub fn region_a_bytes(&self, len: usize) -> &[u8] {
        &self.region_a[..len]
    }

    pub fn region_b_bytes(&self, len: usize) -> &[u8] {
        &self.region_b[..len]
    }
}

impl crate::ports::FlashDriver for MemFlash {
    fn bank_of(&self, addr: u32) -> u8 {
        if addr >= self.region_b_base {
            1
        } else {
            0
        }
    }

    fn sector_of(&self, addr: u32) -> u32 {
        addr / self.sector_size
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn erase_sector(&mut self, _bank: u8, sector: u32) -> BootResult<()> {
        if self.fail_erase_sectors.contains(&sector) {
            return Err(BootError::EraseFailed);
        }
        let addr = sector * self.sector_size;
        let sector_size = self.sector_size as usize;
        let (region, base) = self.region_for(addr);
        let offset = (addr - base) as usize;
        let end = (offset + sector_size).min(region.len());
        for b in &mut region[offset..end] {
            *b = 0xFF;
        }
        Ok(())
    }

    fn write_block32(&mut self, addr: u32, block: &[u8; 32]) -> BootResult<()> {
        if self.fail_write_addrs.contains(&addr) {
            return Err(BootError::WriteFailed);
        }
        let (region, base) = self.region_for(addr);
        let offset = (addr - base) as usize;
        for (i, b) in block.iter().enumerate() {
            if offset + i < region.len() {
                region[offset + i] &= *b;
            }
        }
        Ok(())
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        let (region, base) = if addr >= self.region_b_base {
            (&self.region_b, self.region_b_base)
        } else {
            (&self.region_a, self.region_a_base)
        };
        let offset = (addr - base) as usize;
        let n = buf.len().min(region.len().saturating_sub(offset));
        buf[..n].copy_from_slice(&region[offset..offset + n]);
        for b in &mut buf[n..] {
            *b = 0xFF;
        }
    }
}

/// Records every call made to the six display screens, for assertions.
#[derive(Default)]
pub struct MemDisplay {
    pub progress_calls: Vec<u8>,
    pub versions_shown: Vec<String>,
    pub restore_previous_shown: usize,
    pub failed_shown: usize,
    pub testing_reboot_shown: usize,
    pub success_reboot_shown: usize,
}

impl crate::ports::Display for MemDisplay {
    fn show_version(&mut self, version: &str) {
        self.versions_shown.push(version.to_string());
    }
    fn show_progress(&mut self, percent: u8) {
        self.progress_calls.push(percent);
    }
    fn show_restore_previous(&mut self) {
        self.restore_previous_shown += 1;
    }
    fn show_failed(&mut self) {
        self.failed_shown += 1;
    }
    fn show_testing_reboot(&mut self) {
        self.testing_reboot_shown += 1;
    }
    fn show_success_reboot(&mut self) {
        self.success_reboot_shown += 1;
    }
}

/// A persistent store backed by a plain field, for selector/orchestrator
/// tests that don't care about torn-write semantics (those are covered in
/// `state.rs`'s own unit tests).
pub struct MemPersistentStore {
    pub state: crate::state::UpdateState,
    pub write_count: usize,
}

impl Default for MemPersistentStore {
    fn default() -> Self {
        Self {
            state: crate::state::UpdateState::None,
            write_count: 0,
        }
    }
}

impl crate::state::PersistentStore for MemPersistentStore {
    fn read(&mut self) -> crate::state::UpdateState {
        self.state
    }
    fn write(&mut self, state: crate::state::UpdateState) -> BootResult<()> {
        self.state = state;
        self.write_count += 1;
        Ok(())
    }
}

/// What a [`PanicSystemControl`] call would actually have done, carried as a
/// typed panic payload so `selector::run_boot` tests can observe which
/// diverging path was taken via `std::panic::catch_unwind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    JumpToApp(u32),
    Reset,
}

/// A `SystemControl` that never actually transfers control — it panics with
/// a [`SystemEvent`] payload instead, which is the only way to observe a
/// `-> !` call from a host test.
pub struct PanicSystemControl;

impl crate::ports::SystemControl for PanicSystemControl {
    fn jump_to_app(&mut self, region_base: u32) -> ! {
        std::panic::panic_any(SystemEvent::JumpToApp(region_base))
    }

    fn reset(&mut self) -> ! {
        std::panic::panic_any(SystemEvent::Reset)
    }
}
