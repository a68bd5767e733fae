// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash read/erase/program wrappers using RP2040 ROM routines, and the
//! [`cis_boot_core::ports::FlashDriver`] adapter built on top of them.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash.
//! We use `#[link_section = ".data"]` to place critical functions in RAM,
//! and pre-resolve all ROM function pointers at init time.

use cis_boot_core::error::{BootError, BootResult};
use cis_boot_core::ports::FlashDriver;

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// ROM function pointers, resolved once at init from the ROM table.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Resolve the ROM flash function pointers. Must be called once before any
/// flash operation; performs ROM table lookups, which require XIP active.
pub fn init() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE =
            core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

fn addr_to_offset(abs_addr: u32) -> u32 {
    abs_addr - FLASH_BASE
}

/// # Safety
/// `init()` must have run first; `offset` must be sector-aligned.
#[link_section = ".data"]
#[inline(never)]
unsafe fn raw_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, 0x20);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// # Safety
/// `init()` must have run first; `offset` must be page-aligned and `len` a
/// multiple of the hardware's program granularity.
#[link_section = ".data"]
#[inline(never)]
unsafe fn raw_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

fn raw_read(abs_addr: u32, buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = unsafe { ((abs_addr + i as u32) as *const u8).read_volatile() };
    }
}

/// Adapter from the ROM flash routines to [`FlashDriver`], covering the two
/// image regions plus the persistent-state sector `persistent_store.rs`
/// carves out of region A's reserved headroom.
pub struct RomFlash {
    region_a_base: u32,
    region_b_base: u32,
}

impl RomFlash {
    pub fn new(region_a_base: u32, region_b_base: u32) -> Self {
        Self {
            region_a_base,
            region_b_base,
        }
    }
}

impl FlashDriver for RomFlash {
    fn bank_of(&self, addr: u32) -> u8 {
        if addr >= self.region_b_base {
            1
        } else {
            0
        }
    }

    fn sector_of(&self, addr: u32) -> u32 {
        addr / FLASH_SECTOR_SIZE
    }

    fn sector_size(&self) -> u32 {
        FLASH_SECTOR_SIZE
    }

    fn erase_sector(&mut self, _bank: u8, sector: u32) -> BootResult<()> {
        let addr = sector * FLASH_SECTOR_SIZE;
        unsafe { raw_erase(addr_to_offset(addr), FLASH_SECTOR_SIZE) };
        Ok(())
    }

    fn write_block32(&mut self, addr: u32, block: &[u8; 32]) -> BootResult<()> {
        unsafe { raw_program(addr_to_offset(addr), block.as_ptr(), block.len()) };
        let mut readback = [0u8; 32];
        raw_read(addr, &mut readback);
        if readback != *block {
            return Err(BootError::WriteFailed);
        }
        Ok(())
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        raw_read(addr, buf);
    }
}
