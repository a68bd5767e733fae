// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Dual-core firmware update bootloader for RP2040.
//!
//! Wires the concrete peripheral adapters (flash, persistent state store,
//! removable-storage filesystem, CRC, display, system control) to
//! `cis_boot_core::selector::run_boot`, which owns the entire update state
//! machine. This crate contributes no update logic of its own — every
//! decision point is in `cis-boot-core`.

#![no_std]
#![no_main]

mod display;
mod filesystem;
mod flash;
mod peripherals;
mod persistent_store;
mod system;

use cis_boot_core::config::BootConfig;
use cis_boot_core::ports::SystemControl;
use cis_boot_core::verify::Crc32IsoHdlc;

use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

/// RP2040 XIP flash base and the two 768KB image banks, matching the
/// memory map `crispy_common::protocol` already used for this board.
const FW_A_ADDR: u32 = 0x1001_0000;
const FW_B_ADDR: u32 = 0x100D_0000;
const PERSISTENT_STATE_ADDR: u32 = 0x1019_0000;

fn boot_config() -> BootConfig {
    BootConfig {
        region_a: cis_boot_core::config::RegionConfig {
            start_addr: FW_A_ADDR,
            capacity: 768 * 1024,
        },
        region_b: cis_boot_core::config::RegionConfig {
            start_addr: FW_B_ADDR,
            capacity: 768 * 1024,
        },
        ..Default::default()
    }
}

#[entry]
fn main() -> ! {
    defmt::println!("cis-bootloader init");

    let mut p = peripherals::init();

    // Three blinks signal "bootloader alive" before anything that can hang
    // (SD card init, volume mount) has had a chance to run.
    for _ in 0..3 {
        p.led_pin.set_high().ok();
        p.timer.delay_ms(200u32);
        p.led_pin.set_low().ok();
        p.timer.delay_ms(200u32);
    }

    flash::init();
    let mut flash_driver = flash::RomFlash::new(FW_A_ADDR, FW_B_ADDR);
    let mut store = persistent_store::FlashPersistentStore::new(PERSISTENT_STATE_ADDR);
    let mut crc = Crc32IsoHdlc::new();
    let mut display = display::DefmtDisplay;
    let mut system = system::RealSystemControl;
    let config = boot_config();

    let spi_device = filesystem::new_spi_device(p.sd_spi, p.sd_cs, p.spi_delay)
        .unwrap_or_else(|_| {
            defmt::println!("SD card SPI device init failed");
            system::RealSystemControl.reset()
        });
    let card = filesystem::new_card(spi_device, p.timer);
    let mut volume_mgr = filesystem::new_volume_manager(card);
    let mut fs = match filesystem::SdFileSystem::mount(&mut volume_mgr) {
        Ok(fs) => fs,
        Err(_) => {
            defmt::println!("SD card mount failed, resetting");
            system.reset()
        }
    };

    let mut chunk_buf = [0u8; cis_boot_core::config::DEFAULT_CHUNK_SIZE];

    cis_boot_core::selector::run_boot(
        &mut store,
        &mut fs,
        &mut flash_driver,
        &mut crc,
        &mut display,
        &mut system,
        &config,
        &mut chunk_buf,
    )
}
