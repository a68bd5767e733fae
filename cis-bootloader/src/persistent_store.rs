// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! A one-sector-wide [`PersistentStore`] backed by the ROM flash routines in
//! `flash.rs`, the same "erase sector, program padded to a page" pattern
//! `crispy-bootloader::flash::write_boot_data` uses for its own state word.

use cis_boot_core::error::BootResult;
use cis_boot_core::ports::FlashDriver;
use cis_boot_core::state::{PersistentStore, UpdateState};

use crate::flash::{self, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE};

pub struct FlashPersistentStore {
    addr: u32,
}

impl FlashPersistentStore {
    pub fn new(addr: u32) -> Self {
        Self { addr }
    }
}

impl PersistentStore for FlashPersistentStore {
    fn read(&mut self) -> UpdateState {
        let mut word = [0u8; 4];
        flash::RomFlash::new(self.addr, self.addr).read(self.addr, &mut word);
        UpdateState::decode(u32::from_le_bytes(word))
    }

    fn write(&mut self, state: UpdateState) -> BootResult<()> {
        let mut driver = flash::RomFlash::new(self.addr, self.addr);
        cis_boot_core::ports::FlashDriver::erase_sector(
            &mut driver,
            0,
            self.addr / FLASH_SECTOR_SIZE,
        )?;

        let mut page = [0xFFu8; FLASH_PAGE_SIZE as usize];
        page[..4].copy_from_slice(&state.encode().to_le_bytes());
        let mut offset = 0u32;
        while offset < FLASH_PAGE_SIZE {
            let mut block = [0xFFu8; 32];
            block.copy_from_slice(&page[offset as usize..offset as usize + 32]);
            cis_boot_core::ports::FlashDriver::write_block32(
                &mut driver,
                self.addr + offset,
                &block,
            )?;
            offset += 32;
        }
        Ok(())
    }
}
