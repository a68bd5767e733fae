// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! [`Display`] backing for this target.
//!
//! `spec.md` §1 places "the display driver and the higher-level screen
//! routines" out of scope: a real product build wires the six
//! [`cis_boot_core::ports::Display`] calls to actual panel draws. This
//! reference bootloader has no panel attached, so it logs each screen
//! transition over `defmt` instead — the same `defmt::println!` status
//! narration `crispy_bootloader::boot`/`update` use for every state change.

use cis_boot_core::ports::Display;

pub struct DefmtDisplay;

impl Display for DefmtDisplay {
    fn show_version(&mut self, version: &str) {
        defmt::println!("update: installing version {}", version);
    }

    fn show_progress(&mut self, percent: u8) {
        defmt::println!("update: progress {}%", percent);
    }

    fn show_restore_previous(&mut self) {
        defmt::println!("update: restoring previous version");
    }

    fn show_failed(&mut self) {
        defmt::println!("update: FAILED");
    }

    fn show_testing_reboot(&mut self) {
        defmt::println!("update: installed, rebooting to test");
    }

    fn show_success_reboot(&mut self) {
        defmt::println!("update: success, rebooting");
    }
}
