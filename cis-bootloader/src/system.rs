// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The two opaque, non-returning control transfers
//! [`cis_boot_core::ports::SystemControl`] names: jumping into an
//! execute-in-place application image, and an unconditional reset.
//!
//! Unlike `crispy_bootloader::boot::load_and_jump`, the application images
//! here run directly from flash (XIP) rather than being copied into RAM
//! first — `spec.md` §9 models the transfer as "a control-flow transfer to
//! an address read from the image's vector table", which on this target
//! means relocating `VTOR` to the region base and branching to its reset
//! vector in place.

use cis_boot_core::ports::SystemControl;

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }
}

pub struct RealSystemControl;

impl SystemControl for RealSystemControl {
    fn jump_to_app(&mut self, region_base: u32) -> ! {
        unsafe {
            cortex_m::interrupt::disable();

            const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
            const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
            NVIC_ICPR.write_volatile(0xFFFF_FFFF);
            NVIC_ICER.write_volatile(0xFFFF_FFFF);

            const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
            SCB_VTOR.write_volatile(region_base);
            cortex_m::asm::dsb();
            cortex_m::asm::isb();

            let vt = VectorTable::read_from(region_base);
            core::arch::asm!(
                "msr msp, {sp}",
                "cpsie i",
                "bx {reset}",
                sp = in(reg) vt.initial_sp,
                reset = in(reg) vt.reset_vector,
                options(noreturn)
            );
        }
    }

    fn reset(&mut self) -> ! {
        cortex_m::peripheral::SCB::sys_reset()
    }
}
