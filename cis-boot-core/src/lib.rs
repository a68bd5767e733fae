// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hardware-independent update state machine and package processor for the
//! dual-core firmware bootloader.
//!
//! This crate implements C1–C10 of the bootloader design purely against the
//! traits in [`ports`] — it never touches a register, a display pixel, or a
//! filesystem directly. The `no_std` binary crate wires concrete
//! implementations of those traits and drives [`selector::run_boot`].
//!
//! `no_std` by default, same split as `crispy_common`: lifted for this
//! crate's own tests and for host tools via the `std` feature.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod config;
pub mod error;
pub mod extractor;
pub mod flash_region;
pub mod locator;
pub mod orchestrator;
pub mod package;
pub mod ports;
pub mod progress;
pub mod rollback;
pub mod selector;
pub mod state;
pub mod verify;

#[cfg(any(test, feature = "std"))]
pub mod testutil;

pub use error::{BootError, BootResult};
pub use state::UpdateState;
