// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host-side tool that assembles a conformant `cis` update package from
//! loose firmware blobs, for integration tests and manual bring-up.
//!
//! Usage:
//!   cis-package-gen build --image-a a.bin --image-b b.bin --version 1.2.3 -o pkg.bin
//!   cis-package-gen check pkg.bin

mod cli;
mod pack;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
