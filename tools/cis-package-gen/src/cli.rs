// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::pack;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "cis-package-gen")]
#[command(about = "Assembles a conformant cis update package from loose firmware blobs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Build a package file from a region-A image, a region-B image, and
    /// an optional auxiliary-data blob.
    Build {
        /// Region A firmware image.
        #[arg(long)]
        image_a: PathBuf,

        /// Region B firmware image.
        #[arg(long)]
        image_b: PathBuf,

        /// Auxiliary data blob (defaults to empty).
        #[arg(long)]
        ext_data: Option<PathBuf>,

        /// 8-byte (max) version string, right-padded with NUL.
        #[arg(long, default_value = "0.0.0")]
        version: String,

        /// Destination package path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Verify an existing package's trailing CRC, the same check
    /// `cis_boot_core::verify::verify` performs on-device.
    Check {
        /// Package file to verify.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            image_a,
            image_b,
            ext_data,
            version,
            output,
        } => pack::build(&image_a, &image_b, ext_data.as_deref(), &version, &output),
        Commands::Check { file } => pack::check(&file),
    }
}
