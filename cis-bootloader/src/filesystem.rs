// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The removable mass-storage volume, wired through `embedded-sdmmc` to
//! [`cis_boot_core::ports::FileSystem`]/[`cis_boot_core::ports::File`]. This
//! is the FAT-like layer `spec.md` §1 places out of scope for the core —
//! the core only ever sees the two port traits.

use cis_boot_core::error::{BootError, BootResult};
use cis_boot_core::ports::{File as CoreFile, FileSystem};
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{
    Directory, Mode, SdCard, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};

use crate::peripherals::{SdCsPin, SdSpi};

type SpiDevice = ExclusiveDevice<SdSpi, SdCsPin, rp2040_hal::Timer>;
type Card = SdCard<SpiDevice, rp2040_hal::Timer>;

/// The bootloader has no real-time clock; every file gets the same
/// power-on-reset epoch timestamp. FAT directory entries still need one.
struct NoTimeSource;

impl TimeSource for NoTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 0,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

const MAX_DIRS: usize = 2;
const MAX_FILES: usize = 2;
const MAX_VOLUMES: usize = 1;

/// Adapter over `embedded-sdmmc`'s root directory handle, opened once at
/// boot and reused across every C3–C7 call — the volume is mounted once at
/// startup and not unmounted until the final reset, per `spec.md` §5.
pub struct SdFileSystem<'a> {
    root: Directory<'a, Card, NoTimeSource, MAX_DIRS, MAX_FILES, MAX_VOLUMES>,
}

impl<'a> SdFileSystem<'a> {
    pub fn mount(
        volume_mgr: &'a mut VolumeManager<Card, NoTimeSource, MAX_DIRS, MAX_FILES, MAX_VOLUMES>,
    ) -> BootResult<Self> {
        let mut volume = volume_mgr.open_volume(VolumeIdx(0)).map_err(|_| BootError::Io)?;
        let root = volume.open_root_dir().map_err(|_| BootError::Io)?;
        Ok(Self { root })
    }

    /// Splits a path like `/firmware/cis_package_1.bin` into the
    /// directory and basename `embedded-sdmmc`'s flat-per-directory API
    /// expects. Only single-level subdirectories under the root are used
    /// anywhere in this crate (`PACKAGE_SEARCH_DIR`), so this never
    /// recurses.
    fn split(path: &str) -> (Option<&str>, &str) {
        let path = path.trim_start_matches('/');
        match path.rfind('/') {
            Some(i) => (Some(&path[..i]), &path[i + 1..]),
            None => (None, path),
        }
    }
}

pub fn new_spi_device(spi: SdSpi, cs: SdCsPin, delay: rp2040_hal::Timer) -> BootResult<SpiDevice> {
    ExclusiveDevice::new(spi, cs, delay).map_err(|_| BootError::Io)
}

pub fn new_card(spi_device: SpiDevice, delay: rp2040_hal::Timer) -> Card {
    SdCard::new(spi_device, delay)
}

pub fn new_volume_manager(
    card: Card,
) -> VolumeManager<Card, NoTimeSource, MAX_DIRS, MAX_FILES, MAX_VOLUMES> {
    VolumeManager::new(card, NoTimeSource)
}

/// Wraps an `embedded-sdmmc::File` so it implements
/// [`cis_boot_core::ports::File`].
pub struct SdFile<'a> {
    inner: embedded_sdmmc::File<'a, Card, NoTimeSource, MAX_DIRS, MAX_FILES, MAX_VOLUMES>,
}

impl<'a> CoreFile for SdFile<'a> {
    fn read(&mut self, buf: &mut [u8]) -> BootResult<usize> {
        self.inner.read(buf).map_err(|_| BootError::Io)
    }

    fn write(&mut self, buf: &[u8]) -> BootResult<usize> {
        self.inner.write(buf).map_err(|_| BootError::Io)?;
        Ok(buf.len())
    }

    fn seek(&mut self, pos: u64) -> BootResult<()> {
        self.inner
            .seek_from_start(pos as u32)
            .map_err(|_| BootError::Io)
    }

    fn len(&self) -> BootResult<u64> {
        Ok(self.inner.length() as u64)
    }
}

impl<'a> FileSystem for SdFileSystem<'a> {
    type File = SdFile<'a>;

    fn open_read(&mut self, path: &str) -> BootResult<Self::File> {
        let (dir, name) = Self::split(path);
        let inner = match dir {
            None => self
                .root
                .open_file_in_dir(name, Mode::ReadOnly)
                .map_err(|_| BootError::Io)?,
            Some(d) => {
                let sub = self.root.open_dir(d).map_err(|_| BootError::Io)?;
                sub.open_file_in_dir(name, Mode::ReadOnly)
                    .map_err(|_| BootError::Io)?
            }
        };
        Ok(SdFile { inner })
    }

    fn create_write(&mut self, path: &str) -> BootResult<Self::File> {
        let (dir, name) = Self::split(path);
        let inner = match dir {
            None => self
                .root
                .open_file_in_dir(name, Mode::ReadWriteCreateOrTruncate)
                .map_err(|_| BootError::Io)?,
            Some(d) => {
                let sub = self.root.open_dir(d).map_err(|_| BootError::Io)?;
                sub.open_file_in_dir(name, Mode::ReadWriteCreateOrTruncate)
                    .map_err(|_| BootError::Io)?
            }
        };
        Ok(SdFile { inner })
    }

    fn exists(&mut self, path: &str) -> BootResult<bool> {
        let (dir, name) = Self::split(path);
        let found = match dir {
            None => self.root.find_directory_entry(name).is_ok(),
            Some(d) => self
                .root
                .open_dir(d)
                .map_err(|_| BootError::Io)?
                .find_directory_entry(name)
                .is_ok(),
        };
        Ok(found)
    }

    fn rename(&mut self, from: &str, to: &str) -> BootResult<()> {
        // `embedded-sdmmc` has no atomic directory-entry rename; the
        // backup commit's crash-safety instead relies on `to` only ever
        // being opened for read after this returns `Ok`, and on this
        // being the only writer. Copy the bytes under the final name,
        // then drop the temporary entry.
        let (from_dir, from_name) = Self::split(from);
        let (to_dir, to_name) = Self::split(to);

        let mut src = match from_dir {
            None => self.root.open_file_in_dir(from_name, Mode::ReadOnly),
            Some(d) => self
                .root
                .open_dir(d)
                .map_err(|_| BootError::Io)?
                .open_file_in_dir(from_name, Mode::ReadOnly),
        }
        .map_err(|_| BootError::Io)?;

        let mut dst = match to_dir {
            None => self.root.open_file_in_dir(to_name, Mode::ReadWriteCreateOrTruncate),
            Some(d) => self
                .root
                .open_dir(d)
                .map_err(|_| BootError::Io)?
                .open_file_in_dir(to_name, Mode::ReadWriteCreateOrTruncate),
        }
        .map_err(|_| BootError::Io)?;

        let mut buf = [0u8; 512];
        loop {
            let n = src.read(&mut buf).map_err(|_| BootError::Io)?;
            if n == 0 {
                break;
            }
            dst.write(&buf[..n]).map_err(|_| BootError::Io)?;
        }

        match from_dir {
            None => self.root.delete_file_in_dir(from_name),
            Some(d) => self
                .root
                .open_dir(d)
                .map_err(|_| BootError::Io)?
                .delete_file_in_dir(from_name),
        }
        .map_err(|_| BootError::Io)
    }

    fn visit_dir(&mut self, dir: &str, visit: &mut dyn FnMut(&str, bool) -> bool) -> BootResult<()> {
        let dir = dir.trim_start_matches('/');
        let target = if dir.is_empty() {
            None
        } else {
            Some(self.root.open_dir(dir).map_err(|_| BootError::Io)?)
        };

        use core::fmt::Write as _;
        let mut keep_going = true;
        let callback = |entry: &embedded_sdmmc::DirEntry| {
            if !keep_going {
                return;
            }
            let mut name: heapless::String<16> = heapless::String::new();
            if write!(name, "{}", entry.name).is_err() {
                return;
            }
            keep_going = visit(name.as_str(), entry.attributes.is_directory());
        };

        match target {
            Some(sub) => sub.iterate_dir(callback).map_err(|_| BootError::Io),
            None => self.root.iterate_dir(callback).map_err(|_| BootError::Io),
        }
    }
}
