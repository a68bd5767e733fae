//! Flash region operations — backup, erase, program — grounded on
//! `original_source/CM7/Application/Src/update.c`'s `update_backupFirmware`,
//! `update_format`, and `update_writeFirmware`.

use crate::config::{RegionConfig, PAD_BYTE, WRITE_BLOCK_SIZE};
use crate::error::{BootError, BootResult};
use crate::ports::{File, FileSystem, FlashDriver};

/// Backup. If `dst_path` already exists, returns `Ok` without reading
/// anything — a pre-existing backup is preserved, never overwritten once
/// committed. Otherwise streams from flash into `tmp_path` and renames it
/// onto `dst_path` only after the whole region has been copied, so a crash
/// mid-backup can never promote a partial file.
#[allow(clippy::too_many_arguments)]
pub fn backup(
    fs: &mut impl FileSystem,
    flash: &impl FlashDriver,
    src_addr: u32,
    size: u32,
    dst_path: &str,
    tmp_path: &str,
    chunk_buf: &mut [u8],
    mut on_progress: impl FnMut(u64, u64),
) -> BootResult<()> {
    if fs.exists(dst_path)? {
        return Ok(());
    }

    let mut tmp = fs.create_write(tmp_path)?;
    let total = size as u64;
    let mut remaining = total;
    let mut addr = src_addr;

    on_progress(0, total);
    while remaining > 0 {
        let n = (remaining as usize).min(chunk_buf.len());
        let buf = &mut chunk_buf[..n];
        flash.read(addr, buf);
        tmp.write_all(buf)?;
        addr += n as u32;
        remaining -= n as u64;
        on_progress(total - remaining, total);
    }

    fs.rename(tmp_path, dst_path)?;
    Ok(())
}

/// Erase. Computes `ceil(size / sector_size)` sectors starting at the
/// region's own sector, erasing sequentially and reporting progress by
/// sector count. Any sector failure aborts with `EraseFailed` — the region
/// is left irrecoverable at that point, mitigated by the retained backup
/// and the rollback orchestrator.
pub fn erase(
    flash: &mut impl FlashDriver,
    region: RegionConfig,
    size: u32,
    mut on_progress: impl FnMut(u64, u64),
) -> BootResult<()> {
    let sector_size = flash.sector_size();
    let n_sectors = if size == 0 { 0 } else { size.div_ceil(sector_size) };
    let bank = flash.bank_of(region.start_addr);
    let start_sector = flash.sector_of(region.start_addr);

    for i in 0..n_sectors {
        flash
            .erase_sector(bank, start_sector + i)
            .map_err(|_| BootError::EraseFailed)?;
        on_progress((i + 1) as u64, n_sectors as u64);
    }
    Ok(())
}

/// Program. Precondition: `region_base % 32 == 0`, else `Misaligned`.
/// Streams `size` bytes from `src_file` through `chunk_buf`, decomposing
/// every chunk into exactly-32-byte blocks; a short final block is padded
/// with `0xFF` — erased bits stay erased, which is benign.
/// Progress is reported in real data bytes, excluding padding.
///
/// `chunk_buf.len()` must be a multiple of 32, or a chunk boundary could
/// fall mid-block and get padded prematurely; `config::DEFAULT_CHUNK_SIZE`
/// always is.
pub fn program(
    flash: &mut impl FlashDriver,
    src_file: &mut impl File,
    region_base: u32,
    size: u32,
    chunk_buf: &mut [u8],
    mut on_progress: impl FnMut(u64, u64),
) -> BootResult<()> {
    debug_assert_eq!(chunk_buf.len() % WRITE_BLOCK_SIZE, 0);

    if region_base % WRITE_BLOCK_SIZE as u32 != 0 {
        return Err(BootError::Misaligned);
    }

    let total = size as u64;
    let mut remaining = total;
    let mut addr = region_base;
    let mut written: u64 = 0;

    while remaining > 0 {
        let to_read = (remaining as usize).min(chunk_buf.len());
        let buf = &mut chunk_buf[..to_read];
        src_file.read_exact(buf)?;

        let mut offset = 0;
        while offset < buf.len() {
            if addr % WRITE_BLOCK_SIZE as u32 != 0 {
                return Err(BootError::Misaligned);
            }
            let n = (buf.len() - offset).min(WRITE_BLOCK_SIZE);
            let mut block = [PAD_BYTE; WRITE_BLOCK_SIZE];
            block[..n].copy_from_slice(&buf[offset..offset + n]);

            flash.write_block32(addr, &block)?;

            addr += WRITE_BLOCK_SIZE as u32;
            offset += n;
            written += n as u64;
            on_progress(written, total);
        }
        remaining -= to_read as u64;
    }
    Ok(())
}
