//! C6 — External-Data Extractor, grounded on
//! `original_source/CM7/Application/Src/update.c`'s `update_writeExternalData`.

use crate::error::BootResult;
use crate::ports::{File, FileSystem};

/// Streams `size` bytes from `src_file`'s current position into `dst_path`,
/// opened for truncating write. Every chunk is committed through the
/// filesystem's own write primitive — this function trusts it to be
/// reliable, the same way the original trusts `f_write`'s return code.
/// Progress is reported proportional to bytes written.
pub fn extract_external(
    src_file: &mut impl File,
    size: u32,
    fs: &mut impl FileSystem,
    dst_path: &str,
    chunk_buf: &mut [u8],
    mut on_progress: impl FnMut(u64, u64),
) -> BootResult<()> {
    let mut dst = fs.create_write(dst_path)?;
    let total = size as u64;
    let mut remaining = total;

    on_progress(0, total);
    while remaining > 0 {
        let n = (remaining as usize).min(chunk_buf.len());
        let buf = &mut chunk_buf[..n];
        src_file.read_exact(buf)?;
        dst.write_all(buf)?;
        remaining -= n as u64;
        on_progress(total - remaining, total);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemFile, MemFs};

    #[test]
    fn copies_size_bytes_from_the_current_position() {
        let mut src = MemFile::new(std::vec![0xAAu8; 10].into_iter().chain(std::vec![0xBBu8; 40]).collect());
        src.seek(10).unwrap();
        let mut fs = MemFs::new();
        let mut chunk = [0u8; 16];
        extract_external(&mut src, 40, &mut fs, "/External_MAX8.tar.gz", &mut chunk, |_, _| {}).unwrap();
        let written = fs.get("/External_MAX8.tar.gz").unwrap();
        assert_eq!(written, std::vec![0xBBu8; 40]);
    }

    #[test]
    fn truncates_a_pre_existing_destination() {
        let mut src = MemFile::new(std::vec![1u8, 2, 3]);
        let mut fs = MemFs::new();
        fs.put("/External_MAX8.tar.gz", std::vec![0xFFu8; 100]);
        let mut chunk = [0u8; 8];
        extract_external(&mut src, 3, &mut fs, "/External_MAX8.tar.gz", &mut chunk, |_, _| {}).unwrap();
        assert_eq!(fs.get("/External_MAX8.tar.gz").unwrap(), std::vec![1u8, 2, 3]);
    }

    #[test]
    fn reports_proportional_progress() {
        let mut src = MemFile::new(std::vec![7u8; 20]);
        let mut fs = MemFs::new();
        let mut chunk = [0u8; 6];
        let mut calls = std::vec::Vec::new();
        extract_external(&mut src, 20, &mut fs, "/x", &mut chunk, |cur, total| calls.push((cur, total))).unwrap();
        assert_eq!(calls.last(), Some(&(20, 20)));
        assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn zero_size_writes_an_empty_file() {
        let mut src = MemFile::new(Vec::new());
        let mut fs = MemFs::new();
        let mut chunk = [0u8; 8];
        extract_external(&mut src, 0, &mut fs, "/x", &mut chunk, |_, _| {}).unwrap();
        assert_eq!(fs.get("/x").unwrap(), Vec::<u8>::new());
    }
}
