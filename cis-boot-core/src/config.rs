//! Centralizes the constants describing the package layout and filesystem
//! conventions the way `crispy_common::protocol` centralizes
//! `FLASH_BASE`/`FW_A_ADDR`/etc: one place that both the core and the binary
//! crate agree on.

/// Size in bytes of the fixed package header (magic + three sizes + version).
pub const HEADER_SIZE: usize = 24;

/// Size in bytes of the trailing CRC footer.
pub const TRAILER_SIZE: usize = 4;

/// Expected 4-byte magic at offset 0 of a package.
pub const PACKAGE_MAGIC: [u8; 4] = *b"BOOT";

/// Flash program/erase granularity in bytes.
pub const WRITE_BLOCK_SIZE: usize = 32;

/// Default streaming buffer size used by verify/backup/program/extract.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Byte used to pad a short final write block.
pub const PAD_BYTE: u8 = 0xFF;

/// Default backup file names.
pub const BACKUP_A_NAME: &str = "backup_A.bin";
pub const BACKUP_B_NAME: &str = "backup_B.bin";

/// Temporary-file suffix used while a backup is being written.
pub const BACKUP_TMP_SUFFIX: &str = ".tmp";
pub const BACKUP_A_TMP_NAME: &str = "backup_A.bin.tmp";
pub const BACKUP_B_TMP_NAME: &str = "backup_B.bin.tmp";

/// Upper bound on a composed package path (directory + '/' + basename), used
/// by the locator's fixed-capacity `heapless::String` buffer.
pub const MAX_PACKAGE_PATH_LEN: usize = 96;

/// Default package search directory and naming convention.
pub const PACKAGE_SEARCH_DIR: &str = "/firmware";
pub const PACKAGE_PREFIX: &str = "cis_package_";
pub const PACKAGE_EXTENSION: &str = ".bin";

/// Default destination of the extracted auxiliary data, treated as a
/// configurable constant rather than hard-coded deep inside the extractor.
pub const DEFAULT_EXTERNAL_DATA_PATH: &str = "/External_MAX8.tar.gz";

/// Geometry of a single image region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionConfig {
    /// Absolute start address in flash.
    pub start_addr: u32,
    /// Reserved capacity in bytes; `size_A`/`size_B` must not exceed this.
    pub capacity: u32,
}

/// Full configuration the orchestrators need, replacing the original's
/// hard-coded `FW_CM7_START_ADDR`/`FW_CM4_START_ADDR`/path constants with
/// values a deployment can override.
#[derive(Debug, Clone, Copy)]
pub struct BootConfig {
    pub region_a: RegionConfig,
    pub region_b: RegionConfig,
    pub backup_a_path: &'static str,
    pub backup_b_path: &'static str,
    pub backup_a_tmp_path: &'static str,
    pub backup_b_tmp_path: &'static str,
    pub external_data_path: &'static str,
    pub package_search_dir: &'static str,
    pub package_prefix: &'static str,
    pub package_extension: &'static str,
    pub chunk_size: usize,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            region_a: RegionConfig {
                start_addr: 0x0804_0000,
                capacity: 768 * 1024,
            },
            region_b: RegionConfig {
                start_addr: 0x0810_0000,
                capacity: 768 * 1024,
            },
            backup_a_path: BACKUP_A_NAME,
            backup_b_path: BACKUP_B_NAME,
            backup_a_tmp_path: BACKUP_A_TMP_NAME,
            backup_b_tmp_path: BACKUP_B_TMP_NAME,
            external_data_path: DEFAULT_EXTERNAL_DATA_PATH,
            package_search_dir: PACKAGE_SEARCH_DIR,
            package_prefix: PACKAGE_PREFIX,
            package_extension: PACKAGE_EXTENSION,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
