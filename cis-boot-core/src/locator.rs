//! C7 — Package Locator.

use heapless::String;

use crate::config::MAX_PACKAGE_PATH_LEN;
use crate::error::{BootError, BootResult};
use crate::ports::FileSystem;

/// Scans non-directory entries directly under `search_dir` and returns the
/// full path of the first whose basename starts with `prefix` and contains
/// `extension`. If the composed path doesn't fit the fixed-capacity buffer,
/// that candidate is treated as absent rather than silently truncated.
pub fn find_package(
    fs: &mut impl FileSystem,
    search_dir: &str,
    prefix: &str,
    extension: &str,
) -> BootResult<String<MAX_PACKAGE_PATH_LEN>> {
    let mut matched = false;
    let mut result: BootResult<String<MAX_PACKAGE_PATH_LEN>> = Err(BootError::NotFound);

    fs.visit_dir(search_dir, &mut |name, is_dir| {
        if is_dir || matched {
            return true;
        }
        if !name.starts_with(prefix) || !name.contains(extension) {
            return true;
        }
        matched = true;
        result = compose_path(search_dir, name);
        false
    })?;

    result
}

fn compose_path(dir: &str, name: &str) -> BootResult<String<MAX_PACKAGE_PATH_LEN>> {
    let dir = dir.trim_end_matches('/');
    let mut path: String<MAX_PACKAGE_PATH_LEN> = String::new();
    path.push_str(dir).map_err(|_| BootError::NotFound)?;
    path.push('/').map_err(|_| BootError::NotFound)?;
    path.push_str(name).map_err(|_| BootError::NotFound)?;
    Ok(path)
}
