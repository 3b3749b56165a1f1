//! Directory helpers shared by the audit log and the download cache.

use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

/// Mode for directories created by the layer.
pub const DIR_MODE: u32 = 0o700;

/// Create `path` and any missing parents with `mode`.
///
/// Succeeds without touching anything when `path` is already a directory.
/// Fails with `ENOTDIR` when `path` (or a parent) exists but is not one.
pub fn ensure_dir(path: impl AsRef<Path>, mode: u32) -> io::Result<()> {
    let path = path.as_ref();

    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => return Err(io::Error::from_raw_os_error(libc::ENOTDIR)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
}
