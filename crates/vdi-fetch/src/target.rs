use crate::url::final_segment;
use std::path::{Path, PathBuf};

/// Name used when the URL has no final path segment.
pub const DEFAULT_FILENAME: &str = "default_filename";

/// Where one download lands.
///
/// The filename is `{pid}.{epoch}.{segment}` so concurrent processes never
/// share a cache file. Two fetches in the same process and second that
/// yield the same segment do share one, and the later overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// What the transport fetches
    pub url: String,
    pub base: PathBuf,
    pub local_path: PathBuf,
}

impl DownloadTarget {
    pub fn compute(url: &str, base: &Path, pid: i32, epoch: i64) -> Self {
        let segment = match final_segment(url) {
            "" => DEFAULT_FILENAME,
            s => s,
        };
        Self {
            url: url.to_string(),
            base: base.to_path_buf(),
            local_path: base.join(format!("{}.{}.{}", pid, epoch, segment)),
        }
    }
}
