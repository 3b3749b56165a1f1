//! # vdi-fetch
//!
//! Fetch-and-cache for URL path arguments. A recognised URL is downloaded
//! into `{download_base}/{pid}.{epoch}.{name}` and the caller opens that
//! local file instead.
//!
//! Network access sits behind [`Transport`]; [`NetworkTransport`] is the
//! real implementation (reqwest blocking client for HTTP/HTTPS with
//! redirects followed, passive-mode FTP).

pub mod error;
pub mod ftp;
pub mod http;
pub mod target;
pub mod transport;
pub mod url;

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use vdi_config::path::{ensure_dir, DIR_MODE};
use vdi_config::{log_fetch_debug, log_fetch_error, log_fetch_trace};

pub use error::FetchError;
pub use target::{DownloadTarget, DEFAULT_FILENAME};
pub use transport::{NetworkTransport, Transport};
pub use url::{match_url_prefix, UrlScheme};

/// Mode for downloaded cache files.
pub const FILE_MODE: u32 = 0o600;

static ACTIVE_DOWNLOADS: AtomicUsize = AtomicUsize::new(0);

/// Whether any thread in this process is inside [`RemoteFetcher::fetch`].
pub fn download_in_progress() -> bool {
    ACTIVE_DOWNLOADS.load(Ordering::Acquire) > 0
}

struct ActiveDownload;

impl ActiveDownload {
    fn enter() -> Self {
        ACTIVE_DOWNLOADS.fetch_add(1, Ordering::AcqRel);
        ActiveDownload
    }
}

impl Drop for ActiveDownload {
    fn drop(&mut self) {
        ACTIVE_DOWNLOADS.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Downloads URLs into a cache directory through a [`Transport`].
pub struct RemoteFetcher<T = NetworkTransport> {
    transport: T,
}

impl<T: Transport> RemoteFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Download `url` below `base` and return the local path.
    ///
    /// The directory is created on demand. A transfer failure removes the
    /// partial file so a later open cannot pick it up.
    pub fn fetch(&self, url: &str, base: &Path, pid: i32, epoch: i64) -> Result<PathBuf, FetchError> {
        let scheme = match_url_prefix(url.as_bytes())
            .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
        let target = DownloadTarget::compute(url, base, pid, epoch);

        let existed = base.is_dir();
        ensure_dir(&target.base, DIR_MODE).map_err(|source| FetchError::CreateDir {
            path: target.base.clone(),
            source,
        })?;
        if !existed {
            log_fetch_trace!("created download dir", dir = tracing::field::display(target.base.display()));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(FILE_MODE)
            .open(&target.local_path)
            .map_err(|source| FetchError::OpenFile {
                path: target.local_path.clone(),
                source,
            })?;

        let _active = ActiveDownload::enter();
        match self.transport.download(&target.url, scheme, &mut file) {
            Ok(bytes) => {
                log_fetch_debug!(
                    "download successful",
                    url = target.url.as_str(),
                    path = tracing::field::display(target.local_path.display()),
                    bytes = bytes,
                );
                Ok(target.local_path)
            }
            Err(e) => {
                log_fetch_error!("download failed", url = target.url.as_str(), error = tracing::field::display(&e));
                drop(file);
                let _ = std::fs::remove_file(&target.local_path);
                Err(e)
            }
        }
    }
}
