use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("download dir '{path}' could not be created: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open file '{path}' for writing: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP transfer failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("FTP server replied {code}: {message}")]
    Ftp { code: u16, message: String },
    #[error("transfer I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether the failure happened on the network side rather than while
    /// preparing the local file.
    pub fn is_transfer(&self) -> bool {
        !matches!(self, FetchError::CreateDir { .. } | FetchError::OpenFile { .. })
    }
}
