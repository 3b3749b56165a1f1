use crate::url::UrlScheme;
use crate::{ftp, http, FetchError};
use std::io::Write;
use std::time::Duration;

/// Moves the bytes behind a URL into a local sink.
pub trait Transport {
    /// Blocking transfer of `url` into `sink`; returns bytes written.
    fn download(&self, url: &str, scheme: UrlScheme, sink: &mut dyn Write) -> Result<u64, FetchError>;
}

/// Real network access: reqwest for HTTP(S), passive FTP otherwise.
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    pub timeout: Option<Duration>,
    /// Honour `http_proxy`/`https_proxy`/`no_proxy` for HTTP(S)
    pub use_env_proxy: bool,
}

impl Default for NetworkTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl NetworkTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            use_env_proxy: true,
        }
    }

    /// Connect directly even when proxy variables are set.
    pub fn without_proxy(mut self) -> Self {
        self.use_env_proxy = false;
        self
    }
}

impl Transport for NetworkTransport {
    fn download(&self, url: &str, scheme: UrlScheme, sink: &mut dyn Write) -> Result<u64, FetchError> {
        match scheme {
            UrlScheme::Https | UrlScheme::Http => {
                http::download(url, self.timeout, self.use_env_proxy, sink)
            }
            UrlScheme::Ftp => ftp::download(url, self.timeout, sink),
        }
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn download(&self, url: &str, scheme: UrlScheme, sink: &mut dyn Write) -> Result<u64, FetchError> {
        (**self).download(url, scheme, sink)
    }
}
