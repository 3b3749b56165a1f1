//! Per-call pipeline shared by every exported wrapper: append the audit
//! record, then decide what path the real function should see.

use crate::event::CallEvent;
use crate::writer::{AuditLog, RawIo};
use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use vdi_config::{log_audit_error, log_layer_debug, Config};
use vdi_context::{Timestamp, UserInfo};
use vdi_fetch::{match_url_prefix, FetchError, RemoteFetcher, Transport};

/// What the wrapper forwards to the real function.
#[derive(Debug)]
pub enum Redirect {
    /// Not a URL (or fetching is off): use the caller's arguments.
    Passthrough,
    /// URL fetched; open this local copy instead.
    Local(CString),
    /// URL could not be fetched; fail with `ENOENT` without calling the
    /// real function.
    Unavailable(FetchError),
}

pub struct Interceptor<I, T> {
    audit: AuditLog<I>,
    fetcher: RemoteFetcher<T>,
}

impl<I: RawIo, T: Transport> Interceptor<I, T> {
    pub fn new(io: I, transport: T) -> Self {
        Self {
            audit: AuditLog::new(io),
            fetcher: RemoteFetcher::new(transport),
        }
    }

    /// Log `event`, then resolve `path`. A logging failure is reported and
    /// otherwise ignored.
    pub fn intercept(&self, cfg: &Config, event: &CallEvent, path: Option<&CStr>) -> Redirect {
        if let Some(p) = path {
            log_layer_debug!(
                "called",
                func = event.func,
                path = tracing::field::display(p.to_string_lossy()),
            );
        }

        if let Err(e) = self.audit.append(&cfg.log, event) {
            log_audit_error!("failed to append record", error = tracing::field::display(&e));
        }

        self.redirect(cfg, path)
    }

    /// URL rewrite decision on its own.
    pub fn redirect(&self, cfg: &Config, path: Option<&CStr>) -> Redirect {
        let Some(path) = path else {
            return Redirect::Passthrough;
        };
        if !cfg.fetch.enabled || match_url_prefix(path.to_bytes()).is_none() {
            return Redirect::Passthrough;
        }

        let url = match path.to_str() {
            Ok(url) => url,
            Err(_) => {
                return Redirect::Unavailable(FetchError::InvalidUrl(
                    path.to_string_lossy().into_owned(),
                ))
            }
        };

        let username = match cfg.fetch.download_base {
            Some(_) => String::new(),
            None => UserInfo::current().name,
        };
        let base = cfg.fetch.download_base(&username);
        let pid = std::process::id() as i32;

        match self.fetcher.fetch(url, &base, pid, Timestamp::now().epoch) {
            Ok(local) => match CString::new(local.as_os_str().as_bytes()) {
                Ok(local) => Redirect::Local(local),
                Err(_) => Redirect::Unavailable(FetchError::InvalidUrl(url.to_string())),
            },
            Err(e) => Redirect::Unavailable(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::LibcIo;
    use std::io::Write;
    use vdi_config::testing::TestEnvironment;
    use vdi_fetch::UrlScheme;

    struct Serving(&'static [u8]);

    impl Transport for Serving {
        fn download(
            &self,
            _url: &str,
            _scheme: UrlScheme,
            sink: &mut dyn Write,
        ) -> Result<u64, FetchError> {
            sink.write_all(self.0)?;
            Ok(self.0.len() as u64)
        }
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn download(
            &self,
            _url: &str,
            _scheme: UrlScheme,
            _sink: &mut dyn Write,
        ) -> Result<u64, FetchError> {
            Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into())
        }
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_local_path_passes_through() {
        let env = TestEnvironment::new().unwrap();
        let interceptor = Interceptor::new(LibcIo, Unreachable);
        let path = c("/etc/hosts");

        let redirect = interceptor.intercept(
            &env.config(),
            &CallEvent::new("fopen").c_str(Some(&path)).arg("r"),
            Some(&path),
        );
        assert!(matches!(redirect, Redirect::Passthrough));
        assert_eq!(env.log_lines(std::process::id() as i32).len(), 1);
    }

    #[test]
    fn test_url_is_rewritten_to_download() {
        let env = TestEnvironment::new().unwrap();
        let interceptor = Interceptor::new(LibcIo, Serving(b"data"));
        let url = c("https://example.com/data.bin");

        let local = match interceptor.redirect(&env.config(), Some(&url)) {
            Redirect::Local(local) => local,
            other => panic!("expected a local path, got {:?}", other),
        };
        let local = std::path::PathBuf::from(local.to_str().unwrap());
        assert!(local.starts_with(&env.download_dir));
        assert!(local.to_str().unwrap().ends_with("data.bin"));
        assert_eq!(std::fs::read(&local).unwrap(), b"data");
    }

    #[test]
    fn test_failed_fetch_is_unavailable() {
        let env = TestEnvironment::new().unwrap();
        let interceptor = Interceptor::new(LibcIo, Unreachable);
        let url = c("http://127.0.0.1:1/x");

        let redirect = interceptor.redirect(&env.config(), Some(&url));
        assert!(matches!(redirect, Redirect::Unavailable(_)));
    }

    #[test]
    fn test_disabled_fetch_passes_urls_through() {
        let env = TestEnvironment::new().unwrap();
        let mut cfg = env.config();
        cfg.fetch.enabled = false;
        let interceptor = Interceptor::new(LibcIo, Unreachable);

        let redirect = interceptor.redirect(&cfg, Some(&c("ftp://h/f")));
        assert!(matches!(redirect, Redirect::Passthrough));
        assert!(!env.download_dir.exists());
    }

    #[test]
    fn test_null_path_passes_through() {
        let env = TestEnvironment::new().unwrap();
        let interceptor = Interceptor::new(LibcIo, Unreachable);
        assert!(matches!(
            interceptor.redirect(&env.config(), None),
            Redirect::Passthrough
        ));
    }

    #[test]
    fn test_logging_failure_does_not_block_redirect() {
        let env = TestEnvironment::new().unwrap();
        let blocker = env.create_file("blocker", b"x").unwrap();
        let mut cfg = env.config();
        cfg.log.dir = blocker.to_string_lossy().into_owned();
        let interceptor = Interceptor::new(LibcIo, Serving(b"ok"));
        let url = c("http://example.com/file.txt");

        let event = CallEvent::new("open").c_str(Some(&url));
        let redirect = interceptor.intercept(&cfg, &event, Some(&url));
        assert!(matches!(redirect, Redirect::Local(_)));
    }
}
