//! Log Record Writer: appends one line per call to `{dir}/{prefix}{pid}`.
//!
//! The file is opened, written with a single `write`, and closed again on
//! every call. Lines from concurrent threads therefore interleave whole,
//! because `O_APPEND` makes each single write atomic with respect to the
//! file offset.

use crate::event::CallEvent;
use crate::record::LogRecord;
use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use vdi_config::path::{ensure_dir, DIR_MODE};
use vdi_config::{log_audit_info, log_audit_trace, LogConfig, LogFormat};
use vdi_context::ProcessContext;

/// Mode for newly created log files.
pub const LOG_FILE_MODE: libc::mode_t = 0o640;

static LOG_PATH_SHOWN: AtomicBool = AtomicBool::new(false);

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("log dir '{path}' does not exist or is not a directory: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("log path '{0}' contains a NUL byte")]
    InvalidPath(PathBuf),
    #[error("cannot open log file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write log file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("short write to '{path}': {written} of {expected} bytes")]
    ShortWrite {
        path: PathBuf,
        written: usize,
        expected: usize,
    },
}

/// The three primitives the writer needs. The preload library backs these
/// with the real (non-intercepted) libc functions.
pub trait RawIo {
    fn open_append(&self, path: &CStr, mode: libc::mode_t) -> io::Result<RawFd>;
    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize>;
    fn close(&self, fd: RawFd);
}

/// Plain libc calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibcIo;

/// Flags used to open the log file.
pub const APPEND_FLAGS: libc::c_int =
    libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND | libc::O_CLOEXEC;

impl RawIo for LibcIo {
    fn open_append(&self, path: &CStr, mode: libc::mode_t) -> io::Result<RawFd> {
        // SAFETY: path is NUL-terminated.
        let fd = unsafe { libc::open(path.as_ptr(), APPEND_FLAGS, mode as libc::c_uint) };
        if fd < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(fd)
        }
    }

    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: buf is valid for buf.len() bytes.
        let n = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn close(&self, fd: RawFd) {
        // SAFETY: fd was returned by open_append and is closed once.
        unsafe { libc::close(fd) };
    }
}

/// Appends formatted records through a [`RawIo`].
pub struct AuditLog<I = LibcIo> {
    io: I,
}

impl<I: RawIo> AuditLog<I> {
    pub fn new(io: I) -> Self {
        Self { io }
    }

    /// Format `event` per `cfg.format` and append it to this process's log.
    pub fn append(&self, cfg: &LogConfig, event: &CallEvent) -> Result<(), AuditError> {
        let pid = std::process::id() as i32;
        let dir = cfg.resolved_dir();
        let path = cfg.log_path(pid);

        ensure_dir(&dir, DIR_MODE).map_err(|source| AuditError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        if !LOG_PATH_SHOWN.swap(true, Ordering::AcqRel) {
            log_audit_info!("using log file", path = tracing::field::display(path.display()));
        }

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| AuditError::InvalidPath(path.clone()))?;
        let fd = self
            .io
            .open_append(&c_path, LOG_FILE_MODE)
            .map_err(|source| AuditError::Open {
                path: path.clone(),
                source,
            })?;

        let record = match cfg.format {
            LogFormat::Full => LogRecord::full(&ProcessContext::snapshot(), event),
            LogFormat::Minimal => LogRecord::minimal(event),
        };
        log_audit_trace!("record", line = record.as_str().trim_end());

        let bytes = record.as_bytes();
        let written = self.io.write(fd, bytes);
        self.io.close(fd);

        match written {
            Ok(n) if n == bytes.len() => Ok(()),
            Ok(n) => Err(AuditError::ShortWrite {
                path,
                written: n,
                expected: bytes.len(),
            }),
            Err(source) => Err(AuditError::Write { path, source }),
        }
    }
}
