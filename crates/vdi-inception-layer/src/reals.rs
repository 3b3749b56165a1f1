//! Real symbol table for every export, plus the [`RawIo`] the audit log
//! writes through.

use crate::syscalls::open::c_open_bridge;
use libc::{c_char, c_int, c_void, size_t, ssize_t, FILE};
use std::ffi::CStr;
use std::io;
use std::os::unix::io::RawFd;
use vdi_engine::writer::APPEND_FLAGS;
use vdi_engine::{RawIo, RealSymbol};

pub static REAL_OPEN: RealSymbol = RealSymbol::new("open\0");
pub static REAL_OPEN64: RealSymbol = RealSymbol::new("open64\0");
pub static REAL_OPENAT: RealSymbol = RealSymbol::new("openat\0");
pub static REAL_FOPEN: RealSymbol = RealSymbol::new("fopen\0");
pub static REAL_FOPEN64: RealSymbol = RealSymbol::new("fopen64\0");
pub static REAL_FOPENAT: RealSymbol = RealSymbol::new("fopenat\0");
pub static REAL_FREOPEN: RealSymbol = RealSymbol::new("freopen\0");
pub static REAL_WRITE: RealSymbol = RealSymbol::new("write\0");

pub type FopenFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut FILE;
pub type FopenatFn = unsafe extern "C" fn(c_int, *const c_char, *const c_char) -> *mut FILE;
pub type FreopenFn = unsafe extern "C" fn(*const c_char, *const c_char, *mut FILE) -> *mut FILE;
pub type WriteFn = unsafe extern "C" fn(c_int, *const c_void, size_t) -> ssize_t;

/// Resolve `sym` and view it as the function type `F`.
///
/// # Safety
/// `F` must be a function pointer type matching the symbol's prototype.
pub(crate) unsafe fn real<F: Copy>(sym: &RealSymbol) -> F {
    let f = sym.get_or_abort();
    std::mem::transmute_copy::<*mut c_void, F>(&f.as_ptr())
}

/// Log file I/O through the real `open` and `write`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealIo;

impl RawIo for RealIo {
    fn open_append(&self, path: &CStr, mode: libc::mode_t) -> io::Result<RawFd> {
        // SAFETY: path is NUL-terminated; REAL_OPEN is libc's open.
        let fd = unsafe {
            c_open_bridge(REAL_OPEN.get_or_abort().as_ptr(), path.as_ptr(), APPEND_FLAGS, mode)
        };
        if fd < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(fd)
        }
    }

    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: WriteFn matches write(2); buf is valid for its length.
        let n = unsafe {
            let write: WriteFn = real(&REAL_WRITE);
            write(fd, buf.as_ptr() as *const c_void, buf.len())
        };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn close(&self, fd: RawFd) {
        // SAFETY: fd came from open_append and is closed once.
        unsafe { libc::close(fd) };
    }
}
