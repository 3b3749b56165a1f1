//! `open`, `open64` and `openat`.
//!
//! The exports take the mode as a fixed third (fourth for `openat`)
//! argument. On the supported ABIs the variadic slot is passed exactly like
//! a fixed one, so reading it is sound; it only carries meaning when the
//! flags say a mode was supplied.

use crate::guard::InceptionLayerGuard;
use crate::reals::{REAL_OPEN, REAL_OPEN64, REAL_OPENAT};
use crate::syscalls::{opt_cstr, route};
use crate::{get_errno, set_errno};
use libc::{c_char, c_int, c_void, mode_t};
use vdi_engine::{CallEvent, RealSymbol, Redirect};

extern "C" {
    pub(crate) fn c_open_bridge(real: *mut c_void, path: *const c_char, flags: c_int, mode: mode_t)
        -> c_int;
    fn c_openat_bridge(
        real: *mut c_void,
        dirfd: c_int,
        path: *const c_char,
        flags: c_int,
        mode: mode_t,
    ) -> c_int;
}

/// glibc's rule for when the variadic mode is read.
pub fn has_mode(flags: c_int) -> bool {
    flags & libc::O_CREAT != 0 || flags & libc::O_TMPFILE == libc::O_TMPFILE
}

unsafe fn forward_open(sym: &RealSymbol, path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    c_open_bridge(sym.get_or_abort().as_ptr(), path, flags, mode)
}

unsafe fn open_common(
    func: &'static str,
    sym: &RealSymbol,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    let Some(_guard) = InceptionLayerGuard::enter() else {
        return forward_open(sym, path, flags, mode);
    };
    let errno = get_errno();

    let path_c = opt_cstr(path);
    let mut event = CallEvent::new(func).c_str(path_c).flags(flags);
    if has_mode(flags) {
        event = event.mode(mode);
    }

    let target = match route(&event, path_c) {
        Redirect::Passthrough => None,
        Redirect::Local(local) => Some(local),
        Redirect::Unavailable(_) => {
            set_errno(libc::ENOENT);
            return -1;
        }
    };
    // Resolution may touch errno on first use.
    let real = sym.get_or_abort().as_ptr();
    set_errno(errno);
    let path = target.as_ref().map_or(path, |local| local.as_ptr());
    c_open_bridge(real, path, flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    open_common("open", &REAL_OPEN, path, flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    open_common("open64", &REAL_OPEN64, path, flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn openat(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    let Some(_guard) = InceptionLayerGuard::enter() else {
        return c_openat_bridge(REAL_OPENAT.get_or_abort().as_ptr(), dirfd, path, flags, mode);
    };
    let errno = get_errno();

    let path_c = opt_cstr(path);
    let mut event = CallEvent::new("openat")
        .int(dirfd as i64)
        .c_str(path_c)
        .flags(flags);
    if has_mode(flags) {
        event = event.mode(mode);
    }

    let target = match route(&event, path_c) {
        Redirect::Passthrough => None,
        Redirect::Local(local) => Some(local),
        Redirect::Unavailable(_) => {
            set_errno(libc::ENOENT);
            return -1;
        }
    };
    let real = REAL_OPENAT.get_or_abort().as_ptr();
    set_errno(errno);
    let path = target.as_ref().map_or(path, |local| local.as_ptr());
    c_openat_bridge(real, dirfd, path, flags, mode)
}
