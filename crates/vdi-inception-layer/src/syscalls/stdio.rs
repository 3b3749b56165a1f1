//! `fopen`, `fopen64`, `fopenat` and `freopen`.

use crate::guard::InceptionLayerGuard;
use crate::reals::{real, FopenFn, FopenatFn, FreopenFn};
use crate::reals::{REAL_FOPEN, REAL_FOPEN64, REAL_FOPENAT, REAL_FREOPEN};
use crate::syscalls::{opt_cstr, route};
use crate::{get_errno, set_errno};
use libc::{c_char, c_int, FILE};
use std::ffi::CString;
use std::ptr;
use vdi_engine::{CallEvent, RealSymbol, Redirect};

/// Local path to hand the real function: `Ok(None)` keeps the caller's,
/// `Err(())` means the URL could not be fetched.
fn local_target(redirect: Redirect) -> Result<Option<CString>, ()> {
    match redirect {
        Redirect::Passthrough => Ok(None),
        Redirect::Local(local) => Ok(Some(local)),
        Redirect::Unavailable(_) => Err(()),
    }
}

unsafe fn fopen_common(
    func: &'static str,
    sym: &RealSymbol,
    path: *const c_char,
    mode: *const c_char,
) -> *mut FILE {
    let Some(_guard) = InceptionLayerGuard::enter() else {
        let f: FopenFn = real(sym);
        return f(path, mode);
    };
    let errno = get_errno();

    let path_c = opt_cstr(path);
    let event = CallEvent::new(func).c_str(path_c).c_str(opt_cstr(mode));

    let Ok(target) = local_target(route(&event, path_c)) else {
        set_errno(libc::ENOENT);
        return ptr::null_mut();
    };
    let f: FopenFn = real(sym);
    set_errno(errno);
    f(target.as_ref().map_or(path, |local| local.as_ptr()), mode)
}

#[no_mangle]
pub unsafe extern "C" fn fopen(path: *const c_char, mode: *const c_char) -> *mut FILE {
    fopen_common("fopen", &REAL_FOPEN, path, mode)
}

#[no_mangle]
pub unsafe extern "C" fn fopen64(path: *const c_char, mode: *const c_char) -> *mut FILE {
    fopen_common("fopen64", &REAL_FOPEN64, path, mode)
}

#[no_mangle]
pub unsafe extern "C" fn fopenat(
    dirfd: c_int,
    path: *const c_char,
    mode: *const c_char,
) -> *mut FILE {
    let Some(_guard) = InceptionLayerGuard::enter() else {
        let f: FopenatFn = real(&REAL_FOPENAT);
        return f(dirfd, path, mode);
    };
    let errno = get_errno();

    let path_c = opt_cstr(path);
    let event = CallEvent::new("fopenat")
        .int(dirfd as i64)
        .c_str(path_c)
        .c_str(opt_cstr(mode));

    let Ok(target) = local_target(route(&event, path_c)) else {
        set_errno(libc::ENOENT);
        return ptr::null_mut();
    };
    let f: FopenatFn = real(&REAL_FOPENAT);
    set_errno(errno);
    f(dirfd, target.as_ref().map_or(path, |local| local.as_ptr()), mode)
}

/// A NULL `path` (reopen with a new mode) is logged as `(null)` and never
/// rewritten.
#[no_mangle]
pub unsafe extern "C" fn freopen(
    path: *const c_char,
    mode: *const c_char,
    stream: *mut FILE,
) -> *mut FILE {
    let Some(_guard) = InceptionLayerGuard::enter() else {
        let f: FreopenFn = real(&REAL_FREOPEN);
        return f(path, mode, stream);
    };
    let errno = get_errno();

    let path_c = opt_cstr(path);
    let event = CallEvent::new("freopen")
        .c_str(path_c)
        .c_str(opt_cstr(mode))
        .ptr(stream as *const FILE);

    let Ok(target) = local_target(route(&event, path_c)) else {
        set_errno(libc::ENOENT);
        return ptr::null_mut();
    };
    let f: FreopenFn = real(&REAL_FREOPEN);
    set_errno(errno);
    f(target.as_ref().map_or(path, |local| local.as_ptr()), mode, stream)
}
