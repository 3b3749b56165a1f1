//! # vdi-inception-layer
//!
//! LD_PRELOAD library that audits `open`, `open64`, `openat`, `fopen`,
//! `fopen64`, `fopenat`, `freopen` and `write`, and serves `http://`,
//! `https://` and `ftp://` paths from a local download cache.
//!
//! ```bash
//! LD_PRELOAD=target/debug/libvdi_inception_layer.so cat https://example.com/robots.txt
//! ```
//!
//! Every export takes the reentrancy guard before doing anything else. Calls
//! made while the guard is held (diagnostics, config loading, the log write
//! itself, the download) go straight to the real function.

// Unsafe FFI exports mirror the C prototypes; their contract is libc's.
#![allow(clippy::missing_safety_doc)]

#[cfg(not(target_os = "linux"))]
compile_error!("vdi-inception-layer relies on RTLD_NEXT and /proc and only builds on Linux");

pub mod guard;
pub mod reals;
pub mod syscalls;

use guard::InceptionLayerGuard;
use vdi_config::{init_logging, log_layer_debug};

extern "C" {
    fn set_inception_errno(e: libc::c_int);
    fn get_inception_errno() -> libc::c_int;
}

pub(crate) fn set_errno(e: libc::c_int) {
    // SAFETY: writes the calling thread's errno.
    unsafe { set_inception_errno(e) }
}

pub(crate) fn get_errno() -> libc::c_int {
    // SAFETY: reads the calling thread's errno.
    unsafe { get_inception_errno() }
}

/// Installs diagnostics once the dynamic loader maps the library.
#[link_section = ".init_array"]
#[used]
pub static VDI_LOADED_LINUX: unsafe extern "C" fn() = {
    unsafe extern "C" fn loaded() {
        let Some(_guard) = InceptionLayerGuard::enter() else {
            return;
        };
        let errno = get_errno();
        init_logging(vdi_config::config().log.debug_level);
        log_layer_debug!("library loaded", pid = std::process::id());
        set_errno(errno);
    }
    loaded
};

#[link_section = ".fini_array"]
#[used]
pub static VDI_UNLOADED_LINUX: unsafe extern "C" fn() = {
    unsafe extern "C" fn unloaded() {
        let Some(_guard) = InceptionLayerGuard::enter() else {
            return;
        };
        let errno = get_errno();
        log_layer_debug!("library unloaded", pid = std::process::id());
        set_errno(errno);
    }
    unloaded
};
