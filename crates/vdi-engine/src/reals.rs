//! Real Symbol Storage
//!
//! Each intercepted function keeps a handle to the next definition of its
//! symbol (`dlsym(RTLD_NEXT)`), resolved on first use and cached for the
//! life of the process.
//!
//! Two threads racing on the first call may both resolve; both store the
//! same address, so the race is benign and no lock is taken.

use libc::{c_char, c_void};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Lazily resolved handle to the real implementation of one symbol.
pub struct RealSymbol {
    ptr: AtomicPtr<c_void>,
    /// NUL-terminated
    name: &'static str,
}

impl RealSymbol {
    /// `name` must end in `\0`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            ptr: AtomicPtr::new(std::ptr::null_mut()),
            name,
        }
    }

    /// Symbol name without the terminator.
    pub fn name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }

    /// Resolve (once) and return the real function, `None` when no later
    /// object defines the symbol.
    pub fn get(&self) -> Option<NonNull<c_void>> {
        let p = self.ptr.load(Ordering::Acquire);
        if let Some(p) = NonNull::new(p) {
            return Some(p);
        }
        if !self.name.ends_with('\0') {
            return None;
        }
        // SAFETY: name is NUL-terminated and 'static.
        let f = unsafe { libc::dlsym(libc::RTLD_NEXT, self.name.as_ptr() as *const c_char) };
        let f = NonNull::new(f)?;
        self.ptr.store(f.as_ptr(), Ordering::Release);
        Some(f)
    }

    /// Like [`get`](Self::get), but an unresolvable symbol ends the process
    /// with a diagnostic instead of handing back an invalid handle.
    pub fn get_or_abort(&self) -> NonNull<c_void> {
        match self.get() {
            Some(f) => f,
            None => fatal(&["vdi: cannot resolve real symbol '", self.name(), "'\n"]),
        }
    }
}

/// Write `parts` to stderr with a raw syscall and abort.
///
/// Goes straight to `SYS_write` so nothing here can re-enter an
/// intercepted symbol.
pub fn fatal(parts: &[&str]) -> ! {
    for part in parts {
        // SAFETY: writes a valid buffer to fd 2.
        unsafe {
            libc::syscall(libc::SYS_write, 2 as libc::c_long, part.as_ptr(), part.len());
        }
    }
    // SAFETY: abort never returns.
    unsafe { libc::abort() }
}
