//! Exported wrappers, grouped by the call family they replace.
//!
//! Each wrapper takes the guard, renders its arguments into a
//! [`CallEvent`](vdi_engine::CallEvent), runs the shared pipeline in
//! [`route`], and forwards to the real symbol with the caller's arguments or
//! the local copy of a URL. `errno` is restored before forwarding so the
//! caller sees exactly what the real call left behind.

pub mod io;
pub mod open;
pub mod stdio;

use crate::reals::RealIo;
use libc::c_char;
use std::ffi::CStr;
use vdi_config::log_layer_debug;
use vdi_engine::{CallEvent, Interceptor, Redirect};
use vdi_fetch::NetworkTransport;

/// Borrow a C path argument, `None` for NULL.
///
/// # Safety
/// `p` is NULL or points to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn opt_cstr<'a>(p: *const c_char) -> Option<&'a CStr> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p))
    }
}

/// Log `event` and decide what path the real function gets.
pub(crate) fn route(event: &CallEvent, path: Option<&CStr>) -> Redirect {
    let cfg = vdi_config::config();
    let interceptor = Interceptor::new(RealIo, NetworkTransport::new(cfg.fetch.timeout()));
    let redirect = interceptor.intercept(&cfg, event, path);
    if let Redirect::Local(local) = &redirect {
        log_layer_debug!(
            "path rewritten",
            func = event.func,
            local = tracing::field::display(local.to_string_lossy()),
        );
    }
    redirect
}
