//! `write`. Logs the descriptor and byte count, never the buffer.

use crate::guard::InceptionLayerGuard;
use crate::reals::{real, WriteFn, REAL_WRITE};
use crate::syscalls::route;
use crate::{get_errno, set_errno};
use libc::{c_int, c_void, size_t, ssize_t};
use vdi_engine::CallEvent;

#[no_mangle]
pub unsafe extern "C" fn write(fd: c_int, buf: *const c_void, count: size_t) -> ssize_t {
    let Some(_guard) = InceptionLayerGuard::enter() else {
        let f: WriteFn = real(&REAL_WRITE);
        return f(fd, buf, count);
    };
    let errno = get_errno();

    let event = CallEvent::new("write").int(fd as i64).int(count as i64);
    // No path, so this only ever logs.
    let _ = route(&event, None);

    let f: WriteFn = real(&REAL_WRITE);
    set_errno(errno);
    f(fd, buf, count)
}
