//! Reentrancy guard.
//!
//! Anything the layer does on behalf of a call (reading config, writing the
//! record, emitting diagnostics, downloading) may itself reach an exported
//! symbol. While a thread holds the guard those nested calls forward to the
//! real function untouched.

use std::cell::Cell;

thread_local! {
    static IN_LAYER: Cell<bool> = const { Cell::new(false) };
}

/// Name reqwest gives the thread that drives its blocking client.
const FETCH_RUNTIME_THREAD: &str = "reqwest-internal-sync-runtime";

/// Kernel thread names hold 15 bytes plus the terminator.
const TASK_COMM_LEN: usize = 16;

pub(crate) struct InceptionLayerGuard(());

impl InceptionLayerGuard {
    /// `None` when this thread is already inside the layer, or when it is
    /// the download runtime working for an in-flight fetch.
    pub(crate) fn enter() -> Option<Self> {
        if vdi_fetch::download_in_progress() && on_fetch_runtime_thread() {
            return None;
        }
        IN_LAYER
            .try_with(|active| {
                if active.replace(true) {
                    None
                } else {
                    Some(InceptionLayerGuard(()))
                }
            })
            .ok()
            .flatten()
    }
}

impl Drop for InceptionLayerGuard {
    fn drop(&mut self) {
        let _ = IN_LAYER.try_with(|active| active.set(false));
    }
}

fn on_fetch_runtime_thread() -> bool {
    let mut buf = [0 as libc::c_char; TASK_COMM_LEN];
    // SAFETY: buf holds TASK_COMM_LEN bytes, the size passed in.
    let rc = unsafe { libc::pthread_getname_np(libc::pthread_self(), buf.as_mut_ptr(), buf.len()) };
    if rc != 0 {
        return false;
    }
    let name: Vec<u8> = buf
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    is_fetch_runtime_name(&name)
}

/// The OS keeps only the first 15 bytes of a thread name, so match the
/// truncated form.
fn is_fetch_runtime_name(os_name: &[u8]) -> bool {
    let expected = FETCH_RUNTIME_THREAD.as_bytes();
    let visible = &expected[..expected.len().min(TASK_COMM_LEN - 1)];
    os_name == visible
}
