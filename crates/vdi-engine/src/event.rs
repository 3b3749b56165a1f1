//! One intercepted call and its pre-rendered arguments.

use libc::c_int;
use std::ffi::CStr;

/// Logged in place of a NULL path.
pub const NULL_ARG: &str = "(null)";

/// Function name plus positional arguments, each already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEvent {
    pub func: &'static str,
    pub args: Vec<String>,
}

impl CallEvent {
    pub fn new(func: &'static str) -> Self {
        Self {
            func,
            args: Vec::with_capacity(4),
        }
    }

    /// Text argument, verbatim.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// C string argument; NULL renders as `(null)`.
    pub fn c_str(self, value: Option<&CStr>) -> Self {
        match value {
            Some(s) => self.arg(s.to_string_lossy()),
            None => self.arg(NULL_ARG),
        }
    }

    pub fn int(self, value: i64) -> Self {
        self.arg(value.to_string())
    }

    pub fn flags(self, flags: c_int) -> Self {
        self.arg(render_flags(flags))
    }

    pub fn mode(self, mode: libc::mode_t) -> Self {
        self.arg(render_mode(mode))
    }

    /// Pointer argument as C's `%p` renders it.
    pub fn ptr<T>(self, p: *const T) -> Self {
        if p.is_null() {
            self.arg("(nil)")
        } else {
            self.arg(format!("{:#x}", p as usize))
        }
    }
}

/// Status flags rendered after the access mode, in this order.
const OPEN_FLAGS: &[(c_int, &str)] = &[
    (libc::O_CREAT, "O_CREAT"),
    (libc::O_EXCL, "O_EXCL"),
    (libc::O_NOCTTY, "O_NOCTTY"),
    (libc::O_TRUNC, "O_TRUNC"),
    (libc::O_APPEND, "O_APPEND"),
    (libc::O_NONBLOCK, "O_NONBLOCK"),
    (libc::O_DSYNC, "O_DSYNC"),
    (libc::O_SYNC, "O_SYNC"),
    (libc::O_DIRECTORY, "O_DIRECTORY"),
    (libc::O_NOFOLLOW, "O_NOFOLLOW"),
    (libc::O_CLOEXEC, "O_CLOEXEC"),
];

/// Symbolic names joined by `+`: access mode first, then [`OPEN_FLAGS`]
/// order. Unknown bits are dropped.
pub fn symbolic_flags(flags: c_int) -> String {
    let mut names: Vec<&str> = Vec::with_capacity(4);

    match flags & libc::O_ACCMODE {
        libc::O_RDONLY => names.push("O_RDONLY"),
        libc::O_WRONLY => names.push("O_WRONLY"),
        libc::O_RDWR => names.push("O_RDWR"),
        _ => {}
    }

    let full_sync = flags & libc::O_SYNC == libc::O_SYNC;
    for &(bit, name) in OPEN_FLAGS {
        if bit == 0 || flags & bit != bit {
            continue;
        }
        // O_SYNC contains the O_DSYNC bit.
        if bit == libc::O_DSYNC && full_sync {
            continue;
        }
        names.push(name);
    }

    names.join("+")
}

/// `decimal::SYMBOLIC`
pub fn render_flags(flags: c_int) -> String {
    format!("{}::{}", flags, symbolic_flags(flags))
}

/// `decimal::0octal`
pub fn render_mode(mode: libc::mode_t) -> String {
    format!("{}::0{:o}", mode, mode)
}
