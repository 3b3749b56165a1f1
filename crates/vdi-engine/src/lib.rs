//! # vdi-engine
//!
//! The part of the preload layer that does not depend on being preloaded:
//!
//! - [`reals`]: lazily resolved handles to the next definition of a symbol
//! - [`event`]: a call and its rendered arguments (flags, modes, pointers)
//! - [`record`]: the fixed-layout audit line
//! - [`writer`]: appending records through non-intercepted primitives
//! - [`intercept`]: log, then decide whether a path is a URL to fetch

pub mod event;
pub mod intercept;
pub mod reals;
pub mod record;
pub mod writer;

pub use event::{render_flags, render_mode, CallEvent};
pub use intercept::{Interceptor, Redirect};
pub use reals::RealSymbol;
pub use record::LogRecord;
pub use writer::{AuditError, AuditLog, LibcIo, RawIo};
