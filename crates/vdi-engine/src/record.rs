//! Fixed-layout audit lines.
//!
//! Full layout, space separated and `\n` terminated:
//!
//! ```text
//! epoch::UTC host//fqdn//ips user home pid ppid pgid cwd exe args start elapsed func [arg...]
//! ```
//!
//! Field values are written as collected. Only argv is substituted; a
//! hostname, cwd or executable path containing a space shifts every later
//! field of that line.

use crate::event::CallEvent;
use std::fmt::Write;
use vdi_context::ProcessContext;

pub const COLUMN_SEPARATOR: char = ' ';

/// One formatted, newline-terminated line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    line: String,
}

impl LogRecord {
    /// Context fields followed by the call.
    pub fn full(ctx: &ProcessContext, event: &CallEvent) -> Self {
        let host = ctx.host.to_string();
        let capacity = 64
            + host.len()
            + ctx.timestamp.utc.len()
            + ctx.user.name.len()
            + ctx.user.home.len()
            + ctx.cwd.len()
            + ctx.exe.len()
            + ctx.args.len()
            + ctx.start.len()
            + ctx.elapsed.len()
            + call_len(event);

        let mut line = String::with_capacity(capacity);
        // Writing into a String cannot fail.
        let _ = write!(
            line,
            "{ts} {host} {user} {home} {ids} {cwd} {exe} {args} {start} {elapsed} ",
            ts = ctx.timestamp,
            host = host,
            user = ctx.user.name,
            home = ctx.user.home,
            ids = ctx.ids,
            cwd = ctx.cwd,
            exe = ctx.exe,
            args = ctx.args,
            start = ctx.start,
            elapsed = ctx.elapsed,
        );
        push_call(&mut line, event);
        Self { line }
    }

    /// Only `func [arg...]`.
    pub fn minimal(event: &CallEvent) -> Self {
        let mut line = String::with_capacity(call_len(event));
        push_call(&mut line, event);
        Self { line }
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }
}

fn call_len(event: &CallEvent) -> usize {
    event.func.len() + event.args.iter().map(|a| a.len() + 1).sum::<usize>() + 1
}

fn push_call(line: &mut String, event: &CallEvent) {
    line.push_str(event.func);
    for arg in &event.args {
        line.push(COLUMN_SEPARATOR);
        line.push_str(arg);
    }
    line.push('\n');
}
