//! `/proc/<pid>` readers: executable, argv, start time.

use crate::sentinel;
use crate::time::format_utc;
use nix::time::{clock_gettime, ClockId};

/// Separator written between argv entries.
pub const ARG_SEPARATOR: &str = "%%";
/// Replacement for whitespace inside an argv entry.
pub const ARG_WHITESPACE_SUBSTITUTE: &str = "##";
/// Separates start epoch and start UTC.
pub const START_TIME_SEPARATOR: &str = "%%";

/// Field 22 of `/proc/<pid>/stat`.
const STARTTIME_FIELD: usize = 22;

pub fn exe_path(pid: i32) -> String {
    match std::fs::read_link(format!("/proc/{}/exe", pid)) {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(_) => sentinel::READLINK_ERROR.to_string(),
    }
}

pub fn cmdline(pid: i32) -> String {
    match std::fs::read(format!("/proc/{}/cmdline", pid)) {
        Ok(raw) if !raw.is_empty() => substitute_cmdline(&raw),
        _ => sentinel::PROGRAM_ARGS_ERROR.to_string(),
    }
}

/// Flatten a NUL-separated argv into one whitespace-free token.
pub fn substitute_cmdline(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\0").unwrap_or(raw);
    let mut out = String::with_capacity(raw.len() + raw.len() / 4);

    for (i, arg) in raw.split(|b| *b == 0).enumerate() {
        if i > 0 {
            out.push_str(ARG_SEPARATOR);
        }
        for c in String::from_utf8_lossy(arg).chars() {
            match c {
                ' ' | '\t' | '\r' | '\n' => out.push_str(ARG_WHITESPACE_SUBSTITUTE),
                c => out.push(c),
            }
        }
    }

    out
}

/// Start time in clock ticks since boot, from the contents of a
/// `/proc/<pid>/stat` file.
///
/// The comm field runs from the first `(` to the last `)` and may contain
/// spaces or parentheses, so counting resumes after the last `)`.
pub fn parse_start_ticks(stat: &str) -> Option<u64> {
    let close = stat.rfind(')')?;
    // Field 3 (state) is the first token after the comm field.
    stat[close + 1..]
        .split_whitespace()
        .nth(STARTTIME_FIELD - 3)?
        .parse()
        .ok()
}

/// Absolute start time given the current epoch, system uptime and the
/// process's start ticks.
pub fn start_epoch(now: i64, uptime_secs: i64, start_ticks: u64, ticks_per_sec: u64) -> i64 {
    now - uptime_secs + (start_ticks / ticks_per_sec) as i64
}

/// Microseconds between process start and `boot_us` (time since boot).
pub fn elapsed_micros(boot_us: i64, start_ticks: u64, ticks_per_sec: u64) -> i64 {
    let start_us = (start_ticks as i128 * 1_000_000 / ticks_per_sec as i128) as i64;
    boot_us - start_us
}

/// `(start, elapsed)` fields for `pid`, each with its own sentinel.
pub fn start_and_elapsed(pid: i32, now: i64) -> (String, String) {
    let ticks = std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| parse_start_ticks(&stat));

    let (Some(ticks), Some(tck)) = (ticks, clock_ticks_per_sec()) else {
        return (
            sentinel::PROGRAM_START_TIME_ERROR.to_string(),
            sentinel::PROGRAM_ELAPSED_TIME_ERROR.to_string(),
        );
    };

    let start = match uptime_secs() {
        Some(uptime) => {
            let epoch = start_epoch(now, uptime, ticks, tck);
            match format_utc(epoch) {
                Some(utc) => format!("{}{}{}", epoch, START_TIME_SEPARATOR, utc),
                None => sentinel::PROGRAM_START_TIME_ERROR.to_string(),
            }
        }
        None => sentinel::PROGRAM_START_TIME_ERROR.to_string(),
    };

    let elapsed = match clock_gettime(ClockId::CLOCK_BOOTTIME) {
        Ok(ts) => {
            let boot_us = ts.tv_sec() * 1_000_000 + ts.tv_nsec() / 1_000;
            elapsed_micros(boot_us, ticks, tck).to_string()
        }
        Err(_) => sentinel::PROGRAM_ELAPSED_TIME_ERROR.to_string(),
    };

    (start, elapsed)
}

fn clock_ticks_per_sec() -> Option<u64> {
    // SAFETY: sysconf has no preconditions.
    let tck = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    (tck > 0).then_some(tck as u64)
}

fn uptime_secs() -> Option<i64> {
    let mut info = std::mem::MaybeUninit::<libc::sysinfo>::zeroed();
    // SAFETY: sysinfo fills the struct it is handed.
    let rc = unsafe { libc::sysinfo(info.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: initialised by the successful call above.
    Some(unsafe { info.assume_init() }.uptime as i64)
}
