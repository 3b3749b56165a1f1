//! # vdi-context
//!
//! Point-in-time process and host metadata stamped onto every audit record.
//!
//! A snapshot never fails as a whole. Each field is queried independently
//! and replaced by its own sentinel (see [`sentinel`]) when the underlying
//! OS query fails, so a broken resolver or an unreadable `/proc` entry only
//! blanks the field it feeds.
//!
//! Nothing is cached: [`ProcessContext::snapshot`] re-queries everything.

pub mod host;
pub mod proc;
pub mod time;

use std::fmt;

pub use host::{HostInfo, IpEntry};
pub use time::Timestamp;

/// Per-field fallback markers written in place of data that could not be
/// collected.
pub mod sentinel {
    pub const UTC_ERROR: &str = "UTC_ERROR";
    pub const READLINK_ERROR: &str = "READLINK_ERROR";
    pub const PROGRAM_ARGS_ERROR: &str = "PROGRAM_ARGS_ERROR";
    pub const GETCWD_ERROR: &str = "GETCWD_ERROR";
    pub const USERNAME_ERROR: &str = "USERNAME_ERROR";
    pub const USERHOME_ERROR: &str = "USERHOME_ERROR";
    pub const HOSTNAME_ERROR: &str = "HOSTNAME_ERROR";
    pub const FQHN_ERROR: &str = "FQHN_ERROR";
    pub const FQHN_NOT_RESOLVED_ERROR: &str = "FQHN_NOT_RESOLVED_ERROR";
    pub const IP_ADDRESS_ERROR: &str = "IP_ADDRESS_ERROR";
    pub const PROGRAM_START_TIME_ERROR: &str = "PROGRAM_START_TIME_ERROR";
    pub const PROGRAM_ELAPSED_TIME_ERROR: &str = "PROGRAM_ELAPSED_TIME_ERROR";
}

/// Owner of the calling process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub home: String,
}

impl UserInfo {
    /// Look up the real uid in the password database.
    pub fn current() -> Self {
        let uid = nix::unistd::getuid();
        match nix::unistd::User::from_uid(uid) {
            Ok(Some(user)) => Self {
                name: user.name,
                home: user.dir.to_string_lossy().into_owned(),
            },
            Ok(None) | Err(_) => {
                tracing::trace!(component = "CONTEXT", uid = uid.as_raw(), "no passwd entry");
                Self {
                    name: sentinel::USERNAME_ERROR.to_string(),
                    home: sentinel::USERHOME_ERROR.to_string(),
                }
            }
        }
    }
}

/// `pid ppid pgid`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIds {
    pub pid: i32,
    pub ppid: i32,
    pub pgid: i32,
}

impl ProcessIds {
    pub fn current() -> Self {
        Self {
            pid: nix::unistd::getpid().as_raw(),
            ppid: nix::unistd::getppid().as_raw(),
            pgid: nix::unistd::getpgrp().as_raw(),
        }
    }
}

impl fmt::Display for ProcessIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.pid, self.ppid, self.pgid)
    }
}

/// Everything a full audit record carries besides the call itself.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    pub timestamp: Timestamp,
    pub host: HostInfo,
    pub user: UserInfo,
    pub ids: ProcessIds,
    pub cwd: String,
    pub exe: String,
    /// argv with `%%` between arguments and `##` for embedded whitespace
    pub args: String,
    /// `start-epoch%%start-UTC`
    pub start: String,
    /// Microseconds since the process started
    pub elapsed: String,
}

impl ProcessContext {
    /// Collect a fresh snapshot for the calling process.
    pub fn snapshot() -> Self {
        let ids = ProcessIds::current();
        let timestamp = Timestamp::now();
        let (start, elapsed) = proc::start_and_elapsed(ids.pid, timestamp.epoch);

        Self {
            timestamp,
            host: HostInfo::collect(),
            user: UserInfo::current(),
            cwd: current_dir(),
            exe: proc::exe_path(ids.pid),
            args: proc::cmdline(ids.pid),
            start,
            elapsed,
            ids,
        }
    }
}

fn current_dir() -> String {
    match nix::unistd::getcwd() {
        Ok(cwd) => cwd.to_string_lossy().into_owned(),
        Err(_) => sentinel::GETCWD_ERROR.to_string(),
    }
}
