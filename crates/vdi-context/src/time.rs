use crate::sentinel;
use chrono::{DateTime, Utc};
use std::fmt;

/// `strftime` layout used for every UTC rendering in a record.
pub const UTC_FORMAT: &str = "%Y-%m-%d+%H:%M:%S+UTC";

/// Wall-clock instant rendered as `epoch::UTC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub epoch: i64,
    pub utc: String,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::at(Utc::now().timestamp())
    }

    pub fn at(epoch: i64) -> Self {
        Self {
            epoch,
            utc: format_utc(epoch).unwrap_or_else(|| sentinel::UTC_ERROR.to_string()),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.epoch, self.utc)
    }
}

/// Render seconds since the epoch, `None` when out of chrono's range.
pub fn format_utc(epoch: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(epoch, 0).map(|t| t.format(UTC_FORMAT).to_string())
}
