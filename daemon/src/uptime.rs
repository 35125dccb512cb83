//! Host uptime derived from boot time

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uptime {
    pub seconds: u64,
}

impl Uptime {
    pub fn from_boot_time(boot_time: u64) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::between(boot_time, now)
    }

    pub fn between(boot_time: u64, now: u64) -> Self {
        Self {
            seconds: now.saturating_sub(boot_time),
        }
    }
}

/// Renders as `<H>h <M>m <S>s`; hours are not rolled into days.
impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        write!(f, "{}h {}m {}s", hours, minutes, seconds)
    }
}
