//! Time source
//!
//! Expiry checks and cache TTLs read the current time through [`Clock`] so that
//! boundary behaviour can be exercised with a fixed clock in tests.

use std::time::{SystemTime, UNIX_EPOCH};

/// Clock for current time in whole seconds since the Unix epoch
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_secs(&self) -> u64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        // A clock before the epoch reads as 0, which expires every token
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
