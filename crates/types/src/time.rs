//! Process-wide monotonic clock.
//!
//! Timestamps are microseconds since the Unix epoch. The clock never emits
//! the same value twice: when the system clock stalls or steps backwards the
//! next stamp is bumped one microsecond past the last one handed out, so
//! stamps remain strictly increasing for the lifetime of the process.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Microsecond timestamp.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimeMicros(pub u64);

static LAST_STAMP: Lazy<Mutex<u64>> = Lazy::new(|| Mutex::new(0));

impl TimeMicros {
    /// Current time, strictly greater than every stamp issued before it.
    pub fn now() -> Self {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;

        let mut last = LAST_STAMP.lock();
        let stamp = if wall > *last { wall } else { *last + 1 };
        *last = stamp;
        Self(stamp)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}
