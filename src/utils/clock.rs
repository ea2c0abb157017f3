// src/utils/clock.rs

use chrono::{DateTime, Utc};

/// Injectable time source for the attempt engine.
///
/// Every elapsed/remaining/deadline computation goes through this trait
/// instead of calling `Utc::now()` inline, so timeout behavior can be
/// tested with a pinned clock and no real sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
