use chrono::{Local, NaiveDateTime};
use safar_core::ports::Clock;

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
