//! Wall-clock aligned rate-limit windows
//!
//! The server resets its counter on fixed boundaries of the hour (every
//! 15 minutes by default), not relative to when a session started.

use chrono::{Local, Timelike};
use std::time::Duration;

use super::config::DEFAULT_WINDOW_MINUTES;

/// Source of the wait before the next rate-limit window opens
///
/// The coordinator asks this each time it has to wait, so the current time is
/// sampled at the moment of the wait rather than at the start of the run.
pub trait WindowSchedule: Send + Sync {
    /// Time to sleep until the next window boundary
    fn until_next_window(&self) -> Duration;
}

/// Windows aligned to minute-of-hour multiples of `window_minutes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowClock {
    window_minutes: u32,
}

impl Default for WindowClock {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MINUTES)
    }
}

impl WindowClock {
    /// Create a clock for windows of `window_minutes` (clamped to 1-60)
    ///
    /// Boundaries only line up with the hour when the length divides 60;
    /// [`validate_window_minutes`](super::config::validate_window_minutes)
    /// checks that.
    pub fn new(window_minutes: u32) -> Self {
        Self {
            window_minutes: window_minutes.clamp(1, 60),
        }
    }

    /// Window length in minutes
    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    /// Seconds from `now` until the next window boundary
    ///
    /// Never zero: when `now` sits exactly on a boundary the wait covers the
    /// whole next window instead of scheduling an immediate wake-up.
    ///
    /// ```
    /// use chrono::NaiveTime;
    /// use strava_archive::downloader::window::WindowClock;
    ///
    /// let clock = WindowClock::new(15);
    /// let now = NaiveTime::from_hms_opt(14, 7, 30).unwrap();
    /// assert_eq!(clock.seconds_until_next_window(&now), 450);
    /// ```
    pub fn seconds_until_next_window<T: Timelike>(&self, now: &T) -> u64 {
        let window = i64::from(self.window_minutes);
        let minute = i64::from(now.minute());
        let second = i64::from(now.second());

        let wait_minutes = (window - minute % window) % window;
        let mut wait_seconds = wait_minutes * 60 - second;
        if wait_seconds <= 0 {
            wait_seconds += window * 60;
        }
        wait_seconds as u64
    }
}

impl WindowSchedule for WindowClock {
    fn until_next_window(&self) -> Duration {
        Duration::from_secs(self.seconds_until_next_window(&Local::now()))
    }
}
