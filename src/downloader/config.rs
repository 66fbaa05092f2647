//! Download configuration constants

/// Length of the server's rate-limit window in minutes.
/// Windows are aligned to wall-clock multiples of this value (:00, :15, :30, :45).
pub const DEFAULT_WINDOW_MINUTES: u32 = 15;

/// Response header carrying the percentage of the read quota already used.
pub const USAGE_HEADER: &str = "x-readratelimit-usage";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.strava.com/api/v3";

/// Cheap authenticated resource used to refresh the usage signal.
pub const DEFAULT_PROBE_PATH: &str = "/athlete";

/// HTTP connect timeout (seconds) - time to establish TCP connection
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout (seconds) - overall time for the entire request
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Coordinator settings for one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Rate-limit window length in minutes; must divide 60
    pub window_minutes: u32,
    /// Maximum number of window waits before giving up; `None` waits forever
    pub max_window_cycles: Option<u32>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            window_minutes: DEFAULT_WINDOW_MINUTES,
            max_window_cycles: None,
        }
    }
}

impl BatchConfig {
    /// Set the window length
    pub fn with_window_minutes(mut self, minutes: u32) -> Self {
        self.window_minutes = minutes;
        self
    }

    /// Cap the number of window waits
    pub fn with_max_window_cycles(mut self, cycles: Option<u32>) -> Self {
        self.max_window_cycles = cycles;
        self
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), String> {
        validate_window_minutes(self.window_minutes)
    }
}

/// Check that windows of `minutes` tile the hour
///
/// Boundaries sit on minute-of-hour multiples of the window length, so only
/// divisors of 60 (1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30, 60) are accepted.
pub fn validate_window_minutes(minutes: u32) -> Result<(), String> {
    if minutes == 0 || 60 % minutes != 0 {
        return Err(format!(
            "window length must divide 60 minutes (1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30 or 60), got {minutes}"
        ));
    }
    Ok(())
}
