//! Rate budget derived from the server's usage signal
//!
//! The budget is never counted down locally. Every response carries the
//! percentage of the window's quota already used, and the remaining headroom
//! is recomputed from that value alone, so local bookkeeping cannot drift.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Requests remaining in the current window
///
/// A pure function of the latest usage signal. An absent or unparseable
/// signal yields zero: no budget until the server says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateBudget {
    remaining: u32,
}

impl RateBudget {
    /// A budget with exactly `remaining` requests
    pub fn new(remaining: u32) -> Self {
        Self { remaining }
    }

    /// Compute the budget from a raw usage header value such as `"42,5"`
    ///
    /// `remaining = floor(100 - usage)`, floored at zero.
    pub fn from_usage(signal: Option<&str>) -> Self {
        let remaining = signal
            .and_then(parse_usage)
            .map(|usage| {
                let headroom = (Decimal::ONE_HUNDRED - usage).floor();
                if headroom.is_sign_negative() {
                    0
                } else {
                    headroom.to_u32().unwrap_or(u32::MAX)
                }
            })
            .unwrap_or(0);
        Self { remaining }
    }

    /// Whether at least one more request fits in the window
    pub fn can_proceed(&self) -> bool {
        self.remaining > 0
    }

    /// Number of requests left in the window
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Parse a usage percentage written with either `,` or `.` as decimal separator
pub fn parse_usage(raw: &str) -> Option<Decimal> {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    match Decimal::from_str(&normalized) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(raw = raw, error = %e, "Unparseable rate limit usage signal");
            None
        }
    }
}

const UNKNOWN: u64 = u64::MAX;

/// Session-wide budget shared by concurrently running units
///
/// One atomic value, overwritten by whichever response lands last. The
/// intermediate values during a chunk are not relied upon; the coordinator
/// re-probes before every decision that follows a window wait.
#[derive(Debug, Clone)]
pub struct SharedBudget {
    value: Arc<AtomicU64>,
}

impl Default for SharedBudget {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedBudget {
    /// A budget that has not observed any signal yet
    pub fn new() -> Self {
        Self {
            value: Arc::new(AtomicU64::new(UNKNOWN)),
        }
    }

    /// Overwrite the budget with a freshly computed value
    pub fn observe(&self, budget: RateBudget) {
        debug!(remaining = budget.remaining(), "Rate budget updated");
        self.value.store(u64::from(budget.remaining()), Ordering::SeqCst);
    }

    /// Overwrite the budget from a raw usage signal
    pub fn observe_usage(&self, signal: Option<&str>) -> RateBudget {
        let budget = RateBudget::from_usage(signal);
        self.observe(budget);
        budget
    }

    /// Current budget; zero when nothing has been observed
    pub fn snapshot(&self) -> RateBudget {
        match self.value.load(Ordering::SeqCst) {
            UNKNOWN => RateBudget::default(),
            value => RateBudget::new(value as u32),
        }
    }

    /// Whether any response has reported a usage signal in this session
    pub fn is_known(&self) -> bool {
        self.value.load(Ordering::SeqCst) != UNKNOWN
    }
}
