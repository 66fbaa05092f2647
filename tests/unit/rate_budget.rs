//! Unit tests for the rate budget and window clock

use chrono::NaiveTime;
use strava_archive::downloader::{RateBudget, SharedBudget, WindowClock};

#[test]
fn test_can_proceed_matches_headroom() {
    for (usage, expected) in [("0", true), ("99,9", false), ("99", true), ("100,0", false)] {
        assert_eq!(
            RateBudget::from_usage(Some(usage)).can_proceed(),
            expected,
            "usage {usage}"
        );
    }
}

#[test]
fn test_absent_signal_is_zero() {
    assert_eq!(RateBudget::from_usage(None).remaining(), 0);
}

#[test]
fn test_shared_budget_concurrent_writers() {
    let shared = SharedBudget::new();
    assert!(!shared.is_known());
    let handles: Vec<_> = (0..8u32)
        .map(|n| {
            let shared = shared.clone();
            std::thread::spawn(move || shared.observe(RateBudget::new(10 + n)))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(shared.is_known());
    let last = shared.snapshot().remaining();
    assert!((10..18u32).contains(&last), "{last} was never written");
}

#[test]
fn test_window_clock_mid_window() {
    let clock = WindowClock::default();
    let now = NaiveTime::from_hms_opt(14, 7, 30).unwrap();
    assert_eq!(clock.seconds_until_next_window(&now), 450);
}

#[test]
fn test_window_clock_on_boundary_waits_full_window() {
    let clock = WindowClock::default();
    let now = NaiveTime::from_hms_opt(14, 15, 0).unwrap();
    assert_eq!(clock.seconds_until_next_window(&now), 900);
}

#[test]
fn test_window_clock_just_after_boundary() {
    let clock = WindowClock::default();
    let now = NaiveTime::from_hms_opt(14, 45, 20).unwrap();
    assert_eq!(clock.seconds_until_next_window(&now), 880);
}
