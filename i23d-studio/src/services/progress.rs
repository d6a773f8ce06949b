//! Elapsed-time progress estimation
//!
//! The remote generation service reports no intermediate progress, so the
//! displayed percentage is synthesized from wall-clock time: linear from 0
//! to 90% across the expected four-minute window, then held at 95% until
//! the poller observes the actual outcome. The estimate must never be
//! mistaken for a completion signal; only the poller decides success.

use std::time::Duration;

/// Window over which the estimate climbs linearly
pub const ESTIMATE_WINDOW: Duration = Duration::from_secs(240);
/// Fraction of the bar reached at the end of the estimate window
pub const ESTIMATE_TARGET: f64 = 0.90;
/// Percentage held while finalizing (past the window, outcome unknown)
pub const FINALIZING_PERCENT: u8 = 95;
/// Percentage on observed success
pub const DONE_PERCENT: u8 = 100;

/// Estimated display percentage for an elapsed time inside the window
///
/// `floor(min(elapsed/window, 1) * 0.90 * 100)`, so the bar reaches 90 at
/// the window boundary and no sooner.
pub fn estimate_percent(elapsed: Duration) -> u8 {
    let ratio = (elapsed.as_secs_f64() / ESTIMATE_WINDOW.as_secs_f64()).min(1.0);
    (ratio * ESTIMATE_TARGET * 100.0).floor() as u8
}

/// Progress message while the estimate is climbing
pub fn estimating_message(elapsed: Duration) -> String {
    format!(
        "Generating 3D model... (~4 min expected, {}s elapsed)",
        elapsed.as_secs()
    )
}

/// Progress message while holding at the finalizing percentage
pub fn finalizing_message() -> String {
    "Finalizing... (checking every 5s)".to_string()
}

/// Progress message on observed success
pub fn done_message() -> String {
    "Done! Loading model...".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_starts_at_zero() {
        assert_eq!(estimate_percent(Duration::ZERO), 0);
        assert_eq!(estimate_percent(Duration::from_secs(1)), 0);
    }

    #[test]
    fn test_estimate_midpoint() {
        // 120/240 * 0.90 * 100 = 45
        assert_eq!(estimate_percent(Duration::from_secs(120)), 45);
        // 80/240 * 0.90 * 100 = 30
        assert_eq!(estimate_percent(Duration::from_secs(80)), 30);
    }

    #[test]
    fn test_estimate_floors() {
        // 239/240 * 0.90 * 100 = 89.625
        assert_eq!(estimate_percent(Duration::from_secs(239)), 89);
        // 100/240 * 0.90 * 100 = 37.5
        assert_eq!(estimate_percent(Duration::from_secs(100)), 37);
    }

    #[test]
    fn test_estimate_caps_at_target() {
        assert_eq!(estimate_percent(Duration::from_secs(240)), 90);
        assert_eq!(estimate_percent(Duration::from_secs(10_000)), 90);
    }

    #[test]
    fn test_estimate_monotonic_within_window() {
        let mut last = 0;
        for t in 0..240 {
            let pct = estimate_percent(Duration::from_secs(t));
            assert!(pct >= last, "estimate regressed at t={}", t);
            assert!(pct <= 90);
            last = pct;
        }
    }

    #[test]
    fn test_held_and_done_percent_ordering() {
        // The held value sits strictly between the window cap and done.
        assert!(FINALIZING_PERCENT > estimate_percent(Duration::from_secs(240)));
        assert!(DONE_PERCENT > FINALIZING_PERCENT);
    }
}
