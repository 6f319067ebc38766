// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `clock.rs`

#[cfg(test)]
mod tests {
    use super::super::{Clock, ManualClock};
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration;

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_time() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);

        clock.sleep(Duration::from_secs(5)).await;
        clock.sleep(Duration::from_secs(5)).await;

        assert_eq!(clock.elapsed_since(start), Duration::from_secs(10));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();

        shared.advance(Duration::from_secs(90));

        assert_eq!(clock.now(), start + chrono::TimeDelta::seconds(90));
    }

    #[test]
    fn test_elapsed_since_future_start_saturates() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.set(start - chrono::TimeDelta::seconds(10));

        assert_eq!(clock.elapsed_since(start), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance_clamps_at_max_time() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);

        clock.advance(Duration::MAX);
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }
}
