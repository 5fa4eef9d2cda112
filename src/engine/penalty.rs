use chrono::{DateTime, Duration, Utc};

/// Whether a rejection at `decision_time` counts against the courier.
///
/// Without a preparation start there is no grace window and the penalty applies.
/// Otherwise only rejections strictly before `start + grace` are penalized.
pub fn penalty_applies(
    preparation_start_time: Option<DateTime<Utc>>,
    decision_time: DateTime<Utc>,
    grace_period_minutes: u32,
) -> bool {
    match preparation_start_time {
        None => true,
        Some(started) => {
            let grace_end = started + Duration::minutes(i64::from(grace_period_minutes));
            decision_time < grace_end
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::penalty_applies;

    #[test]
    fn missing_preparation_start_always_penalizes() {
        assert!(penalty_applies(None, Utc::now(), 10));
    }

    #[test]
    fn rejection_inside_grace_window_is_penalized() {
        let started = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        assert!(penalty_applies(Some(started), started, 10));
        assert!(penalty_applies(
            Some(started),
            started + Duration::minutes(10) - Duration::seconds(1),
            10
        ));
    }

    #[test]
    fn rejection_at_or_after_boundary_is_not_penalized() {
        let started = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        assert!(!penalty_applies(
            Some(started),
            started + Duration::minutes(10),
            10
        ));
        assert!(!penalty_applies(
            Some(started),
            started + Duration::minutes(25),
            10
        ));
    }

    #[test]
    fn zero_grace_period_never_penalizes_once_preparation_started() {
        let started = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        assert!(!penalty_applies(Some(started), started, 0));
        assert!(penalty_applies(
            Some(started),
            started - Duration::seconds(1),
            0
        ));
    }
}
