use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::error::{ChallengeError, Result};
use crate::models::ChallengeWindow;

/// Build the challenge window for a challenge created at `creation` that
/// runs through `target_day`, both read in `tz`.
///
/// The start is pinned to 00:00:00 of the creation day and the end to
/// 23:59:59 of the target day. A target day before the creation day is
/// rejected instead of producing an inverted window.
pub fn window_for<Tz: TimeZone>(
    creation: DateTime<Utc>,
    target_day: NaiveDate,
    tz: &Tz,
) -> Result<ChallengeWindow> {
    let creation_day = creation.with_timezone(tz).date_naive();

    let start_local = local_time(creation_day, 0, 0, 0)?;
    let end_local = local_time(target_day, 23, 59, 59)?;

    let start = tz
        .from_local_datetime(&start_local)
        .earliest()
        .ok_or_else(|| ChallengeError::InvalidWindow(format!("{} does not exist", start_local)))?
        .with_timezone(&Utc);
    let end = tz
        .from_local_datetime(&end_local)
        .latest()
        .ok_or_else(|| ChallengeError::InvalidWindow(format!("{} does not exist", end_local)))?
        .with_timezone(&Utc);

    if end <= start {
        return Err(ChallengeError::InvalidWindow(format!(
            "completion day {} is before creation day {}",
            target_day, creation_day
        )));
    }

    Ok(ChallengeWindow { start, end })
}

/// Calendar day in `tz` of a unix timestamp given in seconds.
pub fn target_day_from_timestamp<Tz: TimeZone>(secs: i64, tz: &Tz) -> Result<NaiveDate> {
    DateTime::from_timestamp(secs, 0)
        .map(|at| at.with_timezone(tz).date_naive())
        .ok_or_else(|| ChallengeError::InvalidWindow(format!("timestamp {} is out of range", secs)))
}

fn local_time(day: NaiveDate, hour: u32, min: u32, sec: u32) -> Result<NaiveDateTime> {
    day.and_hms_opt(hour, min, sec)
        .ok_or_else(|| ChallengeError::InvalidWindow(format!("invalid time on {}", day)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_window_pins_day_boundaries() {
        let creation = utc(2024, 1, 1, 15, 42, 10);
        let target = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();

        let window = window_for(creation, target, &Utc).unwrap();

        assert_eq!(window.start, utc(2024, 1, 1, 0, 0, 0));
        assert_eq!(window.end, utc(2024, 1, 8, 23, 59, 59));
    }

    #[test]
    fn test_window_in_reference_timezone() {
        // 2024-01-02 03:00 UTC is still 2024-01-01 in UTC-08:00
        let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
        let creation = utc(2024, 1, 2, 3, 0, 0);
        let target = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();

        let window = window_for(creation, target, &pacific).unwrap();

        assert_eq!(window.start, utc(2024, 1, 1, 8, 0, 0));
        assert_eq!(window.end, utc(2024, 1, 9, 7, 59, 59));
    }

    #[test]
    fn test_same_day_window_is_valid() {
        let creation = utc(2024, 3, 5, 12, 0, 0);
        let target = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let window = window_for(creation, target, &Utc).unwrap();
        assert!(window.end > window.start);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let creation = utc(2024, 3, 5, 12, 0, 0);
        let target = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let err = window_for(creation, target, &Utc).unwrap_err();
        assert!(matches!(err, ChallengeError::InvalidWindow(_)));
    }

    #[test]
    fn test_target_day_from_timestamp() {
        // 2024-01-08T12:00:00Z
        let day = target_day_from_timestamp(1_704_715_200, &Utc).unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        // 2024-01-08T20:00:00Z is already the 9th in UTC+09:00
        let day = target_day_from_timestamp(1_704_744_000, &tokyo).unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
    }
}
