//! Windows FILETIME conversion.
//!
//! The engine reports dates as FILETIME tick counts: 100-nanosecond
//! intervals since 1601-01-01 00:00:00 UTC.

use chrono::{DateTime, Local, Utc};

/// FILETIME tick count of 1970-01-01 00:00:00 UTC.
pub const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

/// FILETIME ticks per second.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Seconds since the Unix epoch, with sub-second precision.
pub fn filetime_to_unix_seconds(ticks: u64) -> f64 {
    (ticks as i128 - FILETIME_UNIX_EPOCH as i128) as f64 / TICKS_PER_SECOND as f64
}

/// Convert FILETIME ticks to a UTC instant.
///
/// Exact to the tick (100 ns). Returns `None` if the instant is outside the
/// range chrono can represent.
pub fn filetime_to_utc(ticks: u64) -> Option<DateTime<Utc>> {
    let since_epoch = ticks as i128 - FILETIME_UNIX_EPOCH as i128;
    let per_second = TICKS_PER_SECOND as i128;

    let secs = i64::try_from(since_epoch.div_euclid(per_second)).ok()?;
    let nanos = (since_epoch.rem_euclid(per_second) * 100) as u32;

    DateTime::from_timestamp(secs, nanos)
}

/// Convert FILETIME ticks to local calendar time.
pub fn filetime_to_local(ticks: u64) -> Option<DateTime<Local>> {
    filetime_to_utc(ticks).map(|utc| utc.with_timezone(&Local))
}

/// Convert a UTC instant to FILETIME ticks.
///
/// Returns `None` for instants before 1601-01-01.
pub fn utc_to_filetime(time: &DateTime<Utc>) -> Option<u64> {
    let ticks = time.timestamp() as i128 * TICKS_PER_SECOND as i128
        + (time.timestamp_subsec_nanos() / 100) as i128
        + FILETIME_UNIX_EPOCH as i128;
    u64::try_from(ticks).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unix_epoch() {
        let utc = filetime_to_utc(FILETIME_UNIX_EPOCH).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(filetime_to_unix_seconds(FILETIME_UNIX_EPOCH), 0.0);
    }

    #[test]
    fn test_local_is_same_instant() {
        let local = filetime_to_local(FILETIME_UNIX_EPOCH).unwrap();
        assert_eq!(local.timestamp(), 0);
        assert_eq!(local.with_timezone(&Utc).to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_sub_second_precision() {
        // 1.5 seconds after the epoch
        let ticks = FILETIME_UNIX_EPOCH + 15_000_000;
        let utc = filetime_to_utc(ticks).unwrap();
        assert_eq!(utc.timestamp(), 1);
        assert_eq!(utc.timestamp_subsec_millis(), 500);
        assert_eq!(filetime_to_unix_seconds(ticks), 1.5);
    }

    #[test]
    fn test_before_unix_epoch() {
        // 0.25 seconds before the epoch
        let ticks = FILETIME_UNIX_EPOCH - 2_500_000;
        let utc = filetime_to_utc(ticks).unwrap();
        assert_eq!(utc.timestamp(), -1);
        assert_eq!(utc.timestamp_subsec_millis(), 750);
        assert_eq!(filetime_to_unix_seconds(ticks), -0.25);
    }

    #[test]
    fn test_filetime_origin() {
        let utc = filetime_to_utc(0).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_known_date() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap();
        let ticks = utc_to_filetime(&expected).unwrap();
        assert_eq!(ticks, FILETIME_UNIX_EPOCH + 1_705_329_000 * TICKS_PER_SECOND);
        assert_eq!(filetime_to_utc(ticks).unwrap(), expected);
    }

    #[test]
    fn test_before_1601_is_not_representable() {
        let early = Utc.with_ymd_and_hms(1600, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(utc_to_filetime(&early), None);
    }
}
