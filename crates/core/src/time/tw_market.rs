use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

const TST_OFFSET_SECS: i32 = 8 * 3600;

/// Calendar date in Taiwan (UTC+8, no DST) at `now_utc`.
pub fn local_date(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let tst = chrono::FixedOffset::east_opt(TST_OFFSET_SECS).context("invalid TST offset")?;
    Ok(now_utc.with_timezone(&tst).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rolls_forward_after_utc_1600() {
        // 2026-01-05 16:30 UTC = 2026-01-06 00:30 TST
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 16, 30, 0).unwrap();
        assert_eq!(
            local_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap()
        );
    }

    #[test]
    fn same_day_during_utc_morning() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 1, 0, 0).unwrap();
        assert_eq!(
            local_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
    }
}
