use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;

/// Market holidays for the current and following calendar year. Operator-maintained and
/// refreshed annually; not sourced from an external calendar API (see DESIGN.md).
const HOLIDAYS: &[(i32, u32, u32)] = &[
    // 2026
    (2026, 1, 1),
    (2026, 1, 2),
    (2026, 2, 16),
    (2026, 2, 17),
    (2026, 2, 18),
    (2026, 2, 19),
    (2026, 2, 20),
    (2026, 4, 6),
    (2026, 5, 1),
    (2026, 5, 4),
    (2026, 5, 5),
    (2026, 6, 19),
    (2026, 9, 25),
    (2026, 10, 1),
    (2026, 10, 2),
    (2026, 10, 5),
    (2026, 10, 6),
    (2026, 10, 7),
    (2026, 10, 8),
    // 2027
    (2027, 1, 1),
    (2027, 2, 8),
    (2027, 2, 9),
    (2027, 2, 10),
    (2027, 2, 11),
    (2027, 2, 12),
    (2027, 4, 5),
    (2027, 5, 1),
    (2027, 5, 3),
    (2027, 6, 9),
    (2027, 9, 15),
    (2027, 10, 1),
    (2027, 10, 4),
    (2027, 10, 5),
    (2027, 10, 6),
    (2027, 10, 7),
];

pub fn weekday_name_zh(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "周一",
        Weekday::Tue => "周二",
        Weekday::Wed => "周三",
        Weekday::Thu => "周四",
        Weekday::Fri => "周五",
        Weekday::Sat => "周六",
        Weekday::Sun => "周日",
    }
}

pub fn is_trading_day(date: NaiveDate) -> bool {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    !HOLIDAYS
        .iter()
        .any(|&(y, m, d)| date.year() == y && date.month() == m && date.day() == d)
}

pub fn now_shanghai() -> chrono::DateTime<Tz> {
    chrono::Utc::now().with_timezone(&Shanghai)
}

/// A-share continuous auction sessions: 09:30-11:30 and 13:00-15:00 Asia/Shanghai.
pub fn is_within_trading_hours(local_time: NaiveTime) -> bool {
    let morning_open = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
    let morning_close = NaiveTime::from_hms_opt(11, 30, 0).unwrap();
    let afternoon_open = NaiveTime::from_hms_opt(13, 0, 0).unwrap();
    let afternoon_close = NaiveTime::from_hms_opt(15, 0, 0).unwrap();
    (local_time >= morning_open && local_time <= morning_close)
        || (local_time >= afternoon_open && local_time <= afternoon_close)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekend_is_not_a_trading_day() {
        // 2026-01-03 is a Saturday.
        assert!(!is_trading_day(date(2026, 1, 3)));
    }

    #[test]
    fn holiday_is_not_a_trading_day() {
        assert!(!is_trading_day(date(2026, 1, 1)));
    }

    #[test]
    fn ordinary_weekday_is_a_trading_day() {
        // 2026-01-05 is a Monday, not in the holiday table.
        assert!(is_trading_day(date(2026, 1, 5)));
    }

    #[test]
    fn midday_break_is_outside_trading_hours() {
        let noon = NaiveTime::from_hms_opt(12, 15, 0).unwrap();
        assert!(!is_within_trading_hours(noon));
    }

    #[test]
    fn morning_session_is_within_trading_hours() {
        let ten_am = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(is_within_trading_hours(ten_am));
    }
}
