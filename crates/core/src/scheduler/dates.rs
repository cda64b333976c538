//! Ward calendar rules.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Saturday and Sunday never hold admission slots.
pub(crate) fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Manual registration and reschedule also reject Fridays; the overflow
/// scan does not.
pub(crate) fn is_weekend_or_friday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Fri || is_weekend(date)
}

/// Advance a scan cursor past Saturday and Sunday.
pub(crate) fn skip_weekend(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date + Duration::days(2),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}
