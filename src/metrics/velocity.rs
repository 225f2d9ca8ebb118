use chrono::{Datelike, NaiveDate};

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month())
}

/// Calendar months between `earliest` and `latest`, never less than one.
///
/// Only the year and month of each date count: Jan 1 to Jan 31 is one month,
/// and Jan 31 to Feb 1 is also one month. Callers pass `earliest <= latest`;
/// a reversed pair is clamped to one rather than producing a negative span.
pub fn months_spanned(earliest: NaiveDate, latest: NaiveDate) -> u32 {
    debug_assert!(earliest <= latest, "months_spanned called out of order");
    let diff = month_index(latest) - month_index(earliest);
    u32::try_from(diff).unwrap_or(0).max(1)
}
