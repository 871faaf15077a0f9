use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Calendar date of an instant as seen in the configured timezone.
pub fn local_date(at: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// `YYYYMMDD`, used inside document IDs.
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Long form used on printed documents, e.g. `19 October 2026`.
pub fn long_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}
