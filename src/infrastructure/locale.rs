// Fixed regional formatting: en-IN conventions in India Standard Time
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is within ±24h")
}

pub fn to_local(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&local_offset())
}

/// Interpret a wall-clock timestamp without zone as local time.
pub fn from_local_naive(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    local_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Time-of-day label, 24-hour clock: `14:05`
pub fn format_time_of_day(instant: DateTime<Utc>) -> String {
    to_local(instant).format("%H:%M").to_string()
}

/// Day/month/year without zero padding: `15/7/2025`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%-d/%-m/%Y").to_string()
}

/// Date and 24-hour time: `15/7/2025, 14:05:09`
pub fn format_date_time(instant: DateTime<Utc>) -> String {
    to_local(instant).format("%-d/%-m/%Y, %H:%M:%S").to_string()
}
