use chrono::{DateTime, NaiveDate, Utc};

/// Formats a date the way GOV.UK pages print them, e.g. "1 January 2025".
pub fn govuk_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

pub fn govuk_timestamp(timestamp: DateTime<Utc>) -> String {
    govuk_date(timestamp.date_naive())
}

pub fn optional_date(date: Option<NaiveDate>) -> String {
    date.map(govuk_date).unwrap_or_else(|| "Not known".to_string())
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
