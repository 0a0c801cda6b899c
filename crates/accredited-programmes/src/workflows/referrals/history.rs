use serde::Serialize;

use super::domain::ReferralStatusHistoryEntry;
use super::status::ReferralStatus;
use crate::format::govuk_timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub status: ReferralStatus,
    pub status_label: &'static str,
    pub status_colour: &'static str,
    pub username: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status_label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Status history, newest first.
pub fn timeline(mut entries: Vec<ReferralStatusHistoryEntry>) -> Vec<TimelineEntry> {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries
        .into_iter()
        .map(|entry| TimelineEntry {
            status: entry.status,
            status_label: entry.status.label(),
            status_colour: entry.status.colour(),
            username: entry.username,
            date: govuk_timestamp(entry.created_at),
            previous_status_label: entry.previous_status.map(ReferralStatus::label),
            category: entry.category_description,
            reason: entry.reason_description,
            notes: entry.notes.filter(|notes| !notes.trim().is_empty()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(status: ReferralStatus, day: u32) -> ReferralStatusHistoryEntry {
        ReferralStatusHistoryEntry {
            status,
            previous_status: None,
            username: "REFERRER_USER".to_string(),
            created_at: Utc
                .with_ymd_and_hms(2025, 1, day, 9, 30, 0)
                .single()
                .expect("valid timestamp"),
            category_description: None,
            reason_description: None,
            notes: None,
        }
    }

    #[test]
    fn newest_entry_first_with_formatted_dates() {
        let mut withdrawn = entry(ReferralStatus::Withdrawn, 20);
        withdrawn.previous_status = Some(ReferralStatus::ReferralSubmitted);
        withdrawn.category_description = Some("Administrative error".to_string());
        withdrawn.notes = Some("  ".to_string());

        let entries = timeline(vec![
            entry(ReferralStatus::ReferralStarted, 1),
            withdrawn,
            entry(ReferralStatus::ReferralSubmitted, 2),
        ]);

        assert_eq!(entries[0].status, ReferralStatus::Withdrawn);
        assert_eq!(entries[0].date, "20 January 2025");
        assert_eq!(entries[0].status_colour, "red");
        assert_eq!(entries[0].previous_status_label, Some("Referral submitted"));
        assert_eq!(entries[0].notes, None);
        assert_eq!(entries[2].status_label, "Draft");
        assert_eq!(entries[2].date, "1 January 2025");
    }
}
