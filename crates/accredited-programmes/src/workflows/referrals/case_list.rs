//! Filtering, sorting and paging of referral summaries for the refer and assess case lists.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::de::value::{self, StrDeserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{ReferralId, ReferralSummary};
use super::status::ReferralStatus;
use crate::format::optional_date;
use crate::paths::{with_query, PathError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusGroup {
    Open,
    Closed,
    Draft,
}

impl StatusGroup {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Draft => "draft",
        }
    }

    pub fn contains(self, status: ReferralStatus) -> bool {
        match self {
            Self::Open => status.is_open(),
            Self::Closed => status.is_terminal(),
            Self::Draft => status.is_draft(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    PersonName,
    SubmittedOn,
    Status,
    EarliestReleaseDate,
}

impl SortColumn {
    pub const fn code(self) -> &'static str {
        match self {
            Self::PersonName => "personName",
            Self::SubmittedOn => "submittedOn",
            Self::Status => "status",
            Self::EarliestReleaseDate => "earliestReleaseDate",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Query string accepted by both case lists.
///
/// Values that do not parse are ignored rather than rejecting the request, so a
/// hand-edited URL still renders the list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseListQuery {
    #[serde(default, deserialize_with = "lenient_code")]
    pub status_group: Option<StatusGroup>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub name_or_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_code")]
    pub sort_column: Option<SortColumn>,
    #[serde(default, deserialize_with = "lenient_code")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<usize>,
}

fn lenient_code<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        let code: StrDeserializer<'_, value::Error> = raw.trim().into_deserializer();
        T::deserialize(code).ok()
    }))
}

fn lenient_page<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|page| *page > 0))
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl CaseListQuery {
    /// Path for this query on `base`, replacing the page number.
    pub fn path(&self, base: &str, page: Option<usize>) -> String {
        with_query(
            base,
            [
                ("statusGroup", self.status_group.map(|g| g.code().to_string())),
                ("status", trimmed(&self.status).map(str::to_string)),
                ("audience", trimmed(&self.audience).map(str::to_string)),
                ("nameOrId", trimmed(&self.name_or_id).map(str::to_string)),
                ("sortColumn", self.sort_column.map(|c| c.code().to_string())),
                (
                    "sortDirection",
                    self.sort_direction.map(|d| d.code().to_string()),
                ),
                ("page", page.filter(|page| *page > 1).map(|page| page.to_string())),
            ],
        )
    }

    fn matches(&self, summary: &ReferralSummary) -> bool {
        if let Some(group) = self.status_group {
            if !group.contains(summary.status) {
                return false;
            }
        }

        if let Some(status) = trimmed(&self.status) {
            if ReferralStatus::from_code(status) != Some(summary.status) {
                return false;
            }
        }

        if let Some(audience) = trimmed(&self.audience) {
            if !summary.audience.eq_ignore_ascii_case(audience) {
                return false;
            }
        }

        if let Some(needle) = trimmed(&self.name_or_id) {
            let needle = needle.to_lowercase();
            let name_matches = summary.person_name.to_lowercase().contains(&needle);
            let id_matches = summary.prison_number.to_lowercase().contains(&needle);
            if !name_matches && !id_matches {
                return false;
            }
        }

        true
    }
}

fn compare_dates(a: Option<NaiveDate>, b: Option<NaiveDate>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort(rows: &mut [ReferralSummary], column: SortColumn, direction: SortDirection) {
    rows.sort_by(|a, b| match column {
        SortColumn::PersonName => direction.apply(
            a.person_name
                .to_lowercase()
                .cmp(&b.person_name.to_lowercase()),
        ),
        SortColumn::Status => direction.apply(a.status.label().cmp(b.status.label())),
        SortColumn::SubmittedOn => compare_dates(a.submitted_on, b.submitted_on, direction),
        SortColumn::EarliestReleaseDate => {
            compare_dates(a.earliest_release_date, b.earliest_release_date, direction)
        }
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseListRow {
    pub id: ReferralId,
    pub href: String,
    pub person_name: String,
    pub prison_number: String,
    pub course_name: String,
    pub audience: String,
    pub status: ReferralStatus,
    pub status_label: &'static str,
    pub status_colour: &'static str,
    pub submitted_on: String,
    pub earliest_release_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageItem {
    Number {
        number: usize,
        href: String,
        current: bool,
    },
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    pub items: Vec<PageItem>,
}

/// Page numbers to show: first, last and the neighbours of `current`, with gaps elided.
pub fn page_numbers(current: usize, total_pages: usize) -> Vec<Option<usize>> {
    let shown: Vec<usize> = (1..=total_pages)
        .filter(|page| *page == 1 || *page == total_pages || page.abs_diff(current) <= 1)
        .collect();

    let mut numbers = Vec::with_capacity(shown.len() + 2);
    let mut previous: Option<usize> = None;
    for page in shown {
        match previous {
            Some(last) if page - last == 2 => numbers.push(Some(last + 1)),
            Some(last) if page - last > 2 => numbers.push(None),
            _ => {}
        }
        numbers.push(Some(page));
        previous = Some(page);
    }
    numbers
}

fn paginate(query: &CaseListQuery, base: &str, total_items: usize, page_size: usize) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = total_items.div_ceil(page_size);
    let page = query.page.unwrap_or(1).clamp(1, total_pages.max(1));

    let items = page_numbers(page, total_pages)
        .into_iter()
        .map(|number| match number {
            Some(number) => PageItem::Number {
                number,
                href: query.path(base, Some(number)),
                current: number == page,
            },
            None => PageItem::Ellipsis,
        })
        .collect();

    Pagination {
        page,
        total_pages,
        total_items,
        previous: (page > 1).then(|| query.path(base, Some(page - 1))),
        next: (page < total_pages).then(|| query.path(base, Some(page + 1))),
        items,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseList {
    pub rows: Vec<CaseListRow>,
    pub pagination: Pagination,
    pub query: CaseListQuery,
    /// Path of this exact view, kept in the session for back links.
    pub current_path: String,
}

impl CaseList {
    pub fn build<F>(
        summaries: Vec<ReferralSummary>,
        query: CaseListQuery,
        base: &str,
        page_size: usize,
        row_href: F,
    ) -> Result<Self, PathError>
    where
        F: Fn(&ReferralSummary) -> Result<String, PathError>,
    {
        let mut matching: Vec<ReferralSummary> = summaries
            .into_iter()
            .filter(|summary| query.matches(summary))
            .collect();

        if let Some(column) = query.sort_column {
            sort(&mut matching, column, query.sort_direction.unwrap_or_default());
        }

        let pagination = paginate(&query, base, matching.len(), page_size);
        let page_size = page_size.max(1);

        let rows = matching
            .iter()
            .skip((pagination.page - 1) * page_size)
            .take(page_size)
            .map(|summary| {
                Ok(CaseListRow {
                    id: summary.id,
                    href: row_href(summary)?,
                    person_name: summary.person_name.clone(),
                    prison_number: summary.prison_number.clone(),
                    course_name: summary.course_name.clone(),
                    audience: summary.audience.clone(),
                    status: summary.status,
                    status_label: summary.status.label(),
                    status_colour: summary.status.colour(),
                    submitted_on: optional_date(summary.submitted_on),
                    earliest_release_date: optional_date(summary.earliest_release_date),
                })
            })
            .collect::<Result<Vec<_>, PathError>>()?;

        let current_path = query.path(base, Some(pagination.page));

        Ok(Self {
            rows,
            pagination,
            query,
            current_path,
        })
    }
}
