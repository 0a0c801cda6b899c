use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pni::ProgrammePathway;
use super::status::ReferralStatus;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a referral held by the referrals API.
    ReferralId
);
uuid_id!(CourseId);
uuid_id!(OfferingId);
uuid_id!(ParticipationId);

/// A request to enrol one person on one course offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: ReferralId,
    pub prison_number: String,
    pub offering_id: OfferingId,
    pub status: ReferralStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub additional_information: Option<String>,
    #[serde(default)]
    pub oasys_confirmed: bool,
    #[serde(default)]
    pub has_reviewed_programme_history: bool,
    #[serde(default)]
    pub has_ldc: Option<bool>,
    #[serde(default)]
    pub has_ldc_been_overridden_by_programme_team: bool,
    /// Set at creation when the PNI does not recommend the chosen course.
    #[serde(default)]
    pub is_override: bool,
    #[serde(default)]
    pub referrer_override_reason: Option<String>,
    pub referrer_username: String,
    #[serde(default)]
    pub submitted_on: Option<DateTime<Utc>>,
}

impl Referral {
    pub fn is_draft(&self) -> bool {
        self.status == ReferralStatus::ReferralStarted
    }

    pub fn has_reason(&self) -> bool {
        non_blank(self.reason.as_deref())
    }

    pub fn has_additional_information(&self) -> bool {
        non_blank(self.additional_information.as_deref())
    }

    pub fn has_override_reason(&self) -> bool {
        non_blank(self.referrer_override_reason.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|text| !text.trim().is_empty())
}

/// Payload for creating a draft referral once the person has been confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReferral {
    pub offering_id: OfferingId,
    pub prison_number: String,
    pub referrer_username: String,
    pub is_override: bool,
    /// Learning disabilities and challenges, as screened for the PNI. `None` when unscored.
    #[serde(default)]
    pub has_ldc: Option<bool>,
}

/// Partial update sent by a single wizard step. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_information: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oasys_confirmed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_reviewed_programme_history: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_ldc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_ldc_been_overridden_by_programme_team: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_override_reason: Option<String>,
}

impl ReferralUpdate {
    pub fn apply_to(&self, referral: &mut Referral) {
        if let Some(reason) = &self.reason {
            referral.reason = Some(reason.clone());
        }
        if let Some(information) = &self.additional_information {
            referral.additional_information = Some(information.clone());
        }
        if let Some(confirmed) = self.oasys_confirmed {
            referral.oasys_confirmed = confirmed;
        }
        if let Some(reviewed) = self.has_reviewed_programme_history {
            referral.has_reviewed_programme_history = reviewed;
        }
        if let Some(has_ldc) = self.has_ldc {
            referral.has_ldc = Some(has_ldc);
        }
        if let Some(overridden) = self.has_ldc_been_overridden_by_programme_team {
            referral.has_ldc_been_overridden_by_programme_team = overridden;
        }
        if let Some(reason) = &self.referrer_override_reason {
            referral.referrer_override_reason = Some(reason.clone());
        }
    }
}

/// Body of the single status-update call a status wizard produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatusUpdate {
    pub status: ReferralStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_information: Option<String>,
}

/// Append-only history entry written whenever the status changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatusHistoryEntry {
    pub status: ReferralStatus,
    #[serde(default)]
    pub previous_status: Option<ReferralStatus>,
    pub username: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub category_description: Option<String>,
    #[serde(default)]
    pub reason_description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseIntensity {
    High,
    Moderate,
    HighModerate,
}

impl CourseIntensity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High intensity",
            Self::Moderate => "Moderate intensity",
            Self::HighModerate => "High and moderate intensity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    #[serde(default)]
    pub alternate_name: Option<String>,
    pub audience: String,
    pub intensity: CourseIntensity,
    #[serde(default)]
    pub building_choices: bool,
    /// The learning disabilities and challenges variant of a course.
    #[serde(default)]
    pub ldc: bool,
}

impl Course {
    pub fn display_name(&self) -> String {
        match &self.alternate_name {
            Some(alternate) => format!("{} ({})", self.name, alternate),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOffering {
    pub id: OfferingId,
    pub course_id: CourseId,
    pub organisation_id: String,
    pub contact_email: String,
    pub referable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organisation {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub prison_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub prison_name: Option<String>,
    #[serde(default)]
    pub earliest_release_date: Option<NaiveDate>,
}

impl Person {
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PniScore {
    pub prison_number: String,
    pub programme_pathway: ProgrammePathway,
    #[serde(default)]
    pub has_ldc: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipationSettingKind {
    Custody,
    Community,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationSetting {
    pub kind: ParticipationSettingKind,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipationOutcomeStatus {
    Complete,
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationOutcome {
    pub status: ParticipationOutcomeStatus,
    #[serde(default)]
    pub year_started: Option<i32>,
    #[serde(default)]
    pub year_completed: Option<i32>,
}

/// A person's historical programme record, independent of any one referral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseParticipation {
    pub id: ParticipationId,
    pub prison_number: String,
    pub course_name: String,
    #[serde(default)]
    pub setting: Option<ParticipationSetting>,
    #[serde(default)]
    pub outcome: Option<ParticipationOutcome>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

/// Fields a referrer may set when adding or editing programme history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseParticipationUpdate {
    pub course_name: String,
    #[serde(default)]
    pub setting: Option<ParticipationSetting>,
    #[serde(default)]
    pub outcome: Option<ParticipationOutcome>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Reference data grouping the reasons for moving to a closing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatusCategory {
    pub code: String,
    pub description: String,
    pub status: ReferralStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatusReason {
    pub code: String,
    pub description: String,
    pub category_code: String,
}

/// Case-list projection of a referral joined with person and course details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummary {
    pub id: ReferralId,
    pub prison_number: String,
    pub person_name: String,
    pub course_name: String,
    pub audience: String,
    pub status: ReferralStatus,
    pub organisation_id: String,
    pub referrer_username: String,
    #[serde(default)]
    pub submitted_on: Option<NaiveDate>,
    #[serde(default)]
    pub earliest_release_date: Option<NaiveDate>,
}
