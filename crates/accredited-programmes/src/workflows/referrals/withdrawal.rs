//! Category → reason → free-text wizard behind withdrawals and other status changes.

use serde::{Deserialize, Serialize};

use super::domain::{ReferralId, ReferralStatusCategory, ReferralStatusReason, ReferralStatusUpdate};
use super::status::ReferralStatus;

pub const REASON_INFORMATION_MAX_LENGTH: usize = 1000;

const OTHER: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioItem {
    pub value: String,
    pub text: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RadioEntry {
    Item(RadioItem),
    Divider { divider: &'static str },
}

/// Radio entries in reference-data order, with a divider placed before an "Other" option.
pub fn radio_items<'a, I>(options: I, checked: Option<&str>) -> Vec<RadioEntry>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut entries = Vec::new();
    for (code, description) in options {
        if description == OTHER {
            entries.push(RadioEntry::Divider { divider: "or" });
        }
        entries.push(RadioEntry::Item(RadioItem {
            value: code.to_string(),
            text: description.to_string(),
            checked: checked == Some(code),
        }));
    }
    entries
}

pub fn category_radios(
    categories: &[ReferralStatusCategory],
    checked: Option<&str>,
) -> Vec<RadioEntry> {
    radio_items(
        categories
            .iter()
            .map(|category| (category.code.as_str(), category.description.as_str())),
        checked,
    )
}

pub fn reason_radios(
    reasons: &[ReferralStatusReason],
    category_code: &str,
    checked: Option<&str>,
) -> Vec<RadioEntry> {
    radio_items(
        reasons_for(reasons, category_code)
            .map(|reason| (reason.code.as_str(), reason.description.as_str())),
        checked,
    )
}

fn reasons_for<'a>(
    reasons: &'a [ReferralStatusReason],
    category_code: &'a str,
) -> impl Iterator<Item = &'a ReferralStatusReason> + 'a {
    reasons
        .iter()
        .filter(move |reason| reason.category_code == category_code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Category,
    Reason,
    ReasonInformation,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Select a category")]
    CategoryRequired,
    #[error("Select a reason")]
    ReasonRequired,
    #[error("'{0}' is not a category for this status")]
    UnknownCategory(String),
    #[error("'{0}' is not a reason in the selected category")]
    UnknownReason(String),
    #[error("Enter more information")]
    InformationRequired,
    #[error("Information must be {max} characters or fewer")]
    InformationTooLong { max: usize },
    #[error("this step is not available yet")]
    OutOfOrder { resume_at: WizardStep },
}

/// In-progress status change held in the session between wizard steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateDraft {
    pub referral_id: ReferralId,
    pub status: ReferralStatus,
    #[serde(default)]
    pub category_code: Option<String>,
    #[serde(default)]
    pub reason_code: Option<String>,
    #[serde(default)]
    pub reason_skipped: bool,
}

impl StatusUpdateDraft {
    pub fn new(referral_id: ReferralId, status: ReferralStatus) -> Self {
        Self {
            referral_id,
            status,
            category_code: None,
            reason_code: None,
            reason_skipped: false,
        }
    }

    pub fn belongs_to(&self, referral_id: ReferralId) -> bool {
        self.referral_id == referral_id
    }

    pub fn first_step(&self) -> WizardStep {
        if self.status.requires_category() {
            WizardStep::Category
        } else {
            WizardStep::ReasonInformation
        }
    }

    /// Returns `Err` with the step to resume at when `step` cannot be shown yet.
    pub fn ensure_step(&self, step: WizardStep) -> Result<(), WizardError> {
        let resume_at = match step {
            WizardStep::Category if self.status.requires_category() => None,
            WizardStep::Category => Some(WizardStep::ReasonInformation),
            WizardStep::Reason => match (&self.category_code, self.reason_skipped) {
                (None, _) => Some(self.first_step()),
                (Some(_), true) => Some(WizardStep::ReasonInformation),
                (Some(_), false) => None,
            },
            WizardStep::ReasonInformation => {
                if !self.status.requires_category() {
                    None
                } else if self.category_code.is_none() {
                    Some(WizardStep::Category)
                } else if self.reason_code.is_none() && !self.reason_skipped {
                    Some(WizardStep::Reason)
                } else {
                    None
                }
            }
        };

        match resume_at {
            Some(resume_at) => Err(WizardError::OutOfOrder { resume_at }),
            None => Ok(()),
        }
    }

    /// Records the category. A category with no reasons skips straight to free text.
    pub fn choose_category(
        &mut self,
        code: Option<&str>,
        categories: &[ReferralStatusCategory],
        reasons: &[ReferralStatusReason],
    ) -> Result<WizardStep, WizardError> {
        self.ensure_step(WizardStep::Category)?;
        let code = code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or(WizardError::CategoryRequired)?;

        let category = categories
            .iter()
            .find(|category| category.code == code && category.status == self.status)
            .ok_or_else(|| WizardError::UnknownCategory(code.to_string()))?;

        self.category_code = Some(category.code.clone());
        self.reason_code = None;
        self.reason_skipped = reasons_for(reasons, &category.code).next().is_none();

        Ok(if self.reason_skipped {
            WizardStep::ReasonInformation
        } else {
            WizardStep::Reason
        })
    }

    pub fn choose_reason(
        &mut self,
        code: Option<&str>,
        reasons: &[ReferralStatusReason],
    ) -> Result<WizardStep, WizardError> {
        self.ensure_step(WizardStep::Reason)?;
        let code = code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or(WizardError::ReasonRequired)?;

        let category_code = self.category_code.as_deref().unwrap_or_default();
        let reason = reasons_for(reasons, category_code)
            .find(|reason| reason.code == code)
            .ok_or_else(|| WizardError::UnknownReason(code.to_string()))?;

        self.reason_code = Some(reason.code.clone());
        Ok(WizardStep::ReasonInformation)
    }

    /// Composes the single status-update call from the draft and the free text.
    pub fn complete(&self, reason_information: &str) -> Result<ReferralStatusUpdate, WizardError> {
        self.ensure_step(WizardStep::ReasonInformation)?;

        let information = reason_information.trim();
        if information.is_empty() {
            return Err(WizardError::InformationRequired);
        }
        if information.chars().count() > REASON_INFORMATION_MAX_LENGTH {
            return Err(WizardError::InformationTooLong {
                max: REASON_INFORMATION_MAX_LENGTH,
            });
        }

        Ok(ReferralStatusUpdate {
            status: self.status,
            category_code: self.category_code.clone(),
            reason_code: self.reason_code.clone(),
            reason_information: Some(information.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::common::{withdrawal_categories, withdrawal_reasons};
    use super::*;

    fn draft() -> StatusUpdateDraft {
        StatusUpdateDraft::new(ReferralId::new(), ReferralStatus::Withdrawn)
    }

    #[test]
    fn divider_precedes_other() {
        let entries = radio_items(
            [("A", "Administrative error"), ("O", "Other"), ("Z", "Zebra")],
            Some("O"),
        );

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1], RadioEntry::Divider { divider: "or" });
        match &entries[2] {
            RadioEntry::Item(item) => {
                assert_eq!(item.text, "Other");
                assert!(item.checked);
            }
            other => panic!("expected item, got {other:?}"),
        }
    }

    #[test]
    fn no_divider_without_an_exact_other() {
        let entries = radio_items([("A", "Other reasons"), ("B", "other")], None);
        assert!(entries
            .iter()
            .all(|entry| matches!(entry, RadioEntry::Item(item) if !item.checked)));
    }

    #[test]
    fn reasons_are_filtered_by_category() {
        let entries = reason_radios(&withdrawal_reasons(), "W_ADMIN", None);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn category_with_reasons_requires_reason_before_information() {
        let mut draft = draft();
        let next = draft
            .choose_category(Some("W_ADMIN"), &withdrawal_categories(), &withdrawal_reasons())
            .expect("valid category");
        assert_eq!(next, WizardStep::Reason);
        assert_eq!(
            draft.complete("text"),
            Err(WizardError::OutOfOrder {
                resume_at: WizardStep::Reason
            })
        );

        draft
            .choose_reason(Some("W_ADMIN_DUPLICATE"), &withdrawal_reasons())
            .expect("valid reason");
        let update = draft.complete("  no longer needed ").expect("complete");
        assert_eq!(
            update,
            ReferralStatusUpdate {
                status: ReferralStatus::Withdrawn,
                category_code: Some("W_ADMIN".to_string()),
                reason_code: Some("W_ADMIN_DUPLICATE".to_string()),
                reason_information: Some("no longer needed".to_string()),
            }
        );
    }

    #[test]
    fn category_without_reasons_skips_reason_step() {
        let mut draft = draft();
        let next = draft
            .choose_category(Some("W_PERSONAL"), &withdrawal_categories(), &withdrawal_reasons())
            .expect("valid category");
        assert_eq!(next, WizardStep::ReasonInformation);
        assert!(draft.reason_skipped);
        assert_eq!(
            draft.ensure_step(WizardStep::Reason),
            Err(WizardError::OutOfOrder {
                resume_at: WizardStep::ReasonInformation
            })
        );

        let update = draft.complete("moved prison").expect("complete");
        assert_eq!(update.reason_code, None);
        assert_eq!(update.category_code.as_deref(), Some("W_PERSONAL"));
    }

    #[test]
    fn changing_category_clears_the_reason() {
        let mut draft = draft();
        draft
            .choose_category(Some("W_ADMIN"), &withdrawal_categories(), &withdrawal_reasons())
            .expect("category");
        draft
            .choose_reason(Some("W_ADMIN_ERROR"), &withdrawal_reasons())
            .expect("reason");
        draft
            .choose_category(Some("W_PERSONAL"), &withdrawal_categories(), &withdrawal_reasons())
            .expect("category");
        assert_eq!(draft.reason_code, None);
    }

    #[test]
    fn rejects_missing_and_foreign_codes() {
        let mut draft = draft();
        assert_eq!(
            draft.choose_category(None, &withdrawal_categories(), &withdrawal_reasons()),
            Err(WizardError::CategoryRequired)
        );
        assert_eq!(
            draft.choose_category(
                Some("D_BEHAVIOUR"),
                &withdrawal_categories(),
                &withdrawal_reasons()
            ),
            Err(WizardError::UnknownCategory("D_BEHAVIOUR".to_string()))
        );

        draft
            .choose_category(Some("W_ADMIN"), &withdrawal_categories(), &withdrawal_reasons())
            .expect("category");
        assert_eq!(
            draft.choose_reason(Some("W_HEALTH_ILL"), &withdrawal_reasons()),
            Err(WizardError::UnknownReason("W_HEALTH_ILL".to_string()))
        );
    }

    #[test]
    fn information_is_required_and_bounded() {
        let draft = StatusUpdateDraft::new(ReferralId::new(), ReferralStatus::AssessmentStarted);
        assert_eq!(draft.first_step(), WizardStep::ReasonInformation);
        assert_eq!(draft.complete("   "), Err(WizardError::InformationRequired));
        let long = "x".repeat(REASON_INFORMATION_MAX_LENGTH + 1);
        assert_eq!(
            draft.complete(&long),
            Err(WizardError::InformationTooLong {
                max: REASON_INFORMATION_MAX_LENGTH
            })
        );
    }
}
