//! Per-browser state carried between requests of a multi-step journey.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::workflows::referrals::{
    ProgrammePathway, ReferralId, StatusUpdateDraft, TransferErrorData,
};

/// Result of the find journey's person search, reused when the referral is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PniFindAndReferData {
    pub prison_number: String,
    pub person_name: String,
    pub programme_pathway: ProgrammePathway,
}

/// Field-keyed validation errors and the submitted values to re-render them with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flash {
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
}

impl Flash {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.values.is_empty() && self.success.is_none()
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.insert(field.to_string(), message.into());
        self
    }

    pub fn value(&mut self, field: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(field.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default)]
    pub pni_find_and_refer_data: Option<PniFindAndReferData>,
    #[serde(default)]
    pub referral_status_update_data: Option<StatusUpdateDraft>,
    #[serde(default)]
    pub transfer_error_data: Option<TransferErrorData>,
    /// Last rendered case list path, keyed by the journey's case list base path.
    #[serde(default)]
    pub recent_case_list_path: BTreeMap<String, String>,
    #[serde(default)]
    pub flash: Flash,
}

impl SessionData {
    /// Flash messages are shown once.
    pub fn take_flash(&mut self) -> Flash {
        std::mem::take(&mut self.flash)
    }

    /// The in-progress status change for `referral_id`. State left over from another
    /// referral is discarded.
    pub fn status_update_for(&mut self, referral_id: ReferralId) -> Option<&mut StatusUpdateDraft> {
        if self
            .referral_status_update_data
            .as_ref()
            .is_some_and(|draft| !draft.belongs_to(referral_id))
        {
            self.referral_status_update_data = None;
        }
        self.referral_status_update_data.as_mut()
    }

    pub fn transfer_error_for(&mut self, referral_id: ReferralId) -> Option<&TransferErrorData> {
        if self
            .transfer_error_data
            .as_ref()
            .is_some_and(|data| data.referral_id != referral_id)
        {
            self.transfer_error_data = None;
        }
        self.transfer_error_data.as_ref()
    }

    pub fn remember_case_list(&mut self, case_list: &str, current: String) {
        self.recent_case_list_path.insert(case_list.to_string(), current);
    }

    pub fn back_to_case_list<'a>(&'a self, case_list: &'a str) -> &'a str {
        self.recent_case_list_path
            .get(case_list)
            .map(String::as_str)
            .unwrap_or(case_list)
    }
}
