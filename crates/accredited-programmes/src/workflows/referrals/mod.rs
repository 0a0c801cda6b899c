//! Referral lifecycle: drafting, submission, status changes and transfers.
//!
//! Everything here is synchronous decision logic over the upstream client traits in
//! [`upstream`]; the web service supplies the clients and renders the view models.

pub mod case_list;
pub mod check_answers;
pub mod domain;
pub mod history;
pub mod pni;
pub mod service;
pub mod status;
pub mod task_list;
pub mod transfer;
pub mod upstream;
pub mod withdrawal;

#[cfg(test)]
mod tests;

pub use case_list::{CaseList, CaseListQuery, SortColumn, SortDirection, StatusGroup};
pub use check_answers::CheckAnswers;
pub use domain::{
    Course, CourseId, CourseIntensity, CourseOffering, CourseParticipation,
    CourseParticipationUpdate, NewReferral, OfferingId, Organisation, ParticipationId,
    ParticipationOutcome, ParticipationOutcomeStatus, ParticipationSetting,
    ParticipationSettingKind, Person, PniScore, Referral, ReferralId, ReferralStatusCategory,
    ReferralStatusHistoryEntry, ReferralStatusReason, ReferralStatusUpdate, ReferralSummary,
    ReferralUpdate,
};
pub use history::TimelineEntry;
pub use pni::{PniContent, PniIntensity, PniVariant, ProgrammePathway};
pub use service::{ReferralContext, ReferralService, ReferralServiceError, TransferCheck};
pub use status::{authorize_transition, ReferralStatus, TransitionError};
pub use task_list::{TaskList, TaskTag};
pub use transfer::{TransferErrorData, TransferErrorReason, TransferTarget};
pub use upstream::{
    ApiError, CaseListScope, CourseApi, OrganisationApi, PersonApi, PniApi, ReferenceDataApi,
    ReferralApi, Upstreams,
};
pub use withdrawal::{RadioEntry, StatusUpdateDraft, WizardError, WizardStep};
