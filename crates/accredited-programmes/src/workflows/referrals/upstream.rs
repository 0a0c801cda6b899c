use std::sync::Arc;

use super::domain::{
    Course, CourseId, CourseOffering, CourseParticipation, CourseParticipationUpdate, NewReferral,
    OfferingId, Organisation, ParticipationId, Person, PniScore, Referral, ReferralId,
    ReferralStatusCategory, ReferralStatusHistoryEntry, ReferralStatusReason,
    ReferralStatusUpdate, ReferralSummary, ReferralUpdate,
};
use super::status::ReferralStatus;

/// Error enumeration shared by every upstream client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Which referrals a case list is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseListScope {
    /// Referrals a referrer has made, drafts included.
    Referrer { username: String },
    /// Every submitted referral, as seen by programme teams.
    ProgrammeTeam,
}

pub trait ReferralApi: Send + Sync {
    fn referral(&self, id: ReferralId) -> Result<Referral, ApiError>;
    fn create_referral(&self, referral: NewReferral) -> Result<Referral, ApiError>;
    fn update_referral(&self, id: ReferralId, update: &ReferralUpdate)
        -> Result<Referral, ApiError>;
    fn submit_referral(&self, id: ReferralId, username: &str) -> Result<Referral, ApiError>;
    fn delete_referral(&self, id: ReferralId) -> Result<(), ApiError>;
    fn status_history(&self, id: ReferralId) -> Result<Vec<ReferralStatusHistoryEntry>, ApiError>;
    /// Moves the referral on from `expected`. A referral no longer at `expected` is a
    /// [`ApiError::Conflict`].
    fn update_status(
        &self,
        id: ReferralId,
        expected: ReferralStatus,
        update: &ReferralStatusUpdate,
        username: &str,
    ) -> Result<(), ApiError>;
    /// Closes the referral as transferred and opens a draft-free copy on the target offering.
    fn transfer(
        &self,
        id: ReferralId,
        expected: ReferralStatus,
        offering_id: OfferingId,
        transfer_reason: &str,
        username: &str,
    ) -> Result<Referral, ApiError>;
    fn summaries(&self, scope: &CaseListScope) -> Result<Vec<ReferralSummary>, ApiError>;
}

pub trait PersonApi: Send + Sync {
    fn person(&self, prison_number: &str) -> Result<Person, ApiError>;
}

pub trait CourseApi: Send + Sync {
    fn course(&self, id: CourseId) -> Result<Course, ApiError>;
    fn course_for_offering(&self, offering_id: OfferingId) -> Result<Course, ApiError>;
    fn offering(&self, id: OfferingId) -> Result<CourseOffering, ApiError>;
    fn offerings_for_course(&self, course_id: CourseId) -> Result<Vec<CourseOffering>, ApiError>;
    fn building_choices_courses(&self) -> Result<Vec<Course>, ApiError>;
    fn participations(&self, prison_number: &str) -> Result<Vec<CourseParticipation>, ApiError>;
    fn participation(&self, id: ParticipationId) -> Result<CourseParticipation, ApiError>;
    fn create_participation(
        &self,
        prison_number: &str,
        participation: &CourseParticipationUpdate,
        username: &str,
    ) -> Result<CourseParticipation, ApiError>;
    fn update_participation(
        &self,
        id: ParticipationId,
        participation: &CourseParticipationUpdate,
    ) -> Result<CourseParticipation, ApiError>;
    fn delete_participation(&self, id: ParticipationId) -> Result<(), ApiError>;
}

pub trait PniApi: Send + Sync {
    fn pni_score(&self, prison_number: &str) -> Result<PniScore, ApiError>;
}

pub trait ReferenceDataApi: Send + Sync {
    fn status_categories(&self, status: ReferralStatus)
        -> Result<Vec<ReferralStatusCategory>, ApiError>;
    /// Reasons across every category belonging to `status`.
    fn status_reasons(&self, status: ReferralStatus) -> Result<Vec<ReferralStatusReason>, ApiError>;
}

pub trait OrganisationApi: Send + Sync {
    fn organisation(&self, id: &str) -> Result<Organisation, ApiError>;
}

/// The full set of upstream clients a request may reach.
#[derive(Clone)]
pub struct Upstreams {
    pub referrals: Arc<dyn ReferralApi>,
    pub people: Arc<dyn PersonApi>,
    pub courses: Arc<dyn CourseApi>,
    pub pni: Arc<dyn PniApi>,
    pub reference_data: Arc<dyn ReferenceDataApi>,
    pub organisations: Arc<dyn OrganisationApi>,
}
