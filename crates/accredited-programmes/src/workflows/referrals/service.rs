use tracing::{info, warn};

use super::case_list::{CaseList, CaseListQuery};
use super::check_answers::{check_answers, CheckAnswers};
use super::domain::{
    Course, CourseOffering, CourseParticipation, CourseParticipationUpdate, NewReferral,
    OfferingId, ParticipationId, Person, PniScore, Referral, ReferralId, ReferralStatusCategory,
    ReferralStatusReason, ReferralStatusUpdate, ReferralSummary, ReferralUpdate,
};
use super::history::{timeline, TimelineEntry};
use super::pni::{self, PniContent, ProgrammePathway};
use super::status::{authorize_transition, ReferralStatus, TransitionError};
use super::task_list::TaskList;
use super::transfer::{transfer_target, TransferErrorReason, TransferSubject, TransferTarget};
use super::upstream::{ApiError, CaseListScope, Upstreams};
use crate::access::RoleSet;
use crate::paths::PathError;

/// Error raised by the referral service.
#[derive(Debug, thiserror::Error)]
pub enum ReferralServiceError {
    #[error(transparent)]
    Upstream(#[from] ApiError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("referral {0} is no longer a draft")]
    NotDraft(ReferralId),
    #[error("referral {0} does not need a reason for override")]
    NotOverride(ReferralId),
    #[error("This referral's status has changed since you started")]
    StatusChanged(ReferralId),
    #[error("referral {0} is not open for assessment")]
    NotOpen(ReferralId),
    #[error("only the programme team can change LDC needs")]
    ProgrammeTeamOnly,
    #[error("offering {0} is not taking referrals")]
    NotReferable(OfferingId),
    #[error("No person with prison number {0} found")]
    PersonNotFound(String),
    #[error("{message}")]
    Invalid {
        field: &'static str,
        message: &'static str,
    },
}

impl ReferralServiceError {
    /// Errors a page should present as a missing resource.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Upstream(err) => err.is_not_found(),
            Self::NotDraft(_)
            | Self::NotOverride(_)
            | Self::NotOpen(_)
            | Self::NotReferable(_) => true,
            _ => false,
        }
    }

    fn invalid(field: &'static str, message: &'static str) -> Self {
        Self::Invalid { field, message }
    }
}

/// Outcome of checking whether a referral can move to Building Choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferCheck {
    Eligible(TransferTarget),
    Ineligible(TransferErrorReason),
}

/// A referral with the person and course it concerns.
#[derive(Debug, Clone)]
pub struct ReferralContext {
    pub referral: Referral,
    pub person: Person,
    pub course: Course,
    pub offering: CourseOffering,
}

/// Service composing the upstream clients with the referral decision logic.
#[derive(Clone)]
pub struct ReferralService {
    upstreams: Upstreams,
}

fn required(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl ReferralService {
    pub fn new(upstreams: Upstreams) -> Self {
        Self { upstreams }
    }

    pub fn upstreams(&self) -> &Upstreams {
        &self.upstreams
    }

    /// Pathway for a person. A person the scoring service has never seen is `Unknown`.
    pub fn pathway(&self, prison_number: &str) -> Result<ProgrammePathway, ReferralServiceError> {
        Ok(self
            .pni_score(prison_number)?
            .map_or(ProgrammePathway::Unknown, |score| score.programme_pathway))
    }

    fn pni_score(&self, prison_number: &str) -> Result<Option<PniScore>, ReferralServiceError> {
        match self.upstreams.pni.pni_score(prison_number) {
            Ok(score) => Ok(Some(score)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Looks up a person by prison number, narrowing a missing person to a field error.
    pub fn find_person(&self, prison_number: &str) -> Result<Person, ReferralServiceError> {
        let prison_number = required(Some(prison_number))
            .ok_or_else(|| ReferralServiceError::invalid("prisonNumber", "Enter a prison number"))?
            .to_uppercase();

        match self.upstreams.people.person(&prison_number) {
            Ok(person) => Ok(person),
            Err(err) if err.is_not_found() => {
                Err(ReferralServiceError::PersonNotFound(prison_number))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Building Choices courses matching the intensity a pathway recommends.
    pub fn recommended_programmes(
        &self,
        pathway: ProgrammePathway,
    ) -> Result<Vec<Course>, ReferralServiceError> {
        let Some(intensity) = pathway.recommended_intensity() else {
            return Ok(Vec::new());
        };

        let courses = self.upstreams.courses.building_choices_courses()?;
        Ok(courses
            .into_iter()
            .filter(|course| pni::table_intensity(pathway, course.intensity) == intensity)
            .collect())
    }

    pub fn pni_content(
        &self,
        prison_number: &str,
        course: &Course,
        overriding: bool,
    ) -> Result<PniContent, ReferralServiceError> {
        let pathway = self.pathway(prison_number)?;
        let intensity = pni::table_intensity(pathway, course.intensity);
        Ok(pni::content(pathway, intensity, overriding))
    }

    pub fn offering(
        &self,
        offering_id: OfferingId,
    ) -> Result<(CourseOffering, Course), ReferralServiceError> {
        let offering = self.upstreams.courses.offering(offering_id)?;
        let course = self.upstreams.courses.course_for_offering(offering_id)?;
        Ok((offering, course))
    }

    /// Creates the draft once the referrer has confirmed the person.
    pub fn start_referral(
        &self,
        offering_id: OfferingId,
        prison_number: &str,
        username: &str,
    ) -> Result<Referral, ReferralServiceError> {
        let (offering, course) = self.offering(offering_id)?;
        if !offering.referable {
            return Err(ReferralServiceError::NotReferable(offering_id));
        }

        let person = self.find_person(prison_number)?;
        let score = self.pni_score(&person.prison_number)?;
        let pathway = score
            .as_ref()
            .map_or(ProgrammePathway::Unknown, |score| score.programme_pathway);
        let is_override =
            course.building_choices && pni::requires_override(pathway, course.intensity);

        let referral = self.upstreams.referrals.create_referral(NewReferral {
            offering_id,
            prison_number: person.prison_number,
            referrer_username: username.to_string(),
            is_override,
            has_ldc: score.and_then(|score| score.has_ldc),
        })?;

        info!(referral_id = %referral.id, %offering_id, is_override, "draft referral created");
        Ok(referral)
    }

    pub fn referral(&self, id: ReferralId) -> Result<Referral, ReferralServiceError> {
        Ok(self.upstreams.referrals.referral(id)?)
    }

    pub fn context(&self, id: ReferralId) -> Result<ReferralContext, ReferralServiceError> {
        let referral = self.referral(id)?;
        let person = self.upstreams.people.person(&referral.prison_number)?;
        let (offering, course) = self.offering(referral.offering_id)?;
        Ok(ReferralContext {
            referral,
            person,
            course,
            offering,
        })
    }

    /// The referral, provided it is still editable by the referrer.
    pub fn draft(&self, id: ReferralId) -> Result<Referral, ReferralServiceError> {
        let referral = self.referral(id)?;
        if referral.is_draft() {
            Ok(referral)
        } else {
            Err(ReferralServiceError::NotDraft(id))
        }
    }

    pub fn task_list(&self, id: ReferralId) -> Result<(Referral, TaskList), ReferralServiceError> {
        let referral = self.draft(id)?;
        let list = TaskList::build(&referral)?;
        Ok((referral, list))
    }

    pub fn update_draft(
        &self,
        id: ReferralId,
        update: ReferralUpdate,
    ) -> Result<Referral, ReferralServiceError> {
        self.draft(id)?;
        Ok(self.upstreams.referrals.update_referral(id, &update)?)
    }

    pub fn save_reason(
        &self,
        id: ReferralId,
        reason: Option<&str>,
    ) -> Result<Referral, ReferralServiceError> {
        let reason = required(reason).ok_or_else(|| {
            ReferralServiceError::invalid("reason", "Enter a reason for the referral")
        })?;
        self.update_draft(
            id,
            ReferralUpdate {
                reason: Some(reason),
                ..ReferralUpdate::default()
            },
        )
    }

    pub fn save_additional_information(
        &self,
        id: ReferralId,
        information: Option<&str>,
    ) -> Result<Referral, ReferralServiceError> {
        let information = required(information).ok_or_else(|| {
            ReferralServiceError::invalid("additionalInformation", "Enter additional information")
        })?;
        self.update_draft(
            id,
            ReferralUpdate {
                additional_information: Some(information),
                ..ReferralUpdate::default()
            },
        )
    }

    pub fn save_override_reason(
        &self,
        id: ReferralId,
        reason: Option<&str>,
    ) -> Result<Referral, ReferralServiceError> {
        let referral = self.draft(id)?;
        if !referral.is_override {
            return Err(ReferralServiceError::NotOverride(id));
        }
        let reason = required(reason).ok_or_else(|| {
            ReferralServiceError::invalid(
                "referrerOverrideReason",
                "Enter a reason for the override",
            )
        })?;
        Ok(self.upstreams.referrals.update_referral(
            id,
            &ReferralUpdate {
                referrer_override_reason: Some(reason),
                ..ReferralUpdate::default()
            },
        )?)
    }

    pub fn confirm_oasys(
        &self,
        id: ReferralId,
        confirmed: bool,
    ) -> Result<Referral, ReferralServiceError> {
        if !confirmed {
            return Err(ReferralServiceError::invalid(
                "oasysConfirmed",
                "Confirm that the OASys information is up to date",
            ));
        }
        self.update_draft(
            id,
            ReferralUpdate {
                oasys_confirmed: Some(true),
                ..ReferralUpdate::default()
            },
        )
    }

    pub fn mark_programme_history_reviewed(
        &self,
        id: ReferralId,
    ) -> Result<Referral, ReferralServiceError> {
        self.update_draft(
            id,
            ReferralUpdate {
                has_reviewed_programme_history: Some(true),
                ..ReferralUpdate::default()
            },
        )
    }

    pub fn participations(
        &self,
        id: ReferralId,
    ) -> Result<(Referral, Vec<CourseParticipation>), ReferralServiceError> {
        let referral = self.draft(id)?;
        let participations = self
            .upstreams
            .courses
            .participations(&referral.prison_number)?;
        Ok((referral, participations))
    }

    /// A participation belonging to the referral's person.
    pub fn participation(
        &self,
        id: ReferralId,
        participation_id: ParticipationId,
    ) -> Result<CourseParticipation, ReferralServiceError> {
        let referral = self.draft(id)?;
        let participation = self.upstreams.courses.participation(participation_id)?;
        if participation.prison_number != referral.prison_number {
            return Err(ApiError::NotFound(format!("participation {participation_id}")).into());
        }
        Ok(participation)
    }

    fn validate_participation(
        participation: &CourseParticipationUpdate,
    ) -> Result<(), ReferralServiceError> {
        if required(Some(participation.course_name.as_str())).is_none() {
            return Err(ReferralServiceError::invalid("courseName", "Enter the programme name"));
        }
        Ok(())
    }

    pub fn add_participation(
        &self,
        id: ReferralId,
        participation: CourseParticipationUpdate,
        username: &str,
    ) -> Result<CourseParticipation, ReferralServiceError> {
        Self::validate_participation(&participation)?;
        let referral = self.draft(id)?;
        Ok(self.upstreams.courses.create_participation(
            &referral.prison_number,
            &participation,
            username,
        )?)
    }

    pub fn update_participation(
        &self,
        id: ReferralId,
        participation_id: ParticipationId,
        participation: CourseParticipationUpdate,
    ) -> Result<CourseParticipation, ReferralServiceError> {
        Self::validate_participation(&participation)?;
        self.participation(id, participation_id)?;
        Ok(self
            .upstreams
            .courses
            .update_participation(participation_id, &participation)?)
    }

    pub fn delete_participation(
        &self,
        id: ReferralId,
        participation_id: ParticipationId,
    ) -> Result<(), ReferralServiceError> {
        self.participation(id, participation_id)?;
        Ok(self.upstreams.courses.delete_participation(participation_id)?)
    }

    pub fn check_answers(
        &self,
        id: ReferralId,
    ) -> Result<(ReferralContext, CheckAnswers), ReferralServiceError> {
        let context = self.context(id)?;
        if !context.referral.is_draft() {
            return Err(ReferralServiceError::NotDraft(id));
        }
        let organisation = self
            .upstreams
            .organisations
            .organisation(&context.offering.organisation_id)?;
        let participations = self
            .upstreams
            .courses
            .participations(&context.referral.prison_number)?;
        let answers = check_answers(
            &context.referral,
            &context.person,
            &context.course,
            &organisation,
            &participations,
        )?;
        Ok((context, answers))
    }

    /// Submits a draft once every task is complete and the referrer has confirmed it.
    pub fn submit(
        &self,
        id: ReferralId,
        confirmed: bool,
        roles: &RoleSet,
        username: &str,
    ) -> Result<Referral, ReferralServiceError> {
        let referral = self.draft(id)?;

        if referral.is_override && !referral.has_override_reason() {
            return Err(ReferralServiceError::invalid(
                "referrerOverrideReason",
                "Enter a reason for the override",
            ));
        }
        if !TaskList::build(&referral)?.ready_to_submit {
            return Err(ReferralServiceError::invalid(
                "tasks",
                "Complete every section before submitting",
            ));
        }
        if !confirmed {
            return Err(ReferralServiceError::invalid(
                "confirmation",
                "Confirm that the information you have provided is complete, accurate and up to date",
            ));
        }

        authorize_transition(referral.status, ReferralStatus::ReferralSubmitted, roles)?;
        let submitted = self.upstreams.referrals.submit_referral(id, username)?;
        info!(referral_id = %id, "referral submitted");
        Ok(submitted)
    }

    pub fn delete_draft(&self, id: ReferralId) -> Result<(), ReferralServiceError> {
        self.draft(id)?;
        self.upstreams.referrals.delete_referral(id)?;
        info!(referral_id = %id, "draft referral deleted");
        Ok(())
    }

    pub fn status_history(
        &self,
        id: ReferralId,
    ) -> Result<Vec<TimelineEntry>, ReferralServiceError> {
        Ok(timeline(self.upstreams.referrals.status_history(id)?))
    }

    pub fn status_categories(
        &self,
        status: ReferralStatus,
    ) -> Result<Vec<ReferralStatusCategory>, ReferralServiceError> {
        Ok(self.upstreams.reference_data.status_categories(status)?)
    }

    pub fn status_reasons(
        &self,
        status: ReferralStatus,
    ) -> Result<Vec<ReferralStatusReason>, ReferralServiceError> {
        Ok(self.upstreams.reference_data.status_reasons(status)?)
    }

    /// Sends the single status-update call a completed wizard produces.
    pub fn update_status(
        &self,
        id: ReferralId,
        update: &ReferralStatusUpdate,
        roles: &RoleSet,
        username: &str,
    ) -> Result<(), ReferralServiceError> {
        let referral = self.referral(id)?;
        authorize_transition(referral.status, update.status, roles)?;
        if update.status.requires_category() && update.category_code.is_none() {
            return Err(ReferralServiceError::invalid("categoryCode", "Select a category"));
        }

        match self
            .upstreams
            .referrals
            .update_status(id, referral.status, update, username)
        {
            Ok(()) => {}
            Err(ApiError::Conflict(detail)) => {
                warn!(referral_id = %id, %detail, "status changed underneath the update");
                return Err(ReferralServiceError::StatusChanged(id));
            }
            Err(err) => return Err(err.into()),
        }
        info!(
            referral_id = %id,
            from = referral.status.code(),
            to = update.status.code(),
            "referral status updated"
        );
        Ok(())
    }

    /// Records the programme team's view of whether the person needs an LDC-adapted course,
    /// replacing whatever the PNI screening said.
    pub fn update_ldc(
        &self,
        id: ReferralId,
        has_ldc: Option<bool>,
        roles: &RoleSet,
        username: &str,
    ) -> Result<Referral, ReferralServiceError> {
        if !roles.has_programme_team_authority() {
            return Err(ReferralServiceError::ProgrammeTeamOnly);
        }
        let referral = self.referral(id)?;
        if !referral.status.is_open() {
            return Err(ReferralServiceError::NotOpen(id));
        }
        let has_ldc = has_ldc.ok_or_else(|| {
            ReferralServiceError::invalid("hasLdc", "Select whether this person has LDC needs")
        })?;

        let update = ReferralUpdate {
            has_ldc: Some(has_ldc),
            has_ldc_been_overridden_by_programme_team: Some(true),
            ..ReferralUpdate::default()
        };
        let updated = self.upstreams.referrals.update_referral(id, &update)?;
        info!(referral_id = %id, has_ldc, %username, "LDC needs overridden by programme team");
        Ok(updated)
    }

    pub fn check_transfer(
        &self,
        id: ReferralId,
    ) -> Result<(ReferralContext, TransferCheck), ReferralServiceError> {
        let context = self.context(id)?;
        let pathway = self.pathway(&context.referral.prison_number)?;

        let mut candidates = Vec::new();
        for course in self.upstreams.courses.building_choices_courses()? {
            let offerings = self.upstreams.courses.offerings_for_course(course.id)?;
            candidates.push((course, offerings));
        }

        let subject = TransferSubject {
            status: context.referral.status,
            has_ldc: context.referral.has_ldc,
            current_course: &context.course,
            current_offering: &context.offering,
        };
        let check = match transfer_target(pathway, subject, &candidates) {
            Ok(target) => TransferCheck::Eligible(target),
            Err(reason) => TransferCheck::Ineligible(reason),
        };
        Ok((context, check))
    }

    /// Moves the referral to the Building Choices offering; the original closes as transferred.
    pub fn transfer(
        &self,
        id: ReferralId,
        transfer_reason: Option<&str>,
        roles: &RoleSet,
        username: &str,
    ) -> Result<Result<Referral, TransferErrorReason>, ReferralServiceError> {
        let transfer_reason = required(transfer_reason).ok_or_else(|| {
            ReferralServiceError::invalid(
                "transferReason",
                "Enter a reason for moving this referral",
            )
        })?;

        let (context, check) = self.check_transfer(id)?;
        let target = match check {
            TransferCheck::Eligible(target) => target,
            TransferCheck::Ineligible(reason) => return Ok(Err(reason)),
        };

        authorize_transition(context.referral.status, ReferralStatus::Transferred, roles)?;
        match self
            .upstreams
            .referrals
            .transfer(
                id,
                context.referral.status,
                target.offering.id,
                &transfer_reason,
                username,
            )
        {
            Ok(referral) => {
                info!(from = %id, to = %referral.id, "referral moved to Building Choices");
                Ok(Ok(referral))
            }
            Err(ApiError::Conflict(_)) => Ok(Err(TransferErrorReason::Error)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn summaries(
        &self,
        scope: &CaseListScope,
    ) -> Result<Vec<ReferralSummary>, ReferralServiceError> {
        Ok(self.upstreams.referrals.summaries(scope)?)
    }

    pub fn case_list<F>(
        &self,
        scope: &CaseListScope,
        query: CaseListQuery,
        base: &str,
        page_size: usize,
        row_href: F,
    ) -> Result<CaseList, ReferralServiceError>
    where
        F: Fn(&ReferralSummary) -> Result<String, PathError>,
    {
        let summaries = self.summaries(scope)?;
        Ok(CaseList::build(summaries, query, base, page_size, row_href)?)
    }
}
