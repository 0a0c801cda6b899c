use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::access::{ApplicationRole, RoleSet};
use crate::workflows::referrals::domain::{
    Course, CourseId, CourseIntensity, CourseOffering, CourseParticipation,
    CourseParticipationUpdate, NewReferral, OfferingId, Organisation, ParticipationId,
    ParticipationOutcome, ParticipationOutcomeStatus, Person, PniScore, Referral, ReferralId,
    ReferralStatusCategory, ReferralStatusHistoryEntry, ReferralStatusReason,
    ReferralStatusUpdate, ReferralSummary, ReferralUpdate,
};
use crate::workflows::referrals::pni::ProgrammePathway;
use crate::workflows::referrals::service::ReferralService;
use crate::workflows::referrals::status::ReferralStatus;
use crate::workflows::referrals::upstream::{
    ApiError, CaseListScope, CourseApi, OrganisationApi, PersonApi, PniApi, ReferenceDataApi,
    ReferralApi, Upstreams,
};

pub(crate) const PRISON_NUMBER: &str = "A1234AA";
pub(crate) const REFERRER: &str = "REFERRER_USER";

pub(crate) fn referrer() -> RoleSet {
    RoleSet::new([ApplicationRole::AcpReferrer])
}

pub(crate) fn programme_team() -> RoleSet {
    RoleSet::new([ApplicationRole::AcpProgrammeTeam])
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(crate) fn person() -> Person {
    Person {
        prison_number: PRISON_NUMBER.to_string(),
        first_name: "Del".to_string(),
        last_name: "Hatton".to_string(),
        date_of_birth: Some(date(1985, 4, 12)),
        prison_name: Some("Whatton (HMP)".to_string()),
        earliest_release_date: Some(date(2027, 6, 30)),
    }
}

pub(crate) fn organisation() -> Organisation {
    Organisation {
        id: "WTI".to_string(),
        name: "Whatton (HMP)".to_string(),
    }
}

pub(crate) fn thinking_skills() -> Course {
    Course {
        id: CourseId(Uuid::from_u128(0x10)),
        name: "Thinking Skills Programme".to_string(),
        alternate_name: Some("TSP".to_string()),
        audience: "General offence".to_string(),
        intensity: CourseIntensity::Moderate,
        building_choices: false,
        ldc: false,
    }
}

pub(crate) fn thinking_skills_offering() -> CourseOffering {
    CourseOffering {
        id: OfferingId(Uuid::from_u128(0x110)),
        course_id: thinking_skills().id,
        organisation_id: "WTI".to_string(),
        contact_email: "tsp@whatton.example".to_string(),
        referable: true,
    }
}

fn building_choices(
    seed: u128,
    intensity: CourseIntensity,
    ldc: bool,
    organisations: &[&str],
) -> (Course, Vec<CourseOffering>) {
    let label = match intensity {
        CourseIntensity::High => "high intensity",
        CourseIntensity::Moderate => "moderate intensity",
        CourseIntensity::HighModerate => "high and moderate intensity",
    };
    let course = Course {
        id: CourseId(Uuid::from_u128(seed)),
        name: format!("Building Choices: {label}"),
        alternate_name: ldc.then(|| "LDC".to_string()),
        audience: "General offence".to_string(),
        intensity,
        building_choices: true,
        ldc,
    };
    let offerings = organisations
        .iter()
        .enumerate()
        .map(|(index, organisation)| CourseOffering {
            id: OfferingId(Uuid::from_u128(seed * 0x100 + index as u128)),
            course_id: course.id,
            organisation_id: organisation.to_string(),
            contact_email: format!("bc@{}.example", organisation.to_lowercase()),
            referable: true,
        })
        .collect();
    (course, offerings)
}

/// Building Choices courses with their offerings, high intensity first.
pub(crate) fn building_choices_catalogue() -> Vec<(Course, Vec<CourseOffering>)> {
    vec![
        building_choices(0x20, CourseIntensity::High, false, &["WTI", "MDI"]),
        building_choices(0x21, CourseIntensity::Moderate, false, &["WTI"]),
        building_choices(0x22, CourseIntensity::High, true, &["WTI"]),
        building_choices(0x23, CourseIntensity::Moderate, true, &["MDI"]),
    ]
}

pub(crate) fn draft_referral() -> Referral {
    Referral {
        id: ReferralId(Uuid::from_u128(0x1000)),
        prison_number: PRISON_NUMBER.to_string(),
        offering_id: thinking_skills_offering().id,
        status: ReferralStatus::ReferralStarted,
        reason: None,
        additional_information: None,
        oasys_confirmed: false,
        has_reviewed_programme_history: false,
        has_ldc: None,
        has_ldc_been_overridden_by_programme_team: false,
        is_override: false,
        referrer_override_reason: None,
        referrer_username: REFERRER.to_string(),
        submitted_on: None,
    }
}

pub(crate) fn complete_draft() -> Referral {
    let mut referral = draft_referral();
    referral.reason = Some("Needs to develop thinking skills".to_string());
    referral.additional_information = Some("Motivated to take part".to_string());
    referral.oasys_confirmed = true;
    referral.has_reviewed_programme_history = true;
    referral
}

pub(crate) fn previous_participation() -> CourseParticipation {
    CourseParticipation {
        id: ParticipationId(Uuid::from_u128(0x5000)),
        prison_number: PRISON_NUMBER.to_string(),
        course_name: "Kaizen".to_string(),
        setting: None,
        outcome: Some(ParticipationOutcome {
            status: ParticipationOutcomeStatus::Complete,
            year_started: Some(2018),
            year_completed: Some(2019),
        }),
        detail: None,
        source: None,
        added_by: REFERRER.to_string(),
        created_at: Utc
            .with_ymd_and_hms(2024, 2, 1, 10, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub(crate) fn withdrawal_categories() -> Vec<ReferralStatusCategory> {
    let category = |code: &str, description: &str, status: ReferralStatus| {
        ReferralStatusCategory {
            code: code.to_string(),
            description: description.to_string(),
            status,
        }
    };
    vec![
        category("W_ADMIN", "Administrative error", ReferralStatus::Withdrawn),
        category("W_PERSONAL", "Personal or family reasons", ReferralStatus::Withdrawn),
        category("W_HEALTH", "Health", ReferralStatus::Withdrawn),
        category("D_BEHAVIOUR", "Behaviour", ReferralStatus::Deselected),
    ]
}

pub(crate) fn withdrawal_reasons() -> Vec<ReferralStatusReason> {
    let reason = |code: &str, description: &str, category: &str| ReferralStatusReason {
        code: code.to_string(),
        description: description.to_string(),
        category_code: category.to_string(),
    };
    vec![
        reason("W_ADMIN_DUPLICATE", "Duplicate referral", "W_ADMIN"),
        reason("W_ADMIN_ERROR", "Referred in error", "W_ADMIN"),
        reason("W_HEALTH_ILL", "Physical health", "W_HEALTH"),
        reason("W_HEALTH_OTHER", "Other", "W_HEALTH"),
        reason("D_BEHAVIOUR_DISRUPTIVE", "Disruptive in group", "D_BEHAVIOUR"),
    ]
}

pub(crate) fn summaries() -> Vec<ReferralSummary> {
    let summary = |seed: u128,
                   prison_number: &str,
                   name: &str,
                   status: ReferralStatus,
                   submitted_on: Option<NaiveDate>| ReferralSummary {
        id: ReferralId(Uuid::from_u128(seed)),
        prison_number: prison_number.to_string(),
        person_name: name.to_string(),
        course_name: "Thinking Skills Programme".to_string(),
        audience: "General offence".to_string(),
        status,
        organisation_id: "WTI".to_string(),
        referrer_username: REFERRER.to_string(),
        submitted_on,
        earliest_release_date: None,
    };
    vec![
        summary(
            0x2001,
            PRISON_NUMBER,
            "Del Hatton",
            ReferralStatus::AwaitingAssessment,
            Some(date(2025, 2, 14)),
        ),
        summary(
            0x2002,
            "B2345BB",
            "Ada Quill",
            ReferralStatus::ReferralSubmitted,
            Some(date(2025, 3, 3)),
        ),
        summary(
            0x2003,
            "A1234AB",
            "Cal Winters",
            ReferralStatus::Withdrawn,
            Some(date(2024, 12, 1)),
        ),
        summary(0x2004, "C3456CC", "Bea Nolan", ReferralStatus::ReferralStarted, None),
        summary(
            0x2005,
            "D4567DD",
            "Eli Stone",
            ReferralStatus::OnHoldAwaitingAssessment,
            Some(date(2025, 1, 20)),
        ),
    ]
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) referrals: HashMap<ReferralId, Referral>,
    pub(crate) history: Vec<(ReferralId, ReferralStatusHistoryEntry)>,
    pub(crate) status_updates: Vec<(ReferralId, ReferralStatusUpdate)>,
    pub(crate) transfers: Vec<(ReferralId, OfferingId)>,
    pub(crate) participations: Vec<CourseParticipation>,
    pub(crate) people: Vec<Person>,
    pub(crate) pathways: HashMap<String, ProgrammePathway>,
    /// LDC screening reported alongside a person's pathway.
    pub(crate) ldc: HashMap<String, bool>,
    pub(crate) catalogue: Vec<(Course, Vec<CourseOffering>)>,
    /// Status reported by `referral` in place of the stored one, as if read before a
    /// concurrent change.
    pub(crate) stale_statuses: HashMap<ReferralId, ReferralStatus>,
    pub(crate) unavailable: bool,
}

/// One fake standing in for every upstream client.
#[derive(Default)]
pub(crate) struct FakeUpstreams {
    pub(crate) state: Mutex<FakeState>,
}

impl FakeUpstreams {
    pub(crate) fn seeded() -> Self {
        let mut catalogue = building_choices_catalogue();
        catalogue.push((thinking_skills(), vec![thinking_skills_offering()]));

        let mut pathways = HashMap::new();
        pathways.insert(PRISON_NUMBER.to_string(), ProgrammePathway::HighIntensityBc);

        Self {
            state: Mutex::new(FakeState {
                people: vec![person()],
                participations: vec![previous_participation()],
                pathways,
                catalogue,
                ..FakeState::default()
            }),
        }
    }

    pub(crate) fn insert(&self, referral: Referral) {
        self.state
            .lock()
            .expect("fake mutex poisoned")
            .referrals
            .insert(referral.id, referral);
    }

    pub(crate) fn stored(&self, id: ReferralId) -> Referral {
        self.state.lock().expect("fake mutex poisoned").referrals[&id].clone()
    }

    pub(crate) fn status_updates(&self) -> Vec<(ReferralId, ReferralStatusUpdate)> {
        self.state
            .lock()
            .expect("fake mutex poisoned")
            .status_updates
            .clone()
    }

    fn call<T>(
        &self,
        f: impl FnOnce(&mut FakeState) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut guard = self.state.lock().expect("fake mutex poisoned");
        if guard.unavailable {
            return Err(ApiError::Unavailable("fake".to_string()));
        }
        f(&mut *guard)
    }
}

fn missing(what: &str) -> ApiError {
    ApiError::NotFound(what.to_string())
}

impl ReferralApi for FakeUpstreams {
    fn referral(&self, id: ReferralId) -> Result<Referral, ApiError> {
        self.call(|state| {
            let mut referral = state
                .referrals
                .get(&id)
                .cloned()
                .ok_or_else(|| missing("referral"))?;
            if let Some(stale) = state.stale_statuses.get(&id) {
                referral.status = *stale;
            }
            Ok(referral)
        })
    }

    fn create_referral(&self, referral: NewReferral) -> Result<Referral, ApiError> {
        self.call(|state| {
            let mut created = draft_referral();
            created.id = ReferralId::new();
            created.offering_id = referral.offering_id;
            created.prison_number = referral.prison_number;
            created.referrer_username = referral.referrer_username;
            created.is_override = referral.is_override;
            created.has_ldc = referral.has_ldc;
            state.referrals.insert(created.id, created.clone());
            Ok(created)
        })
    }

    fn update_referral(
        &self,
        id: ReferralId,
        update: &ReferralUpdate,
    ) -> Result<Referral, ApiError> {
        self.call(|state| {
            let referral = state.referrals.get_mut(&id).ok_or_else(|| missing("referral"))?;
            update.apply_to(referral);
            Ok(referral.clone())
        })
    }

    fn submit_referral(&self, id: ReferralId, _username: &str) -> Result<Referral, ApiError> {
        self.call(|state| {
            let referral = state.referrals.get_mut(&id).ok_or_else(|| missing("referral"))?;
            referral.status = ReferralStatus::ReferralSubmitted;
            referral.submitted_on = Some(Utc::now());
            Ok(referral.clone())
        })
    }

    fn delete_referral(&self, id: ReferralId) -> Result<(), ApiError> {
        self.call(|state| {
            state
                .referrals
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| missing("referral"))
        })
    }

    fn status_history(&self, id: ReferralId) -> Result<Vec<ReferralStatusHistoryEntry>, ApiError> {
        self.call(|state| {
            Ok(state
                .history
                .iter()
                .filter(|(owner, _)| *owner == id)
                .map(|(_, entry)| entry.clone())
                .collect())
        })
    }

    fn update_status(
        &self,
        id: ReferralId,
        expected: ReferralStatus,
        update: &ReferralStatusUpdate,
        _username: &str,
    ) -> Result<(), ApiError> {
        self.call(|state| {
            let referral = state.referrals.get_mut(&id).ok_or_else(|| missing("referral"))?;
            if referral.status != expected {
                return Err(ApiError::Conflict(format!("referral is {}", referral.status.code())));
            }
            referral.status = update.status;
            state.status_updates.push((id, update.clone()));
            Ok(())
        })
    }

    fn transfer(
        &self,
        id: ReferralId,
        expected: ReferralStatus,
        offering_id: OfferingId,
        _transfer_reason: &str,
        _username: &str,
    ) -> Result<Referral, ApiError> {
        self.call(|state| {
            let original = state.referrals.get_mut(&id).ok_or_else(|| missing("referral"))?;
            if original.status != expected {
                return Err(ApiError::Conflict(format!("referral is {}", original.status.code())));
            }
            original.status = ReferralStatus::Transferred;
            let mut moved = original.clone();
            moved.id = ReferralId::new();
            moved.offering_id = offering_id;
            moved.status = ReferralStatus::ReferralSubmitted;
            state.referrals.insert(moved.id, moved.clone());
            state.transfers.push((id, offering_id));
            Ok(moved)
        })
    }

    fn summaries(&self, _scope: &CaseListScope) -> Result<Vec<ReferralSummary>, ApiError> {
        self.call(|_| Ok(summaries()))
    }
}

impl PersonApi for FakeUpstreams {
    fn person(&self, prison_number: &str) -> Result<Person, ApiError> {
        self.call(|state| {
            state
                .people
                .iter()
                .find(|person| person.prison_number == prison_number)
                .cloned()
                .ok_or_else(|| missing("person"))
        })
    }
}

impl CourseApi for FakeUpstreams {
    fn course(&self, id: CourseId) -> Result<Course, ApiError> {
        self.call(|state| {
            state
                .catalogue
                .iter()
                .map(|(course, _)| course)
                .find(|course| course.id == id)
                .cloned()
                .ok_or_else(|| missing("course"))
        })
    }

    fn course_for_offering(&self, offering_id: OfferingId) -> Result<Course, ApiError> {
        self.call(|state| {
            state
                .catalogue
                .iter()
                .find(|(_, offerings)| offerings.iter().any(|offering| offering.id == offering_id))
                .map(|(course, _)| course.clone())
                .ok_or_else(|| missing("course"))
        })
    }

    fn offering(&self, id: OfferingId) -> Result<CourseOffering, ApiError> {
        self.call(|state| {
            state
                .catalogue
                .iter()
                .flat_map(|(_, offerings)| offerings.iter())
                .find(|offering| offering.id == id)
                .cloned()
                .ok_or_else(|| missing("offering"))
        })
    }

    fn offerings_for_course(&self, course_id: CourseId) -> Result<Vec<CourseOffering>, ApiError> {
        self.call(|state| {
            Ok(state
                .catalogue
                .iter()
                .find(|(course, _)| course.id == course_id)
                .map(|(_, offerings)| offerings.clone())
                .unwrap_or_default())
        })
    }

    fn building_choices_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.call(|state| {
            Ok(state
                .catalogue
                .iter()
                .map(|(course, _)| course)
                .filter(|course| course.building_choices)
                .cloned()
                .collect())
        })
    }

    fn participations(&self, prison_number: &str) -> Result<Vec<CourseParticipation>, ApiError> {
        self.call(|state| {
            Ok(state
                .participations
                .iter()
                .filter(|participation| participation.prison_number == prison_number)
                .cloned()
                .collect())
        })
    }

    fn participation(&self, id: ParticipationId) -> Result<CourseParticipation, ApiError> {
        self.call(|state| {
            state
                .participations
                .iter()
                .find(|participation| participation.id == id)
                .cloned()
                .ok_or_else(|| missing("participation"))
        })
    }

    fn create_participation(
        &self,
        prison_number: &str,
        participation: &CourseParticipationUpdate,
        username: &str,
    ) -> Result<CourseParticipation, ApiError> {
        self.call(|state| {
            let created = CourseParticipation {
                id: ParticipationId::new(),
                prison_number: prison_number.to_string(),
                course_name: participation.course_name.clone(),
                setting: participation.setting.clone(),
                outcome: participation.outcome.clone(),
                detail: participation.detail.clone(),
                source: participation.source.clone(),
                added_by: username.to_string(),
                created_at: Utc::now(),
            };
            state.participations.push(created.clone());
            Ok(created)
        })
    }

    fn update_participation(
        &self,
        id: ParticipationId,
        participation: &CourseParticipationUpdate,
    ) -> Result<CourseParticipation, ApiError> {
        self.call(|state| {
            let stored = state
                .participations
                .iter_mut()
                .find(|stored| stored.id == id)
                .ok_or_else(|| missing("participation"))?;
            stored.course_name = participation.course_name.clone();
            stored.setting = participation.setting.clone();
            stored.outcome = participation.outcome.clone();
            stored.detail = participation.detail.clone();
            stored.source = participation.source.clone();
            Ok(stored.clone())
        })
    }

    fn delete_participation(&self, id: ParticipationId) -> Result<(), ApiError> {
        self.call(|state| {
            let before = state.participations.len();
            state.participations.retain(|participation| participation.id != id);
            if state.participations.len() == before {
                Err(missing("participation"))
            } else {
                Ok(())
            }
        })
    }
}

impl PniApi for FakeUpstreams {
    fn pni_score(&self, prison_number: &str) -> Result<PniScore, ApiError> {
        self.call(|state| {
            state
                .pathways
                .get(prison_number)
                .map(|pathway| PniScore {
                    prison_number: prison_number.to_string(),
                    programme_pathway: *pathway,
                    has_ldc: state.ldc.get(prison_number).copied(),
                })
                .ok_or_else(|| missing("pni score"))
        })
    }
}

impl ReferenceDataApi for FakeUpstreams {
    fn status_categories(
        &self,
        status: ReferralStatus,
    ) -> Result<Vec<ReferralStatusCategory>, ApiError> {
        self.call(|_| {
            Ok(withdrawal_categories()
                .into_iter()
                .filter(|category| category.status == status)
                .collect())
        })
    }

    fn status_reasons(
        &self,
        status: ReferralStatus,
    ) -> Result<Vec<ReferralStatusReason>, ApiError> {
        let categories = self.status_categories(status)?;
        Ok(withdrawal_reasons()
            .into_iter()
            .filter(|reason| {
                categories
                    .iter()
                    .any(|category| category.code == reason.category_code)
            })
            .collect())
    }
}

impl OrganisationApi for FakeUpstreams {
    fn organisation(&self, id: &str) -> Result<Organisation, ApiError> {
        self.call(|_| {
            if id == "WTI" {
                Ok(organisation())
            } else {
                Err(missing("organisation"))
            }
        })
    }
}

pub(crate) fn build_service() -> (ReferralService, Arc<FakeUpstreams>) {
    let fake = Arc::new(FakeUpstreams::seeded());
    let upstreams = Upstreams {
        referrals: fake.clone(),
        people: fake.clone(),
        courses: fake.clone(),
        pni: fake.clone(),
        reference_data: fake.clone(),
        organisations: fake.clone(),
    };
    (ReferralService::new(upstreams), fake)
}
