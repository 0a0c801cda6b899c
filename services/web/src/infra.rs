use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use accredited_programmes::config::{AppConfig, FeatureFlags};
use accredited_programmes::workflows::referrals::{
    ApiError, CaseListScope, Course, CourseApi, CourseId, CourseIntensity, CourseOffering,
    CourseParticipation, CourseParticipationUpdate, NewReferral, OfferingId, Organisation,
    OrganisationApi, ParticipationId, ParticipationOutcome, ParticipationOutcomeStatus,
    ParticipationSetting, ParticipationSettingKind, Person, PersonApi, PniApi, PniScore,
    ProgrammePathway, ReferenceDataApi, Referral, ReferralApi, ReferralId, ReferralService,
    ReferralStatus, ReferralStatusCategory, ReferralStatusHistoryEntry, ReferralStatusReason,
    ReferralStatusUpdate, ReferralSummary, ReferralUpdate, Upstreams,
};
use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use uuid::Uuid;

use crate::session::SessionStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared state handed to every journey handler.
#[derive(Clone)]
pub(crate) struct WebState {
    pub(crate) service: ReferralService,
    pub(crate) sessions: SessionStore,
    pub(crate) features: FeatureFlags,
    pub(crate) page_size: usize,
}

impl WebState {
    pub(crate) fn new(config: &AppConfig, upstreams: Upstreams) -> Self {
        Self {
            service: ReferralService::new(upstreams),
            sessions: SessionStore::new(&config.session),
            features: config.features,
            page_size: config.case_list.page_size,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(what: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::NotFound(format!("{what} {id}"))
}

fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

pub(crate) const WHATTON: &str = "WTI";
pub(crate) const MOORLAND: &str = "MDI";

/// Seed course ids, stable across restarts so local links keep working.
pub(crate) mod seed {
    use super::{CourseId, OfferingId, Uuid};

    pub(crate) const BC_HIGH: CourseId = CourseId(Uuid::from_u128(0xb1));
    pub(crate) const BC_MODERATE: CourseId = CourseId(Uuid::from_u128(0xb2));
    pub(crate) const BC_HIGH_LDC: CourseId = CourseId(Uuid::from_u128(0xb3));
    pub(crate) const BC_MODERATE_LDC: CourseId = CourseId(Uuid::from_u128(0xb4));
    pub(crate) const THINKING_SKILLS: CourseId = CourseId(Uuid::from_u128(0xc1));
    pub(crate) const HORIZON: CourseId = CourseId(Uuid::from_u128(0xc2));

    pub(crate) const BC_HIGH_WHATTON: OfferingId = OfferingId(Uuid::from_u128(0xb101));
    pub(crate) const BC_HIGH_MOORLAND: OfferingId = OfferingId(Uuid::from_u128(0xb102));
    pub(crate) const BC_MODERATE_WHATTON: OfferingId = OfferingId(Uuid::from_u128(0xb201));
    pub(crate) const BC_HIGH_LDC_WHATTON: OfferingId = OfferingId(Uuid::from_u128(0xb301));
    pub(crate) const BC_MODERATE_LDC_MOORLAND: OfferingId = OfferingId(Uuid::from_u128(0xb402));
    pub(crate) const THINKING_SKILLS_WHATTON: OfferingId = OfferingId(Uuid::from_u128(0xc101));
    pub(crate) const HORIZON_MOORLAND: OfferingId = OfferingId(Uuid::from_u128(0xc202));
}

/// Courses, offerings, organisations and programme history.
pub(crate) struct InMemoryCatalogue {
    courses: Vec<Course>,
    offerings: Vec<CourseOffering>,
    organisations: Vec<Organisation>,
    participations: Mutex<Vec<CourseParticipation>>,
}

impl InMemoryCatalogue {
    pub(crate) fn seeded() -> Self {
        let course = |id, name: &str, audience: &str, intensity, building_choices, ldc| Course {
            id,
            name: name.to_string(),
            alternate_name: None,
            audience: audience.to_string(),
            intensity,
            building_choices,
            ldc,
        };
        let offering = |id, course_id, organisation: &str, referable| CourseOffering {
            id,
            course_id,
            organisation_id: organisation.to_string(),
            contact_email: format!("programmes@{}.example", organisation.to_lowercase()),
            referable,
        };

        Self {
            courses: vec![
                course(
                    seed::BC_HIGH,
                    "Building Choices: high intensity",
                    "General offence",
                    CourseIntensity::High,
                    true,
                    false,
                ),
                course(
                    seed::BC_MODERATE,
                    "Building Choices: moderate intensity",
                    "General offence",
                    CourseIntensity::Moderate,
                    true,
                    false,
                ),
                course(
                    seed::BC_HIGH_LDC,
                    "Building Choices: high intensity (LDC)",
                    "General offence",
                    CourseIntensity::High,
                    true,
                    true,
                ),
                course(
                    seed::BC_MODERATE_LDC,
                    "Building Choices: moderate intensity (LDC)",
                    "General offence",
                    CourseIntensity::Moderate,
                    true,
                    true,
                ),
                course(
                    seed::THINKING_SKILLS,
                    "Thinking Skills Programme",
                    "General offence",
                    CourseIntensity::Moderate,
                    false,
                    false,
                ),
                course(
                    seed::HORIZON,
                    "Horizon",
                    "Sexual offence",
                    CourseIntensity::HighModerate,
                    false,
                    false,
                ),
            ],
            offerings: vec![
                offering(seed::BC_HIGH_WHATTON, seed::BC_HIGH, WHATTON, true),
                offering(seed::BC_HIGH_MOORLAND, seed::BC_HIGH, MOORLAND, true),
                offering(seed::BC_MODERATE_WHATTON, seed::BC_MODERATE, WHATTON, true),
                offering(seed::BC_HIGH_LDC_WHATTON, seed::BC_HIGH_LDC, WHATTON, true),
                offering(seed::BC_MODERATE_LDC_MOORLAND, seed::BC_MODERATE_LDC, MOORLAND, true),
                offering(seed::THINKING_SKILLS_WHATTON, seed::THINKING_SKILLS, WHATTON, true),
                offering(seed::HORIZON_MOORLAND, seed::HORIZON, MOORLAND, false),
            ],
            organisations: vec![
                Organisation {
                    id: WHATTON.to_string(),
                    name: "Whatton (HMP)".to_string(),
                },
                Organisation {
                    id: MOORLAND.to_string(),
                    name: "Moorland (HMP & YOI)".to_string(),
                },
            ],
            participations: Mutex::new(vec![CourseParticipation {
                id: ParticipationId(Uuid::from_u128(0xd1)),
                prison_number: "A1234AA".to_string(),
                course_name: "Kaizen".to_string(),
                setting: Some(ParticipationSetting {
                    kind: ParticipationSettingKind::Custody,
                    location: Some("Whatton (HMP)".to_string()),
                }),
                outcome: Some(ParticipationOutcome {
                    status: ParticipationOutcomeStatus::Complete,
                    year_started: Some(2018),
                    year_completed: Some(2019),
                }),
                detail: None,
                source: Some("Case notes".to_string()),
                added_by: "SEED".to_string(),
                created_at: Utc::now(),
            }]),
        }
    }

    fn offering_course(&self, offering_id: OfferingId) -> Result<&Course, ApiError> {
        let offering = self
            .offerings
            .iter()
            .find(|offering| offering.id == offering_id)
            .ok_or_else(|| not_found("offering", offering_id))?;
        self.courses
            .iter()
            .find(|course| course.id == offering.course_id)
            .ok_or_else(|| not_found("course", offering.course_id))
    }
}

impl CourseApi for InMemoryCatalogue {
    fn course(&self, id: CourseId) -> Result<Course, ApiError> {
        self.courses
            .iter()
            .find(|course| course.id == id)
            .cloned()
            .ok_or_else(|| not_found("course", id))
    }

    fn course_for_offering(&self, offering_id: OfferingId) -> Result<Course, ApiError> {
        self.offering_course(offering_id).cloned()
    }

    fn offering(&self, id: OfferingId) -> Result<CourseOffering, ApiError> {
        self.offerings
            .iter()
            .find(|offering| offering.id == id)
            .cloned()
            .ok_or_else(|| not_found("offering", id))
    }

    fn offerings_for_course(&self, course_id: CourseId) -> Result<Vec<CourseOffering>, ApiError> {
        Ok(self
            .offerings
            .iter()
            .filter(|offering| offering.course_id == course_id)
            .cloned()
            .collect())
    }

    fn building_choices_courses(&self) -> Result<Vec<Course>, ApiError> {
        Ok(self
            .courses
            .iter()
            .filter(|course| course.building_choices)
            .cloned()
            .collect())
    }

    fn participations(&self, prison_number: &str) -> Result<Vec<CourseParticipation>, ApiError> {
        Ok(lock(&self.participations)
            .iter()
            .filter(|participation| participation.prison_number == prison_number)
            .cloned()
            .collect())
    }

    fn participation(&self, id: ParticipationId) -> Result<CourseParticipation, ApiError> {
        lock(&self.participations)
            .iter()
            .find(|participation| participation.id == id)
            .cloned()
            .ok_or_else(|| not_found("participation", id))
    }

    fn create_participation(
        &self,
        prison_number: &str,
        participation: &CourseParticipationUpdate,
        username: &str,
    ) -> Result<CourseParticipation, ApiError> {
        let created = CourseParticipation {
            id: ParticipationId::new(),
            prison_number: prison_number.to_string(),
            course_name: participation.course_name.trim().to_string(),
            setting: participation.setting.clone(),
            outcome: participation.outcome.clone(),
            detail: participation.detail.clone(),
            source: participation.source.clone(),
            added_by: username.to_string(),
            created_at: Utc::now(),
        };
        lock(&self.participations).push(created.clone());
        Ok(created)
    }

    fn update_participation(
        &self,
        id: ParticipationId,
        participation: &CourseParticipationUpdate,
    ) -> Result<CourseParticipation, ApiError> {
        let mut participations = lock(&self.participations);
        let stored = participations
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or_else(|| not_found("participation", id))?;
        stored.course_name = participation.course_name.trim().to_string();
        stored.setting = participation.setting.clone();
        stored.outcome = participation.outcome.clone();
        stored.detail = participation.detail.clone();
        stored.source = participation.source.clone();
        Ok(stored.clone())
    }

    fn delete_participation(&self, id: ParticipationId) -> Result<(), ApiError> {
        let mut participations = lock(&self.participations);
        let position = participations
            .iter()
            .position(|participation| participation.id == id)
            .ok_or_else(|| not_found("participation", id))?;
        participations.remove(position);
        Ok(())
    }
}

impl OrganisationApi for InMemoryCatalogue {
    fn organisation(&self, id: &str) -> Result<Organisation, ApiError> {
        self.organisations
            .iter()
            .find(|organisation| organisation.id == id)
            .cloned()
            .ok_or_else(|| not_found("organisation", id))
    }
}

/// Prisoner records and their PNI scores, each with the LDC screening result.
pub(crate) struct InMemoryPeople {
    people: Vec<(Person, Option<(ProgrammePathway, bool)>)>,
}

impl InMemoryPeople {
    pub(crate) fn seeded() -> Self {
        let person = |prison_number: &str, first: &str, last: &str, born, release| Person {
            prison_number: prison_number.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            date_of_birth: born,
            prison_name: Some("Whatton (HMP)".to_string()),
            earliest_release_date: release,
        };

        Self {
            people: vec![
                (
                    person("A1234AA", "Del", "Hatton", date(1985, 4, 12), date(2027, 6, 30)),
                    Some((ProgrammePathway::HighIntensityBc, false)),
                ),
                (
                    person("B2345BB", "Ada", "Quill", date(1991, 9, 3), date(2026, 1, 15)),
                    Some((ProgrammePathway::ModerateIntensityBc, true)),
                ),
                (
                    person("C3456CC", "Bea", "Nolan", date(1979, 12, 24), None),
                    Some((ProgrammePathway::MissingInformation, false)),
                ),
                (
                    person("D4567DD", "Eli", "Stone", date(2000, 2, 29), date(2028, 3, 1)),
                    Some((ProgrammePathway::AlternativePathway, false)),
                ),
                (
                    person("E5678EE", "Fay", "Okafor", date(1988, 7, 7), date(2026, 11, 2)),
                    None,
                ),
            ],
        }
    }

    fn find(&self, prison_number: &str) -> Option<&(Person, Option<(ProgrammePathway, bool)>)> {
        self.people
            .iter()
            .find(|(person, _)| person.prison_number.eq_ignore_ascii_case(prison_number))
    }
}

impl PersonApi for InMemoryPeople {
    fn person(&self, prison_number: &str) -> Result<Person, ApiError> {
        self.find(prison_number)
            .map(|(person, _)| person.clone())
            .ok_or_else(|| not_found("person", prison_number))
    }
}

impl PniApi for InMemoryPeople {
    fn pni_score(&self, prison_number: &str) -> Result<PniScore, ApiError> {
        self.find(prison_number)
            .and_then(|(person, score)| {
                score.map(|(programme_pathway, has_ldc)| PniScore {
                    prison_number: person.prison_number.clone(),
                    programme_pathway,
                    has_ldc: Some(has_ldc),
                })
            })
            .ok_or_else(|| not_found("pni score", prison_number))
    }
}

/// Status categories and reasons for the closing statuses.
pub(crate) struct InMemoryReferenceData {
    categories: Vec<ReferralStatusCategory>,
    reasons: Vec<ReferralStatusReason>,
}

impl InMemoryReferenceData {
    pub(crate) fn seeded() -> Self {
        let category = |code: &str, description: &str, status| ReferralStatusCategory {
            code: code.to_string(),
            description: description.to_string(),
            status,
        };
        let reason = |code: &str, description: &str, category_code: &str| ReferralStatusReason {
            code: code.to_string(),
            description: description.to_string(),
            category_code: category_code.to_string(),
        };

        Self {
            categories: vec![
                category("W_ADMIN", "Administrative error", ReferralStatus::Withdrawn),
                category("W_MOTIVATION", "Motivation and behaviour", ReferralStatus::Withdrawn),
                category("W_PERSONAL", "Personal or family reasons", ReferralStatus::Withdrawn),
                category("D_BEHAVIOUR", "Behaviour in sessions", ReferralStatus::Deselected),
                category("D_HEALTH", "Health", ReferralStatus::Deselected),
            ],
            reasons: vec![
                reason("W_ADMIN_DUPLICATE", "Duplicate referral", "W_ADMIN"),
                reason("W_ADMIN_WRONG_PERSON", "Referred the wrong person", "W_ADMIN"),
                reason("W_MOTIVATION_REFUSED", "Does not want to take part", "W_MOTIVATION"),
                reason("W_MOTIVATION_OTHER", "Other", "W_MOTIVATION"),
                reason("D_BEHAVIOUR_DISRUPTIVE", "Disruptive in group", "D_BEHAVIOUR"),
                reason("D_BEHAVIOUR_ATTENDANCE", "Poor attendance", "D_BEHAVIOUR"),
                reason("D_HEALTH_MENTAL", "Mental health", "D_HEALTH"),
            ],
        }
    }

    fn describe(&self, update: &ReferralStatusUpdate) -> (Option<String>, Option<String>) {
        let category = update.category_code.as_deref().and_then(|code| {
            self.categories
                .iter()
                .find(|category| category.code == code)
                .map(|category| category.description.clone())
        });
        let reason = update.reason_code.as_deref().and_then(|code| {
            self.reasons
                .iter()
                .find(|reason| reason.code == code)
                .map(|reason| reason.description.clone())
        });
        (category, reason)
    }
}

impl ReferenceDataApi for InMemoryReferenceData {
    fn status_categories(
        &self,
        status: ReferralStatus,
    ) -> Result<Vec<ReferralStatusCategory>, ApiError> {
        Ok(self
            .categories
            .iter()
            .filter(|category| category.status == status)
            .cloned()
            .collect())
    }

    fn status_reasons(
        &self,
        status: ReferralStatus,
    ) -> Result<Vec<ReferralStatusReason>, ApiError> {
        Ok(self
            .reasons
            .iter()
            .filter(|reason| {
                self.categories.iter().any(|category| {
                    category.status == status && category.code == reason.category_code
                })
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct ReferralRecords {
    referrals: HashMap<ReferralId, Referral>,
    history: HashMap<ReferralId, Vec<ReferralStatusHistoryEntry>>,
}

impl ReferralRecords {
    fn get_mut(&mut self, id: ReferralId) -> Result<&mut Referral, ApiError> {
        self.referrals
            .get_mut(&id)
            .ok_or_else(|| not_found("referral", id))
    }

    fn record(
        &mut self,
        id: ReferralId,
        status: ReferralStatus,
        previous_status: Option<ReferralStatus>,
        username: &str,
    ) -> &mut ReferralStatusHistoryEntry {
        let entries = self.history.entry(id).or_default();
        entries.push(ReferralStatusHistoryEntry {
            status,
            previous_status,
            username: username.to_string(),
            created_at: Utc::now(),
            category_description: None,
            reason_description: None,
            notes: None,
        });
        let last = entries.len() - 1;
        &mut entries[last]
    }
}

/// Referral storage, joined to the catalogue and people for case-list summaries.
pub(crate) struct InMemoryReferrals {
    records: Mutex<ReferralRecords>,
    catalogue: Arc<InMemoryCatalogue>,
    people: Arc<InMemoryPeople>,
    reference_data: Arc<InMemoryReferenceData>,
}

impl InMemoryReferrals {
    pub(crate) fn new(
        catalogue: Arc<InMemoryCatalogue>,
        people: Arc<InMemoryPeople>,
        reference_data: Arc<InMemoryReferenceData>,
    ) -> Self {
        Self {
            records: Mutex::new(ReferralRecords::default()),
            catalogue,
            people,
            reference_data,
        }
    }

    fn summary(&self, referral: &Referral) -> Option<ReferralSummary> {
        let offering = self.catalogue.offering(referral.offering_id).ok()?;
        let course = self.catalogue.offering_course(referral.offering_id).ok()?;
        let person = self.people.person(&referral.prison_number).ok()?;
        Some(ReferralSummary {
            id: referral.id,
            prison_number: referral.prison_number.clone(),
            person_name: person.name(),
            course_name: course.name.clone(),
            audience: course.audience.clone(),
            status: referral.status,
            organisation_id: offering.organisation_id,
            referrer_username: referral.referrer_username.clone(),
            submitted_on: referral.submitted_on.map(|at| at.date_naive()),
            earliest_release_date: person.earliest_release_date,
        })
    }
}

impl ReferralApi for InMemoryReferrals {
    fn referral(&self, id: ReferralId) -> Result<Referral, ApiError> {
        lock(&self.records)
            .referrals
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("referral", id))
    }

    fn create_referral(&self, referral: NewReferral) -> Result<Referral, ApiError> {
        let mut records = lock(&self.records);
        let duplicate = records.referrals.values().any(|existing| {
            existing.offering_id == referral.offering_id
                && existing.prison_number == referral.prison_number
                && existing.status.is_draft()
        });
        if duplicate {
            return Err(ApiError::Conflict(format!(
                "{} already has a draft referral for offering {}",
                referral.prison_number, referral.offering_id
            )));
        }

        let created = Referral {
            id: ReferralId::new(),
            prison_number: referral.prison_number,
            offering_id: referral.offering_id,
            status: ReferralStatus::ReferralStarted,
            reason: None,
            additional_information: None,
            oasys_confirmed: false,
            has_reviewed_programme_history: false,
            has_ldc: referral.has_ldc,
            has_ldc_been_overridden_by_programme_team: false,
            is_override: referral.is_override,
            referrer_override_reason: None,
            referrer_username: referral.referrer_username,
            submitted_on: None,
        };
        records.referrals.insert(created.id, created.clone());
        records.record(
            created.id,
            ReferralStatus::ReferralStarted,
            None,
            &created.referrer_username,
        );
        Ok(created)
    }

    fn update_referral(
        &self,
        id: ReferralId,
        update: &ReferralUpdate,
    ) -> Result<Referral, ApiError> {
        let mut records = lock(&self.records);
        let referral = records.get_mut(id)?;
        update.apply_to(referral);
        Ok(referral.clone())
    }

    fn submit_referral(&self, id: ReferralId, username: &str) -> Result<Referral, ApiError> {
        let mut records = lock(&self.records);
        let referral = records.get_mut(id)?;
        if !referral.is_draft() {
            return Err(ApiError::Conflict(format!("referral {id} already submitted")));
        }
        referral.status = ReferralStatus::ReferralSubmitted;
        referral.submitted_on = Some(Utc::now());
        let submitted = referral.clone();
        records.record(
            id,
            ReferralStatus::ReferralSubmitted,
            Some(ReferralStatus::ReferralStarted),
            username,
        );
        Ok(submitted)
    }

    fn delete_referral(&self, id: ReferralId) -> Result<(), ApiError> {
        let mut records = lock(&self.records);
        records
            .referrals
            .remove(&id)
            .ok_or_else(|| not_found("referral", id))?;
        records.history.remove(&id);
        Ok(())
    }

    fn status_history(&self, id: ReferralId) -> Result<Vec<ReferralStatusHistoryEntry>, ApiError> {
        let records = lock(&self.records);
        if !records.referrals.contains_key(&id) {
            return Err(not_found("referral", id));
        }
        Ok(records.history.get(&id).cloned().unwrap_or_default())
    }

    fn update_status(
        &self,
        id: ReferralId,
        expected: ReferralStatus,
        update: &ReferralStatusUpdate,
        username: &str,
    ) -> Result<(), ApiError> {
        let (category, reason) = self.reference_data.describe(update);
        let mut records = lock(&self.records);
        let referral = records.get_mut(id)?;
        let previous = referral.status;
        if previous != expected {
            return Err(status_conflict(id, expected, previous));
        }
        referral.status = update.status;

        let entry = records.record(id, update.status, Some(previous), username);
        entry.category_description = category;
        entry.reason_description = reason;
        entry.notes = update.reason_information.clone();
        Ok(())
    }

    fn transfer(
        &self,
        id: ReferralId,
        expected: ReferralStatus,
        offering_id: OfferingId,
        transfer_reason: &str,
        username: &str,
    ) -> Result<Referral, ApiError> {
        self.catalogue.offering(offering_id)?;
        let mut records = lock(&self.records);
        let original = records.get_mut(id)?;
        if original.status != expected {
            return Err(status_conflict(id, expected, original.status));
        }
        if original.offering_id == offering_id {
            return Err(ApiError::Conflict(format!(
                "referral {id} is already on offering {offering_id}"
            )));
        }
        let previous = original.status;
        original.status = ReferralStatus::Transferred;

        let mut moved = original.clone();
        moved.id = ReferralId::new();
        moved.offering_id = offering_id;
        moved.status = ReferralStatus::ReferralSubmitted;
        moved.submitted_on = Some(Utc::now());
        moved.is_override = false;
        moved.referrer_override_reason = None;
        records.referrals.insert(moved.id, moved.clone());

        records
            .record(id, ReferralStatus::Transferred, Some(previous), username)
            .notes = Some(transfer_reason.to_string());
        records.record(moved.id, ReferralStatus::ReferralSubmitted, None, username);
        Ok(moved)
    }

    fn summaries(&self, scope: &CaseListScope) -> Result<Vec<ReferralSummary>, ApiError> {
        let referrals: Vec<Referral> = lock(&self.records)
            .referrals
            .values()
            .filter(|referral| match scope {
                CaseListScope::Referrer { username } => referral.referrer_username == *username,
                CaseListScope::ProgrammeTeam => !referral.is_draft(),
            })
            .cloned()
            .collect();

        let mut summaries: Vec<ReferralSummary> = referrals
            .iter()
            .filter_map(|referral| self.summary(referral))
            .collect();
        summaries.sort_by(|a, b| b.submitted_on.cmp(&a.submitted_on));
        Ok(summaries)
    }
}

fn status_conflict(id: ReferralId, expected: ReferralStatus, actual: ReferralStatus) -> ApiError {
    ApiError::Conflict(format!(
        "referral {id} is {}, not {}",
        actual.code(),
        expected.code()
    ))
}

/// The seeded in-memory upstreams used for local runs.
pub(crate) fn in_memory_upstreams() -> Upstreams {
    let catalogue = Arc::new(InMemoryCatalogue::seeded());
    let people = Arc::new(InMemoryPeople::seeded());
    let reference_data = Arc::new(InMemoryReferenceData::seeded());
    let referrals = Arc::new(InMemoryReferrals::new(
        catalogue.clone(),
        people.clone(),
        reference_data.clone(),
    ));

    Upstreams {
        referrals,
        people: people.clone(),
        courses: catalogue.clone(),
        pni: people,
        reference_data,
        organisations: catalogue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn referrals() -> InMemoryReferrals {
        InMemoryReferrals::new(
            Arc::new(InMemoryCatalogue::seeded()),
            Arc::new(InMemoryPeople::seeded()),
            Arc::new(InMemoryReferenceData::seeded()),
        )
    }

    fn new_referral() -> NewReferral {
        NewReferral {
            offering_id: seed::THINKING_SKILLS_WHATTON,
            prison_number: "A1234AA".to_string(),
            referrer_username: "REFERRER_USER".to_string(),
            is_override: false,
            has_ldc: None,
        }
    }

    #[test]
    fn second_draft_for_the_same_offering_conflicts() {
        let referrals = referrals();
        referrals.create_referral(new_referral()).expect("first draft");
        assert!(matches!(
            referrals.create_referral(new_referral()),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn status_updates_are_described_in_history() {
        let referrals = referrals();
        let referral = referrals.create_referral(new_referral()).expect("draft");
        referrals
            .submit_referral(referral.id, "REFERRER_USER")
            .expect("submitted");
        referrals
            .update_status(
                referral.id,
                ReferralStatus::ReferralSubmitted,
                &ReferralStatusUpdate {
                    status: ReferralStatus::Withdrawn,
                    category_code: Some("W_ADMIN".to_string()),
                    reason_code: Some("W_ADMIN_DUPLICATE".to_string()),
                    reason_information: Some("raised twice".to_string()),
                },
                "REFERRER_USER",
            )
            .expect("withdrawn");

        let history = referrals.status_history(referral.id).expect("history");
        assert_eq!(history.len(), 3);
        let last = &history[2];
        assert_eq!(last.previous_status, Some(ReferralStatus::ReferralSubmitted));
        assert_eq!(last.category_description.as_deref(), Some("Administrative error"));
        assert_eq!(last.reason_description.as_deref(), Some("Duplicate referral"));
        assert_eq!(last.notes.as_deref(), Some("raised twice"));
    }

    #[test]
    fn status_update_from_a_stale_status_conflicts() {
        let referrals = referrals();
        let referral = referrals.create_referral(new_referral()).expect("draft");
        referrals
            .submit_referral(referral.id, "REFERRER_USER")
            .expect("submitted");
        let update = ReferralStatusUpdate {
            status: ReferralStatus::AwaitingAssessment,
            category_code: None,
            reason_code: None,
            reason_information: Some("ready".to_string()),
        };

        assert!(matches!(
            referrals.update_status(
                referral.id,
                ReferralStatus::ReferralStarted,
                &update,
                "PT_USER"
            ),
            Err(ApiError::Conflict(_))
        ));
        assert_eq!(
            referrals.referral(referral.id).expect("stored").status,
            ReferralStatus::ReferralSubmitted
        );
        assert!(matches!(
            referrals.transfer(
                referral.id,
                ReferralStatus::AwaitingAssessment,
                seed::HORIZON_MOORLAND,
                "moving",
                "PT_USER",
            ),
            Err(ApiError::Conflict(_))
        ));
        assert_eq!(referrals.status_history(referral.id).expect("history").len(), 2);
    }

    #[test]
    fn programme_team_scope_excludes_drafts() {
        let referrals = referrals();
        let draft = referrals.create_referral(new_referral()).expect("draft");
        assert!(referrals
            .summaries(&CaseListScope::ProgrammeTeam)
            .expect("summaries")
            .is_empty());

        let mine = referrals
            .summaries(&CaseListScope::Referrer {
                username: "REFERRER_USER".to_string(),
            })
            .expect("summaries");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, draft.id);
        assert_eq!(mine[0].person_name, "Del Hatton");
    }

    #[test]
    fn person_without_a_score_has_no_pni() {
        let people = InMemoryPeople::seeded();
        assert!(people.person("e5678ee").is_ok());
        assert!(people.pni_score("E5678EE").expect_err("no score").is_not_found());

        let screened = people.pni_score("b2345bb").expect("score");
        assert_eq!(screened.prison_number, "B2345BB");
        assert_eq!(screened.has_ldc, Some(true));
    }
}
