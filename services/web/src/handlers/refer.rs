use accredited_programmes::error::AppError;
use accredited_programmes::format::{govuk_date, optional_date};
use accredited_programmes::paths::{
    refer, with_query, OfferingParams, ParticipationParams, PathTemplate, PersonParams,
    ReferralParams,
};
use accredited_programmes::session::Flash;
use accredited_programmes::workflows::referrals::{
    CaseListQuery, CaseListScope, CheckAnswers, CourseParticipation, CourseParticipationUpdate,
    OfferingId, ParticipationId, ParticipationOutcome, ParticipationOutcomeStatus,
    ParticipationSetting, ParticipationSettingKind, Person, PniContent, ReferralContext,
    ReferralId, ReferralServiceError, TaskList,
};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Form, Json};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::find::CourseCard;
use super::{checked, not_found, parse_id, rejected, see_other, text, PageResult};
use crate::auth::Identity;
use crate::infra::WebState;
use crate::session::Session;

/// The referral with its person and course, provided it is still a draft.
fn draft_context(state: &WebState, id: ReferralId) -> Result<ReferralContext, AppError> {
    let context = state.service.context(id)?;
    if context.referral.is_draft() {
        Ok(context)
    } else {
        Err(not_found(id))
    }
}

fn task_list_href(id: ReferralId) -> Result<String, AppError> {
    Ok(refer::TASK_LIST.build(&id.into())?)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReferralHeader {
    pub(crate) referral_id: ReferralId,
    pub(crate) person_name: String,
    pub(crate) prison_number: String,
    pub(crate) course_name: String,
}

impl From<&ReferralContext> for ReferralHeader {
    fn from(context: &ReferralContext) -> Self {
        Self {
            referral_id: context.referral.id,
            person_name: context.person.name(),
            prison_number: context.person.prison_number.clone(),
            course_name: context.course.display_name(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonSearchView {
    pub(crate) course: CourseCard,
    pub(crate) organisation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) prison_number: Option<String>,
    pub(crate) flash: Flash,
}

pub(crate) async fn person_search(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(offering_id): Path<String>,
) -> PageResult {
    let offering_id: OfferingId = parse_id(&offering_id)?;
    let (offering, course) = state.service.offering(offering_id)?;
    if !offering.referable {
        return Err(AppError::NotFound(format!("offering {offering_id}")));
    }
    let organisation = state
        .service
        .upstreams()
        .organisations
        .organisation(&offering.organisation_id)?;

    let flash = session.take_flash();
    let prison_number = flash.values.get("prisonNumber").cloned().or_else(|| {
        session.read(|data| {
            data.pni_find_and_refer_data
                .as_ref()
                .map(|found| found.prison_number.clone())
        })
    });

    Ok(Json(PersonSearchView {
        course: CourseCard::from(&course),
        organisation: organisation.name,
        prison_number,
        flash,
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonSearchForm {
    #[serde(default)]
    pub(crate) prison_number: Option<String>,
}

pub(crate) async fn submit_person_search(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(offering_id): Path<String>,
    Form(form): Form<PersonSearchForm>,
) -> PageResult {
    let offering_id: OfferingId = parse_id(&offering_id)?;
    let raw = form.prison_number.unwrap_or_default();
    match state.service.find_person(&raw) {
        Ok(person) => Ok(see_other(&refer::PERSON.build(&PersonParams {
            offering_id,
            prison_number: person.prison_number,
        })?)),
        Err(err) => {
            let back = refer::PERSON_SEARCH.build(&OfferingParams { offering_id })?;
            rejected(&identity, &session, err, &back, &[("prisonNumber", raw.as_str())])
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PersonQuery {
    #[serde(default, rename = "override")]
    pub(crate) overriding: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonDetails {
    pub(crate) name: String,
    pub(crate) prison_number: String,
    pub(crate) date_of_birth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) prison_name: Option<String>,
    pub(crate) earliest_release_date: String,
}

impl From<&Person> for PersonDetails {
    fn from(person: &Person) -> Self {
        Self {
            name: person.name(),
            prison_number: person.prison_number.clone(),
            date_of_birth: optional_date(person.date_of_birth),
            prison_name: person.prison_name.clone(),
            earliest_release_date: optional_date(person.earliest_release_date),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfirmPersonView {
    pub(crate) person: PersonDetails,
    pub(crate) course: CourseCard,
    pub(crate) organisation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) pni: Option<PniContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) override_href: Option<String>,
    pub(crate) offering_id: OfferingId,
    pub(crate) create_action: &'static str,
}

pub(crate) async fn confirm_person(
    State(state): State<WebState>,
    Path((offering_id, prison_number)): Path<(String, String)>,
    Query(query): Query<PersonQuery>,
) -> PageResult {
    let offering_id: OfferingId = parse_id(&offering_id)?;
    let person = match state.service.find_person(&prison_number) {
        Ok(person) => person,
        Err(ReferralServiceError::PersonNotFound(missing)) => {
            return Err(AppError::NotFound(format!("person {missing}")))
        }
        Err(err) => return Err(err.into()),
    };
    let (offering, course) = state.service.offering(offering_id)?;
    let organisation = state
        .service
        .upstreams()
        .organisations
        .organisation(&offering.organisation_id)?;

    let overriding = query.overriding.unwrap_or(false);
    let pni = if course.building_choices {
        Some(
            state
                .service
                .pni_content(&person.prison_number, &course, overriding)?,
        )
    } else {
        None
    };

    let override_href = match &pni {
        Some(content) if content.override_offered => {
            let path = refer::PERSON.build(&PersonParams {
                offering_id,
                prison_number: person.prison_number.clone(),
            })?;
            Some(with_query(&path, [("override", Some("true".to_string()))]))
        }
        _ => None,
    };

    Ok(Json(ConfirmPersonView {
        person: PersonDetails::from(&person),
        course: CourseCard::from(&course),
        organisation: organisation.name,
        pni,
        override_href,
        offering_id,
        create_action: refer::CREATE.pattern(),
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateReferralForm {
    #[serde(default)]
    pub(crate) offering_id: Option<String>,
    #[serde(default)]
    pub(crate) prison_number: Option<String>,
}

pub(crate) async fn create(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Form(form): Form<CreateReferralForm>,
) -> PageResult {
    let offering_id: OfferingId = parse_id(text(&form.offering_id).unwrap_or_default())?;
    let prison_number = form.prison_number.unwrap_or_default();

    match state
        .service
        .start_referral(offering_id, &prison_number, &identity.username)
    {
        Ok(referral) => {
            session.with(|data| data.pni_find_and_refer_data = None);
            Ok(see_other(&task_list_href(referral.id)?))
        }
        Err(err) => {
            let back = refer::PERSON_SEARCH.build(&OfferingParams { offering_id })?;
            rejected(
                &identity,
                &session,
                err,
                &back,
                &[("prisonNumber", prison_number.as_str())],
            )
        }
    }
}

pub(crate) async fn case_list(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Query(query): Query<CaseListQuery>,
) -> PageResult {
    let scope = CaseListScope::Referrer {
        username: identity.username.clone(),
    };
    let list = state.service.case_list(
        &scope,
        query,
        refer::CASE_LIST.pattern(),
        state.page_size,
        |summary| {
            let params = ReferralParams::from(summary.id);
            if summary.status.is_draft() {
                refer::TASK_LIST.build(&params)
            } else {
                refer::STATUS_HISTORY.build(&params)
            }
        },
    )?;

    let current = list.current_path.clone();
    session.with(|data| data.remember_case_list(refer::CASE_LIST.pattern(), current));
    Ok(Json(list).into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskListView {
    #[serde(flatten)]
    pub(crate) header: ReferralHeader,
    pub(crate) organisation: String,
    pub(crate) is_override: bool,
    pub(crate) task_list: TaskList,
    pub(crate) delete_href: String,
    pub(crate) flash: Flash,
}

pub(crate) async fn task_list(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let context = state.service.context(id)?;
    if !context.referral.is_draft() {
        return Ok(see_other(&refer::STATUS_HISTORY.build(&id.into())?));
    }

    let organisation = state
        .service
        .upstreams()
        .organisations
        .organisation(&context.offering.organisation_id)?;

    Ok(Json(TaskListView {
        header: ReferralHeader::from(&context),
        organisation: organisation.name,
        is_override: context.referral.is_override,
        task_list: TaskList::build(&context.referral)?,
        delete_href: refer::DELETE.build(&id.into())?,
        flash: session.take_flash(),
    })
    .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonalDetailsView {
    pub(crate) referral_id: ReferralId,
    pub(crate) person: PersonDetails,
    pub(crate) back_href: String,
}

pub(crate) async fn personal_details(
    State(state): State<WebState>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let context = draft_context(&state, id)?;
    Ok(Json(PersonalDetailsView {
        referral_id: id,
        person: PersonDetails::from(&context.person),
        back_href: task_list_href(id)?,
    })
    .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParticipationRow {
    pub(crate) course_name: String,
    pub(crate) setting: String,
    pub(crate) outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) source: Option<String>,
    pub(crate) added_by: String,
    pub(crate) added_on: String,
    pub(crate) change_href: String,
    pub(crate) delete_href: String,
}

fn setting_text(setting: Option<&ParticipationSetting>) -> String {
    match setting {
        None => "Not known".to_string(),
        Some(setting) => {
            let kind = match setting.kind {
                ParticipationSettingKind::Custody => "Custody",
                ParticipationSettingKind::Community => "Community",
            };
            match &setting.location {
                Some(location) => format!("{kind} ({location})"),
                None => kind.to_string(),
            }
        }
    }
}

fn outcome_text(outcome: Option<&ParticipationOutcome>) -> String {
    let Some(outcome) = outcome else {
        return "Not known".to_string();
    };
    let status = match outcome.status {
        ParticipationOutcomeStatus::Complete => "Complete",
        ParticipationOutcomeStatus::Incomplete => "Incomplete",
    };
    match (outcome.year_started, outcome.year_completed) {
        (_, Some(completed)) => format!("{status}, {completed}"),
        (Some(started), None) => format!("{status}, started {started}"),
        (None, None) => status.to_string(),
    }
}

fn participation_row(
    referral_id: ReferralId,
    participation: &CourseParticipation,
) -> Result<ParticipationRow, AppError> {
    let params = ParticipationParams {
        referral_id,
        participation_id: participation.id,
    };
    Ok(ParticipationRow {
        course_name: participation.course_name.clone(),
        setting: setting_text(participation.setting.as_ref()),
        outcome: outcome_text(participation.outcome.as_ref()),
        detail: participation.detail.clone(),
        source: participation.source.clone(),
        added_by: participation.added_by.clone(),
        added_on: govuk_date(participation.created_at.date_naive()),
        change_href: refer::PARTICIPATION.build(&params)?,
        delete_href: refer::PARTICIPATION_DELETE.build(&params)?,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgrammeHistoryView {
    pub(crate) referral_id: ReferralId,
    pub(crate) reviewed: bool,
    pub(crate) participations: Vec<ParticipationRow>,
    pub(crate) add_href: String,
    pub(crate) review_action: String,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

pub(crate) async fn programme_history(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let (referral, participations) = state.service.participations(id)?;
    let params = ReferralParams::from(id);

    Ok(Json(ProgrammeHistoryView {
        referral_id: id,
        reviewed: referral.has_reviewed_programme_history,
        participations: participations
            .iter()
            .map(|participation| participation_row(id, participation))
            .collect::<Result<_, _>>()?,
        add_href: refer::PARTICIPATION_NEW.build(&params)?,
        review_action: refer::PROGRAMME_HISTORY_REVIEW.build(&params)?,
        back_href: task_list_href(id)?,
        flash: session.take_flash(),
    })
    .into_response())
}

pub(crate) async fn review_programme_history(
    State(state): State<WebState>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    state.service.mark_programme_history_reviewed(id)?;
    Ok(see_other(&task_list_href(id)?))
}

/// Programme history form fields as posted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParticipationForm {
    #[serde(default)]
    pub(crate) course_name: Option<String>,
    #[serde(default)]
    pub(crate) setting: Option<String>,
    #[serde(default)]
    pub(crate) location: Option<String>,
    #[serde(default)]
    pub(crate) outcome: Option<String>,
    #[serde(default)]
    pub(crate) year_started: Option<String>,
    #[serde(default)]
    pub(crate) year_completed: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
    #[serde(default)]
    pub(crate) source: Option<String>,
}

const YEAR_FORMAT: &str = "Enter a year in the format YYYY, for example 2019";

fn year(
    value: &Option<String>,
    field: &'static str,
) -> Result<Option<i32>, (&'static str, &'static str)> {
    let Some(raw) = text(value) else {
        return Ok(None);
    };
    match raw.parse::<i32>() {
        Ok(year) if (1990..=Utc::now().year()).contains(&year) => Ok(Some(year)),
        _ => Err((field, YEAR_FORMAT)),
    }
}

impl ParticipationForm {
    fn values(&self) -> Vec<(&'static str, &str)> {
        [
            ("courseName", &self.course_name),
            ("setting", &self.setting),
            ("location", &self.location),
            ("outcome", &self.outcome),
            ("yearStarted", &self.year_started),
            ("yearCompleted", &self.year_completed),
            ("detail", &self.detail),
            ("source", &self.source),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
        .collect()
    }

    fn update(&self) -> Result<CourseParticipationUpdate, (&'static str, &'static str)> {
        let setting = match text(&self.setting) {
            None => None,
            Some("custody") => Some(ParticipationSettingKind::Custody),
            Some("community") => Some(ParticipationSettingKind::Community),
            Some(_) => return Err(("setting", "Select custody or community")),
        }
        .map(|kind| ParticipationSetting {
            kind,
            location: text(&self.location).map(str::to_string),
        });

        let year_started = year(&self.year_started, "yearStarted")?;
        let year_completed = year(&self.year_completed, "yearCompleted")?;
        let outcome = match text(&self.outcome) {
            None => None,
            Some("complete") => Some(ParticipationOutcomeStatus::Complete),
            Some("incomplete") => Some(ParticipationOutcomeStatus::Incomplete),
            Some(_) => return Err(("outcome", "Select complete or incomplete")),
        }
        .map(|status| ParticipationOutcome {
            status,
            year_started,
            year_completed,
        });

        Ok(CourseParticipationUpdate {
            course_name: text(&self.course_name).unwrap_or_default().to_string(),
            setting,
            outcome,
            detail: text(&self.detail).map(str::to_string),
            source: text(&self.source).map(str::to_string),
        })
    }
}

fn form_values(participation: &CourseParticipation) -> Vec<(&'static str, String)> {
    let mut values = vec![("courseName", participation.course_name.clone())];
    if let Some(setting) = &participation.setting {
        let kind = match setting.kind {
            ParticipationSettingKind::Custody => "custody",
            ParticipationSettingKind::Community => "community",
        };
        values.push(("setting", kind.to_string()));
        if let Some(location) = &setting.location {
            values.push(("location", location.clone()));
        }
    }
    if let Some(outcome) = &participation.outcome {
        let status = match outcome.status {
            ParticipationOutcomeStatus::Complete => "complete",
            ParticipationOutcomeStatus::Incomplete => "incomplete",
        };
        values.push(("outcome", status.to_string()));
        if let Some(started) = outcome.year_started {
            values.push(("yearStarted", started.to_string()));
        }
        if let Some(completed) = outcome.year_completed {
            values.push(("yearCompleted", completed.to_string()));
        }
    }
    if let Some(detail) = &participation.detail {
        values.push(("detail", detail.clone()));
    }
    if let Some(source) = &participation.source {
        values.push(("source", source.clone()));
    }
    values
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParticipationFormView {
    pub(crate) referral_id: ReferralId,
    pub(crate) form_action: String,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

pub(crate) async fn new_participation(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    state.service.draft(id)?;
    let params = ReferralParams::from(id);
    Ok(Json(ParticipationFormView {
        referral_id: id,
        form_action: refer::PARTICIPATION_NEW.build(&params)?,
        back_href: refer::PROGRAMME_HISTORY.build(&params)?,
        flash: session.take_flash(),
    })
    .into_response())
}

fn participation_rejected(
    session: &Session,
    form: &ParticipationForm,
    field: &str,
    message: &str,
    back: &str,
) -> PageResult {
    session.flash_error(field, message, &form.values());
    Ok(see_other(back))
}

pub(crate) async fn add_participation(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<ParticipationForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let params = ReferralParams::from(id);
    let back = refer::PARTICIPATION_NEW.build(&params)?;
    let update = match form.update() {
        Ok(update) => update,
        Err((field, message)) => {
            return participation_rejected(&session, &form, field, message, &back)
        }
    };

    match state
        .service
        .add_participation(id, update, &identity.username)
    {
        Ok(participation) => {
            session.flash_success(format!(
                "You have added a programme: {}",
                participation.course_name
            ));
            Ok(see_other(&refer::PROGRAMME_HISTORY.build(&params)?))
        }
        Err(err) => rejected(&identity, &session, err, &back, &form.values()),
    }
}

fn participation_ids(raw: &(String, String)) -> Result<(ReferralId, ParticipationId), AppError> {
    Ok((parse_id(&raw.0)?, parse_id(&raw.1)?))
}

pub(crate) async fn edit_participation(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(raw): Path<(String, String)>,
) -> PageResult {
    let (id, participation_id) = participation_ids(&raw)?;
    let participation = state.service.participation(id, participation_id)?;

    let mut flash = session.take_flash();
    if flash.errors.is_empty() {
        for (name, value) in form_values(&participation) {
            flash.value(name, value);
        }
    }

    Ok(Json(ParticipationFormView {
        referral_id: id,
        form_action: refer::PARTICIPATION.build(&ParticipationParams {
            referral_id: id,
            participation_id,
        })?,
        back_href: refer::PROGRAMME_HISTORY.build(&id.into())?,
        flash,
    })
    .into_response())
}

pub(crate) async fn update_participation(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(raw): Path<(String, String)>,
    Form(form): Form<ParticipationForm>,
) -> PageResult {
    let (id, participation_id) = participation_ids(&raw)?;
    let back = refer::PARTICIPATION.build(&ParticipationParams {
        referral_id: id,
        participation_id,
    })?;
    let update = match form.update() {
        Ok(update) => update,
        Err((field, message)) => {
            return participation_rejected(&session, &form, field, message, &back)
        }
    };

    match state
        .service
        .update_participation(id, participation_id, update)
    {
        Ok(participation) => {
            session.flash_success(format!(
                "You have updated a programme: {}",
                participation.course_name
            ));
            Ok(see_other(&refer::PROGRAMME_HISTORY.build(&id.into())?))
        }
        Err(err) => rejected(&identity, &session, err, &back, &form.values()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteParticipationView {
    pub(crate) referral_id: ReferralId,
    pub(crate) participation: ParticipationRow,
    pub(crate) back_href: String,
}

pub(crate) async fn delete_participation_page(
    State(state): State<WebState>,
    Path(raw): Path<(String, String)>,
) -> PageResult {
    let (id, participation_id) = participation_ids(&raw)?;
    let participation = state.service.participation(id, participation_id)?;
    Ok(Json(DeleteParticipationView {
        referral_id: id,
        participation: participation_row(id, &participation)?,
        back_href: refer::PROGRAMME_HISTORY.build(&id.into())?,
    })
    .into_response())
}

pub(crate) async fn delete_participation(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(raw): Path<(String, String)>,
) -> PageResult {
    let (id, participation_id) = participation_ids(&raw)?;
    state.service.delete_participation(id, participation_id)?;
    session.flash_success("You have removed a programme");
    Ok(see_other(&refer::PROGRAMME_HISTORY.build(&id.into())?))
}

/// A single-question page: a text area, a checkbox or the override justification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionView {
    #[serde(flatten)]
    pub(crate) header: ReferralHeader,
    pub(crate) field: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) pni: Option<PniContent>,
    pub(crate) form_action: String,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

fn question(
    context: &ReferralContext,
    session: &Session,
    field: &'static str,
    saved: Option<String>,
    action: PathTemplate<ReferralParams>,
) -> Result<QuestionView, AppError> {
    let id = context.referral.id;
    let flash = session.take_flash();
    let value = flash.values.get(field).cloned().or(saved);
    Ok(QuestionView {
        header: ReferralHeader::from(context),
        field,
        value,
        pni: None,
        form_action: action.build(&id.into())?,
        back_href: task_list_href(id)?,
        flash,
    })
}

pub(crate) async fn confirm_oasys(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let context = draft_context(&state, parse_id(&referral_id)?)?;
    let saved = context.referral.oasys_confirmed.then(|| "true".to_string());
    let view = question(&context, &session, "oasysConfirmed", saved, refer::CONFIRM_OASYS)?;
    Ok(Json(view).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OasysForm {
    #[serde(default)]
    pub(crate) oasys_confirmed: Option<String>,
}

pub(crate) async fn submit_confirm_oasys(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<OasysForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    match state.service.confirm_oasys(id, checked(&form.oasys_confirmed)) {
        Ok(_) => Ok(see_other(&task_list_href(id)?)),
        Err(err) => {
            let back = refer::CONFIRM_OASYS.build(&id.into())?;
            rejected(&identity, &session, err, &back, &[])
        }
    }
}

pub(crate) async fn reason(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let context = draft_context(&state, parse_id(&referral_id)?)?;
    let saved = context.referral.reason.clone();
    let view = question(&context, &session, "reason", saved, refer::REASON)?;
    Ok(Json(view).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReasonForm {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

pub(crate) async fn submit_reason(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<ReasonForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    match state.service.save_reason(id, form.reason.as_deref()) {
        Ok(_) => Ok(see_other(&task_list_href(id)?)),
        Err(err) => {
            let back = refer::REASON.build(&id.into())?;
            let value = form.reason.as_deref().unwrap_or_default();
            rejected(&identity, &session, err, &back, &[("reason", value)])
        }
    }
}

pub(crate) async fn additional_information(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let context = draft_context(&state, parse_id(&referral_id)?)?;
    let saved = context.referral.additional_information.clone();
    let view = question(
        &context,
        &session,
        "additionalInformation",
        saved,
        refer::ADDITIONAL_INFORMATION,
    )?;
    Ok(Json(view).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdditionalInformationForm {
    #[serde(default)]
    pub(crate) additional_information: Option<String>,
}

pub(crate) async fn submit_additional_information(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<AdditionalInformationForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let information = form.additional_information.as_deref();
    match state.service.save_additional_information(id, information) {
        Ok(_) => Ok(see_other(&task_list_href(id)?)),
        Err(err) => {
            let back = refer::ADDITIONAL_INFORMATION.build(&id.into())?;
            let values = [("additionalInformation", information.unwrap_or_default())];
            rejected(&identity, &session, err, &back, &values)
        }
    }
}

pub(crate) async fn override_reason(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let context = draft_context(&state, id)?;
    if !context.referral.is_override {
        return Err(not_found(id));
    }

    let saved = context.referral.referrer_override_reason.clone();
    let mut view = question(
        &context,
        &session,
        "referrerOverrideReason",
        saved,
        refer::OVERRIDE_REASON,
    )?;
    view.pni = Some(
        state
            .service
            .pni_content(&context.person.prison_number, &context.course, true)?,
    );
    Ok(Json(view).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OverrideReasonForm {
    #[serde(default)]
    pub(crate) referrer_override_reason: Option<String>,
}

pub(crate) async fn submit_override_reason(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<OverrideReasonForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let reason = form.referrer_override_reason.as_deref();
    match state.service.save_override_reason(id, reason) {
        Ok(_) => Ok(see_other(&task_list_href(id)?)),
        Err(err) => {
            let back = refer::OVERRIDE_REASON.build(&id.into())?;
            let values = [("referrerOverrideReason", reason.unwrap_or_default())];
            rejected(&identity, &session, err, &back, &values)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckAnswersView {
    #[serde(flatten)]
    pub(crate) header: ReferralHeader,
    #[serde(flatten)]
    pub(crate) answers: CheckAnswers,
    pub(crate) submit_action: String,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

pub(crate) async fn check_answers(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let (context, answers) = state.service.check_answers(id)?;
    if !TaskList::build(&context.referral)?.ready_to_submit {
        return Ok(see_other(&task_list_href(id)?));
    }

    Ok(Json(CheckAnswersView {
        header: ReferralHeader::from(&context),
        answers,
        submit_action: refer::SUBMIT.build(&id.into())?,
        back_href: task_list_href(id)?,
        flash: session.take_flash(),
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitForm {
    #[serde(default)]
    pub(crate) confirmation: Option<String>,
}

pub(crate) async fn submit(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<SubmitForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    match state.service.submit(
        id,
        checked(&form.confirmation),
        &identity.roles,
        &identity.username,
    ) {
        Ok(_) => Ok(see_other(&refer::COMPLETE.build(&id.into())?)),
        Err(err) => {
            let back = refer::CHECK_ANSWERS.build(&id.into())?;
            rejected(&identity, &session, err, &back, &[])
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompleteView {
    pub(crate) referral_id: ReferralId,
    pub(crate) heading: &'static str,
    pub(crate) status_history_href: String,
    pub(crate) case_list_href: String,
}

pub(crate) async fn complete(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let referral = state.service.referral(id)?;
    if referral.is_draft() {
        return Ok(see_other(&task_list_href(id)?));
    }

    let case_list_href =
        session.read(|data| data.back_to_case_list(refer::CASE_LIST.pattern()).to_string());
    Ok(Json(CompleteView {
        referral_id: id,
        heading: "Referral complete",
        status_history_href: refer::STATUS_HISTORY.build(&id.into())?,
        case_list_href,
    })
    .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteDraftView {
    #[serde(flatten)]
    pub(crate) header: ReferralHeader,
    pub(crate) delete_action: String,
    pub(crate) back_href: String,
}

pub(crate) async fn delete_page(
    State(state): State<WebState>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let context = draft_context(&state, id)?;
    Ok(Json(DeleteDraftView {
        header: ReferralHeader::from(&context),
        delete_action: refer::DELETE.build(&id.into())?,
        back_href: task_list_href(id)?,
    })
    .into_response())
}

pub(crate) async fn delete(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let context = draft_context(&state, id)?;
    state.service.delete_draft(id)?;
    session.flash_success(format!(
        "Draft referral for {} deleted",
        context.person.name()
    ));
    let back = session.read(|data| data.back_to_case_list(refer::CASE_LIST.pattern()).to_string());
    Ok(see_other(&back))
}
