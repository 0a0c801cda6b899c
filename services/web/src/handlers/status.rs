//! Status-change wizard and status history, shared by the refer and assess journeys.
//!
//! The wizard keeps a [`StatusUpdateDraft`] in the session under `referralStatusUpdateData`
//! and only calls the referrals API once, from the reason-information step.

use accredited_programmes::paths::{
    assess, refer, NoParams, PathError, PathTemplate, ReferralParams,
};
use accredited_programmes::session::Flash;
use accredited_programmes::workflows::referrals::withdrawal::{
    category_radios, reason_radios, REASON_INFORMATION_MAX_LENGTH,
};
use accredited_programmes::workflows::referrals::{
    authorize_transition, RadioEntry, Referral, ReferralId, ReferralServiceError, ReferralStatus,
    StatusUpdateDraft, TimelineEntry, TransitionError, WizardError, WizardStep,
};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{forbidden, parse_id, rejected, see_other, PageResult};
use crate::auth::Identity;
use crate::infra::WebState;
use crate::session::Session;

/// URLs one journey uses for status changes.
pub(crate) trait StatusJourney: Send + Sync + 'static {
    const CASE_LIST: PathTemplate<NoParams>;
    const HISTORY: PathTemplate<ReferralParams>;
    const WITHDRAW: PathTemplate<ReferralParams>;
    const CATEGORY: PathTemplate<ReferralParams>;
    const REASON: PathTemplate<ReferralParams>;
    const REASON_INFORMATION: PathTemplate<ReferralParams>;
    const UPDATE_STATUS: Option<PathTemplate<ReferralParams>>;
    const TRANSFER: Option<PathTemplate<ReferralParams>>;
    const UPDATE_LDC: Option<PathTemplate<ReferralParams>>;

    fn step(step: WizardStep, referral_id: ReferralId) -> Result<String, PathError> {
        let template = match step {
            WizardStep::Category => Self::CATEGORY,
            WizardStep::Reason => Self::REASON,
            WizardStep::ReasonInformation => Self::REASON_INFORMATION,
        };
        template.build(&referral_id.into())
    }

    fn history(referral_id: ReferralId) -> Result<String, PathError> {
        Self::HISTORY.build(&referral_id.into())
    }
}

pub(crate) struct Refer;

impl StatusJourney for Refer {
    const CASE_LIST: PathTemplate<NoParams> = refer::CASE_LIST;
    const HISTORY: PathTemplate<ReferralParams> = refer::STATUS_HISTORY;
    const WITHDRAW: PathTemplate<ReferralParams> = refer::WITHDRAW;
    const CATEGORY: PathTemplate<ReferralParams> = refer::STATUS_CATEGORY;
    const REASON: PathTemplate<ReferralParams> = refer::STATUS_REASON;
    const REASON_INFORMATION: PathTemplate<ReferralParams> = refer::STATUS_REASON_INFORMATION;
    const UPDATE_STATUS: Option<PathTemplate<ReferralParams>> = None;
    const TRANSFER: Option<PathTemplate<ReferralParams>> = None;
    const UPDATE_LDC: Option<PathTemplate<ReferralParams>> = None;
}

pub(crate) struct Assess;

impl StatusJourney for Assess {
    const CASE_LIST: PathTemplate<NoParams> = assess::CASE_LIST;
    const HISTORY: PathTemplate<ReferralParams> = assess::STATUS_HISTORY;
    const WITHDRAW: PathTemplate<ReferralParams> = assess::WITHDRAW;
    const CATEGORY: PathTemplate<ReferralParams> = assess::STATUS_CATEGORY;
    const REASON: PathTemplate<ReferralParams> = assess::STATUS_REASON;
    const REASON_INFORMATION: PathTemplate<ReferralParams> = assess::STATUS_REASON_INFORMATION;
    const UPDATE_STATUS: Option<PathTemplate<ReferralParams>> = Some(assess::UPDATE_STATUS);
    const TRANSFER: Option<PathTemplate<ReferralParams>> = Some(assess::TRANSFER);
    const UPDATE_LDC: Option<PathTemplate<ReferralParams>> = Some(assess::UPDATE_LDC);
}

#[derive(Debug, Serialize)]
pub(crate) struct Action {
    pub(crate) label: &'static str,
    pub(crate) href: String,
}

/// Whether the person needs an LDC-adapted course, as the programme team sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LdcView {
    pub(crate) has_ldc: Option<bool>,
    pub(crate) overridden_by_programme_team: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) change_href: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusHistoryView {
    pub(crate) referral_id: ReferralId,
    pub(crate) person_name: String,
    pub(crate) prison_number: String,
    pub(crate) course_name: String,
    pub(crate) status: ReferralStatus,
    pub(crate) status_label: &'static str,
    pub(crate) status_colour: &'static str,
    pub(crate) timeline: Vec<TimelineEntry>,
    pub(crate) actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) ldc: Option<LdcView>,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

pub(crate) async fn history<J: StatusJourney>(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let context = state.service.context(id)?;
    let timeline = state.service.status_history(id)?;
    let permitted = context.referral.status.permitted_next_states(&identity.roles);
    let params = ReferralParams::from(id);

    let mut actions = Vec::new();
    if let Some(update) = J::UPDATE_STATUS {
        if permitted
            .iter()
            .any(|status| *status != ReferralStatus::Transferred)
        {
            actions.push(Action {
                label: "Update status",
                href: update.build(&params)?,
            });
        }
    }
    if permitted.contains(&ReferralStatus::Withdrawn) {
        actions.push(Action {
            label: "Withdraw referral",
            href: J::WITHDRAW.build(&params)?,
        });
    }
    if let Some(transfer) = J::TRANSFER {
        if state.features.transfer
            && !context.course.building_choices
            && permitted.contains(&ReferralStatus::Transferred)
        {
            actions.push(Action {
                label: "Move to Building Choices",
                href: transfer.build(&params)?,
            });
        }
    }

    let referral = &context.referral;
    let ldc = match J::UPDATE_LDC {
        Some(update) => Some(LdcView {
            has_ldc: referral.has_ldc,
            overridden_by_programme_team: referral.has_ldc_been_overridden_by_programme_team,
            change_href: if referral.status.is_open() {
                Some(update.build(&params)?)
            } else {
                None
            },
        }),
        None => None,
    };

    let flash = session.take_flash();
    let back_href =
        session.read(|data| data.back_to_case_list(J::CASE_LIST.pattern()).to_string());

    Ok(Json(StatusHistoryView {
        referral_id: id,
        person_name: context.person.name(),
        prison_number: context.person.prison_number,
        course_name: context.course.display_name(),
        status: context.referral.status,
        status_label: context.referral.status.label(),
        status_colour: context.referral.status.colour(),
        timeline,
        actions,
        ldc,
        back_href,
        flash,
    })
    .into_response())
}

/// Begins a wizard towards `status`, replacing any draft left in the session.
pub(crate) fn start<J: StatusJourney>(
    identity: &Identity,
    session: &Session,
    referral: &Referral,
    status: ReferralStatus,
) -> PageResult {
    match authorize_transition(referral.status, status, &identity.roles) {
        Ok(()) => {}
        Err(TransitionError::Forbidden { from, to }) => return Ok(forbidden(identity, from, to)),
        Err(err @ TransitionError::Illegal { .. }) => {
            return rejected(identity, session, err.into(), &J::history(referral.id)?, &[])
        }
    }

    let draft = StatusUpdateDraft::new(referral.id, status);
    let first = draft.first_step();
    session.with(|data| data.referral_status_update_data = Some(draft));
    info!(referral_id = %referral.id, to = status.code(), "status change started");
    Ok(see_other(&J::step(first, referral.id)?))
}

pub(crate) async fn withdraw<J: StatusJourney>(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let referral = state.service.referral(parse_id(&referral_id)?)?;
    start::<J>(&identity, &session, &referral, ReferralStatus::Withdrawn)
}

/// The session draft for this referral, or the page to send the caller to instead.
fn draft_for<J: StatusJourney>(
    session: &Session,
    referral_id: ReferralId,
    step: WizardStep,
) -> Result<StatusUpdateDraft, PageResult> {
    let Some(draft) = session.read(|data| data.status_update_for(referral_id).cloned()) else {
        return Err(J::history(referral_id)
            .map(|path| see_other(&path))
            .map_err(Into::into));
    };
    match draft.ensure_step(step) {
        Ok(()) => Ok(draft),
        Err(WizardError::OutOfOrder { resume_at }) => Err(J::step(resume_at, referral_id)
            .map(|path| see_other(&path))
            .map_err(Into::into)),
        Err(_) => Err(J::history(referral_id)
            .map(|path| see_other(&path))
            .map_err(Into::into)),
    }
}

fn wizard_rejected<J: StatusJourney>(
    session: &Session,
    err: WizardError,
    referral_id: ReferralId,
    back: WizardStep,
    values: &[(&str, &str)],
) -> PageResult {
    let field = match &err {
        WizardError::OutOfOrder { resume_at } => {
            return Ok(see_other(&J::step(*resume_at, referral_id)?))
        }
        WizardError::CategoryRequired | WizardError::UnknownCategory(_) => "categoryCode",
        WizardError::ReasonRequired | WizardError::UnknownReason(_) => "reasonCode",
        WizardError::InformationRequired | WizardError::InformationTooLong { .. } => {
            "reasonInformation"
        }
    };
    session.flash_error(field, err.to_string(), values);
    Ok(see_other(&J::step(back, referral_id)?))
}

fn heading(status: ReferralStatus) -> String {
    match status {
        ReferralStatus::Withdrawn => "Withdraw referral".to_string(),
        ReferralStatus::Deselected => "Deselect referral".to_string(),
        other => format!("Move referral to {}", other.label().to_lowercase()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChoiceView {
    pub(crate) referral_id: ReferralId,
    pub(crate) status: ReferralStatus,
    pub(crate) heading: String,
    pub(crate) radios: Vec<RadioEntry>,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

pub(crate) async fn category<J: StatusJourney>(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let draft = match draft_for::<J>(&session, id, WizardStep::Category) {
        Ok(draft) => draft,
        Err(page) => return page,
    };

    let categories = state.service.status_categories(draft.status)?;
    let flash = session.take_flash();
    let checked = flash
        .values
        .get("categoryCode")
        .cloned()
        .or(draft.category_code);

    Ok(Json(ChoiceView {
        referral_id: id,
        status: draft.status,
        heading: heading(draft.status),
        radios: category_radios(&categories, checked.as_deref()),
        back_href: J::history(id)?,
        flash,
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CategoryForm {
    #[serde(default)]
    pub(crate) category_code: Option<String>,
}

pub(crate) async fn submit_category<J: StatusJourney>(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<CategoryForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let draft = match draft_for::<J>(&session, id, WizardStep::Category) {
        Ok(draft) => draft,
        Err(page) => return page,
    };

    let categories = state.service.status_categories(draft.status)?;
    let reasons = state.service.status_reasons(draft.status)?;
    let code = form.category_code.as_deref();
    let outcome = session.with(|data| {
        data.status_update_for(id)
            .map(|draft| draft.choose_category(code, &categories, &reasons))
    });

    match outcome {
        Some(Ok(next)) => Ok(see_other(&J::step(next, id)?)),
        Some(Err(err)) => wizard_rejected::<J>(
            &session,
            err,
            id,
            WizardStep::Category,
            &[("categoryCode", code.unwrap_or_default())],
        ),
        None => Ok(see_other(&J::history(id)?)),
    }
}

pub(crate) async fn reason<J: StatusJourney>(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let draft = match draft_for::<J>(&session, id, WizardStep::Reason) {
        Ok(draft) => draft,
        Err(page) => return page,
    };

    let reasons = state.service.status_reasons(draft.status)?;
    let flash = session.take_flash();
    let checked = flash.values.get("reasonCode").cloned().or(draft.reason_code);
    let category_code = draft.category_code.unwrap_or_default();

    Ok(Json(ChoiceView {
        referral_id: id,
        status: draft.status,
        heading: heading(draft.status),
        radios: reason_radios(&reasons, &category_code, checked.as_deref()),
        back_href: J::step(WizardStep::Category, id)?,
        flash,
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReasonForm {
    #[serde(default)]
    pub(crate) reason_code: Option<String>,
}

pub(crate) async fn submit_reason<J: StatusJourney>(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<ReasonForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let draft = match draft_for::<J>(&session, id, WizardStep::Reason) {
        Ok(draft) => draft,
        Err(page) => return page,
    };

    let reasons = state.service.status_reasons(draft.status)?;
    let code = form.reason_code.as_deref();
    let outcome = session.with(|data| {
        data.status_update_for(id)
            .map(|draft| draft.choose_reason(code, &reasons))
    });

    match outcome {
        Some(Ok(next)) => Ok(see_other(&J::step(next, id)?)),
        Some(Err(err)) => wizard_rejected::<J>(
            &session,
            err,
            id,
            WizardStep::Reason,
            &[("reasonCode", code.unwrap_or_default())],
        ),
        None => Ok(see_other(&J::history(id)?)),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReasonInformationView {
    pub(crate) referral_id: ReferralId,
    pub(crate) status: ReferralStatus,
    pub(crate) heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reason: Option<String>,
    pub(crate) max_length: usize,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

pub(crate) async fn reason_information<J: StatusJourney>(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let draft = match draft_for::<J>(&session, id, WizardStep::ReasonInformation) {
        Ok(draft) => draft,
        Err(page) => return page,
    };

    let (category, reason) = if draft.status.requires_category() {
        let categories = state.service.status_categories(draft.status)?;
        let reasons = state.service.status_reasons(draft.status)?;
        let category = categories
            .into_iter()
            .find(|category| Some(&category.code) == draft.category_code.as_ref())
            .map(|category| category.description);
        let reason = reasons
            .into_iter()
            .find(|reason| Some(&reason.code) == draft.reason_code.as_ref())
            .map(|reason| reason.description);
        (category, reason)
    } else {
        (None, None)
    };

    let back_href = if !draft.status.requires_category() {
        match J::UPDATE_STATUS {
            Some(update) => update.build(&id.into())?,
            None => J::history(id)?,
        }
    } else if draft.reason_skipped {
        J::step(WizardStep::Category, id)?
    } else {
        J::step(WizardStep::Reason, id)?
    };

    Ok(Json(ReasonInformationView {
        referral_id: id,
        status: draft.status,
        heading: heading(draft.status),
        category,
        reason,
        max_length: REASON_INFORMATION_MAX_LENGTH,
        back_href,
        flash: session.take_flash(),
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReasonInformationForm {
    #[serde(default)]
    pub(crate) reason_information: Option<String>,
}

/// Completes the wizard with the single status-update call and clears the draft.
pub(crate) async fn submit_reason_information<J: StatusJourney>(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<ReasonInformationForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let draft = match draft_for::<J>(&session, id, WizardStep::ReasonInformation) {
        Ok(draft) => draft,
        Err(page) => return page,
    };

    let information = form.reason_information.unwrap_or_default();
    let values = [("reasonInformation", information.as_str())];
    let update = match draft.complete(&information) {
        Ok(update) => update,
        Err(err) => {
            return wizard_rejected::<J>(&session, err, id, WizardStep::ReasonInformation, &values)
        }
    };

    match state
        .service
        .update_status(id, &update, &identity.roles, &identity.username)
    {
        Ok(()) => {}
        // The referral has moved on, so the draft can never be submitted.
        Err(
            err @ (ReferralServiceError::Transition(_) | ReferralServiceError::StatusChanged(_)),
        ) => {
            session.with(|data| data.referral_status_update_data = None);
            return rejected(&identity, &session, err, &J::history(id)?, &[]);
        }
        Err(err) => {
            let back = J::step(WizardStep::ReasonInformation, id)?;
            return rejected(&identity, &session, err, &back, &values);
        }
    }

    session.with(|data| data.referral_status_update_data = None);
    session.flash_success(format!("Referral status updated to {}", update.status.label()));
    Ok(see_other(&J::history(id)?))
}
