use accredited_programmes::paths::{assess, ReferralParams};
use accredited_programmes::session::Flash;
use accredited_programmes::workflows::referrals::withdrawal::radio_items;
use accredited_programmes::workflows::referrals::{
    CaseListQuery, CaseListScope, RadioEntry, ReferralId, ReferralServiceError, ReferralStatus,
    TransferCheck, TransferErrorData, TransferErrorReason,
};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::find::CourseCard;
use super::status::{self, Assess};
use super::{parse_id, rejected, see_other, text, PageResult};
use crate::auth::Identity;
use crate::infra::WebState;
use crate::session::Session;

pub(crate) async fn case_list(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Query(query): Query<CaseListQuery>,
) -> PageResult {
    let list = state.service.case_list(
        &CaseListScope::ProgrammeTeam,
        query,
        assess::CASE_LIST.pattern(),
        state.page_size,
        |summary| assess::STATUS_HISTORY.build(&summary.id.into()),
    )?;

    let current = list.current_path.clone();
    session.with(|data| data.remember_case_list(assess::CASE_LIST.pattern(), current));
    Ok(Json(list).into_response())
}

/// Statuses offered on the update-status page. Transfers have their own page.
fn offered(current: ReferralStatus, identity: &Identity) -> Vec<ReferralStatus> {
    current
        .permitted_next_states(&identity.roles)
        .into_iter()
        .filter(|status| *status != ReferralStatus::Transferred)
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateStatusView {
    pub(crate) referral_id: ReferralId,
    pub(crate) person_name: String,
    pub(crate) current_status: &'static str,
    pub(crate) radios: Vec<RadioEntry>,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

pub(crate) async fn update_status(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let context = state.service.context(id)?;
    let options = offered(context.referral.status, &identity);
    if options.is_empty() {
        return Ok(see_other(&assess::STATUS_HISTORY.build(&id.into())?));
    }

    let flash = session.take_flash();
    let checked = flash.values.get("status").cloned();
    let radios = radio_items(
        options.iter().map(|status| (status.code(), status.label())),
        checked.as_deref(),
    );

    Ok(Json(UpdateStatusView {
        referral_id: id,
        person_name: context.person.name(),
        current_status: context.referral.status.label(),
        radios,
        back_href: assess::STATUS_HISTORY.build(&id.into())?,
        flash,
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpdateStatusForm {
    #[serde(default)]
    pub(crate) status: Option<String>,
}

pub(crate) async fn submit_update_status(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<UpdateStatusForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let referral = state.service.referral(id)?;
    let chosen = text(&form.status).and_then(ReferralStatus::from_code);

    match chosen {
        Some(status) if status != ReferralStatus::Transferred => {
            status::start::<Assess>(&identity, &session, &referral, status)
        }
        _ => {
            session.flash_error("status", "Select a status", &[]);
            Ok(see_other(&assess::UPDATE_STATUS.build(&id.into())?))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransferView {
    pub(crate) referral_id: ReferralId,
    pub(crate) person_name: String,
    pub(crate) current_course: String,
    pub(crate) target_course: CourseCard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) transfer_reason: Option<String>,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

fn transfer_error(
    session: &Session,
    id: ReferralId,
    reason: TransferErrorReason,
    person_name: String,
    course_name: String,
) -> PageResult {
    warn!(referral_id = %id, ?reason, "referral cannot be moved to Building Choices");
    session.with(|data| {
        data.transfer_error_data = Some(TransferErrorData {
            referral_id: id,
            reason,
            person_name,
            course_name,
        })
    });
    Ok(see_other(&assess::TRANSFER_ERROR.build(&id.into())?))
}

pub(crate) async fn transfer(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let (context, check) = state.service.check_transfer(id)?;
    let target = match check {
        TransferCheck::Eligible(target) => target,
        TransferCheck::Ineligible(reason) => {
            return transfer_error(
                &session,
                id,
                reason,
                context.person.name(),
                context.course.display_name(),
            )
        }
    };

    let flash = session.take_flash();
    Ok(Json(TransferView {
        referral_id: id,
        person_name: context.person.name(),
        current_course: context.course.display_name(),
        target_course: CourseCard::from(&target.course),
        transfer_reason: flash.values.get("transferReason").cloned(),
        back_href: assess::STATUS_HISTORY.build(&id.into())?,
        flash,
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransferForm {
    #[serde(default)]
    pub(crate) transfer_reason: Option<String>,
}

pub(crate) async fn submit_transfer(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<TransferForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let reason = form.transfer_reason.as_deref();

    match state
        .service
        .transfer(id, reason, &identity.roles, &identity.username)
    {
        Ok(Ok(moved)) => {
            let context = state.service.context(moved.id)?;
            session.flash_success(format!(
                "{} has been moved to {}",
                context.person.name(),
                context.course.display_name()
            ));
            Ok(see_other(&assess::STATUS_HISTORY.build(&moved.id.into())?))
        }
        Ok(Err(reason)) => {
            let context = state.service.context(id)?;
            transfer_error(
                &session,
                id,
                reason,
                context.person.name(),
                context.course.display_name(),
            )
        }
        Err(
            err @ (ReferralServiceError::Invalid { .. } | ReferralServiceError::Transition(_)),
        ) => {
            let back = assess::TRANSFER.build(&id.into())?;
            rejected(
                &identity,
                &session,
                err,
                &back,
                &[("transferReason", reason.unwrap_or_default())],
            )
        }
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransferErrorView {
    pub(crate) referral_id: ReferralId,
    pub(crate) heading: &'static str,
    pub(crate) body: &'static str,
    pub(crate) person_name: String,
    pub(crate) course_name: String,
    pub(crate) back_href: String,
}

pub(crate) async fn transfer_error_page(
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let params = ReferralParams::from(id);
    let Some(error) = session.read(|data| data.transfer_error_for(id).cloned()) else {
        return Ok(see_other(&assess::STATUS_HISTORY.build(&params)?));
    };

    Ok(Json(TransferErrorView {
        referral_id: id,
        heading: error.reason.heading(),
        body: error.reason.body(),
        person_name: error.person_name,
        course_name: error.course_name,
        back_href: assess::STATUS_HISTORY.build(&params)?,
    })
    .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateLdcView {
    pub(crate) referral_id: ReferralId,
    pub(crate) person_name: String,
    pub(crate) course_name: String,
    pub(crate) radios: Vec<RadioEntry>,
    pub(crate) back_href: String,
    pub(crate) flash: Flash,
}

fn ldc_code(has_ldc: bool) -> &'static str {
    if has_ldc {
        "true"
    } else {
        "false"
    }
}

pub(crate) async fn update_ldc(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let history = assess::STATUS_HISTORY.build(&id.into())?;
    let context = state.service.context(id)?;
    if !context.referral.status.is_open() {
        return Ok(see_other(&history));
    }

    let flash = session.take_flash();
    let checked = flash
        .values
        .get("hasLdc")
        .cloned()
        .or_else(|| context.referral.has_ldc.map(|has_ldc| ldc_code(has_ldc).to_string()));
    let radios = radio_items(
        [
            (ldc_code(true), "Yes, they need an LDC-adapted programme"),
            (ldc_code(false), "No, they do not"),
        ],
        checked.as_deref(),
    );

    Ok(Json(UpdateLdcView {
        referral_id: id,
        person_name: context.person.name(),
        course_name: context.course.display_name(),
        radios,
        back_href: history,
        flash,
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateLdcForm {
    #[serde(default)]
    pub(crate) has_ldc: Option<String>,
}

pub(crate) async fn submit_update_ldc(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Path(referral_id): Path<String>,
    Form(form): Form<UpdateLdcForm>,
) -> PageResult {
    let id: ReferralId = parse_id(&referral_id)?;
    let has_ldc = match text(&form.has_ldc) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    };

    match state
        .service
        .update_ldc(id, has_ldc, &identity.roles, &identity.username)
    {
        Ok(updated) => {
            let context = state.service.context(updated.id)?;
            session.flash_success(format!("LDC needs updated for {}", context.person.name()));
            Ok(see_other(&assess::STATUS_HISTORY.build(&id.into())?))
        }
        Err(
            err @ (ReferralServiceError::Invalid { .. } | ReferralServiceError::ProgrammeTeamOnly),
        ) => {
            let back = assess::UPDATE_LDC.build(&id.into())?;
            rejected(&identity, &session, err, &back, &[])
        }
        Err(err) => Err(err.into()),
    }
}
