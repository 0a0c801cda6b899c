use accredited_programmes::config::FeatureFlags;
use accredited_programmes::error::AppError;
use accredited_programmes::paths::{self, AUTH_ERROR};
use axum::http::{header, StatusCode, Uri};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;

use crate::auth::{auth_error_page, identity, require_roles, PROGRAMME_TEAM_ROLES, REFERRER_ROLES};
use crate::handlers::status::{self, Assess, Refer};
use crate::handlers::{assess, find, refer};
use crate::infra::{AppState, WebState};
use crate::session::session_layer;

/// Every journey plus the operational endpoints, without the metrics layer.
pub(crate) fn router(web_state: WebState, app_state: AppState) -> Router {
    let features = web_state.features;
    let sessions = web_state.sessions.clone();

    let mut journeys = Router::new()
        .merge(refer_routes())
        .merge(assess_routes(features));
    if features.find {
        journeys = journeys.merge(find_routes());
    }

    journeys
        .route(AUTH_ERROR.pattern(), get(auth_error_page))
        .fallback(not_found)
        .with_state(web_state)
        .layer(from_fn_with_state(sessions, session_layer))
        .layer(from_fn(identity))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(app_state))
}

fn find_routes() -> Router<WebState> {
    use paths::find::*;

    Router::new()
        .route(INDEX.pattern(), get(find::index))
        .route(
            PERSON_SEARCH.pattern(),
            get(find::person_search).post(find::submit_person_search),
        )
        .route(
            RECOMMENDED_PROGRAMMES.pattern(),
            get(find::recommended_programmes),
        )
        .route_layer(from_fn_with_state(REFERRER_ROLES, require_roles))
}

fn refer_routes() -> Router<WebState> {
    use paths::refer::*;

    Router::new()
        .route(
            PERSON_SEARCH.pattern(),
            get(refer::person_search).post(refer::submit_person_search),
        )
        .route(PERSON.pattern(), get(refer::confirm_person))
        .route(CREATE.pattern(), axum::routing::post(refer::create))
        .route(CASE_LIST.pattern(), get(refer::case_list))
        .route(TASK_LIST.pattern(), get(refer::task_list))
        .route(PERSONAL_DETAILS.pattern(), get(refer::personal_details))
        .route(PROGRAMME_HISTORY.pattern(), get(refer::programme_history))
        .route(
            PROGRAMME_HISTORY_REVIEW.pattern(),
            axum::routing::post(refer::review_programme_history),
        )
        .route(
            PARTICIPATION_NEW.pattern(),
            get(refer::new_participation).post(refer::add_participation),
        )
        .route(
            PARTICIPATION.pattern(),
            get(refer::edit_participation).post(refer::update_participation),
        )
        .route(
            PARTICIPATION_DELETE.pattern(),
            get(refer::delete_participation_page).post(refer::delete_participation),
        )
        .route(
            CONFIRM_OASYS.pattern(),
            get(refer::confirm_oasys).post(refer::submit_confirm_oasys),
        )
        .route(REASON.pattern(), get(refer::reason).post(refer::submit_reason))
        .route(
            ADDITIONAL_INFORMATION.pattern(),
            get(refer::additional_information).post(refer::submit_additional_information),
        )
        .route(
            OVERRIDE_REASON.pattern(),
            get(refer::override_reason).post(refer::submit_override_reason),
        )
        .route(CHECK_ANSWERS.pattern(), get(refer::check_answers))
        .route(SUBMIT.pattern(), axum::routing::post(refer::submit))
        .route(COMPLETE.pattern(), get(refer::complete))
        .route(DELETE.pattern(), get(refer::delete_page).post(refer::delete))
        .route(STATUS_HISTORY.pattern(), get(status::history::<Refer>))
        .route(WITHDRAW.pattern(), get(status::withdraw::<Refer>))
        .route(
            STATUS_CATEGORY.pattern(),
            get(status::category::<Refer>).post(status::submit_category::<Refer>),
        )
        .route(
            STATUS_REASON.pattern(),
            get(status::reason::<Refer>).post(status::submit_reason::<Refer>),
        )
        .route(
            STATUS_REASON_INFORMATION.pattern(),
            get(status::reason_information::<Refer>)
                .post(status::submit_reason_information::<Refer>),
        )
        .route_layer(from_fn_with_state(REFERRER_ROLES, require_roles))
}

fn assess_routes(features: FeatureFlags) -> Router<WebState> {
    use paths::assess::*;

    let mut routes = Router::new()
        .route(CASE_LIST.pattern(), get(assess::case_list))
        .route(STATUS_HISTORY.pattern(), get(status::history::<Assess>))
        .route(
            UPDATE_STATUS.pattern(),
            get(assess::update_status).post(assess::submit_update_status),
        )
        .route(WITHDRAW.pattern(), get(status::withdraw::<Assess>))
        .route(
            STATUS_CATEGORY.pattern(),
            get(status::category::<Assess>).post(status::submit_category::<Assess>),
        )
        .route(
            STATUS_REASON.pattern(),
            get(status::reason::<Assess>).post(status::submit_reason::<Assess>),
        )
        .route(
            STATUS_REASON_INFORMATION.pattern(),
            get(status::reason_information::<Assess>)
                .post(status::submit_reason_information::<Assess>),
        )
        .route(
            UPDATE_LDC.pattern(),
            get(assess::update_ldc).post(assess::submit_update_ldc),
        );
    if features.transfer {
        routes = routes
            .route(
                TRANSFER.pattern(),
                get(assess::transfer).post(assess::submit_transfer),
            )
            .route(TRANSFER_ERROR.pattern(), get(assess::transfer_error_page));
    }

    routes.route_layer(from_fn_with_state(PROGRAMME_TEAM_ROLES, require_roles))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
