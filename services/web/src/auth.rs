use accredited_programmes::access::{is_permitted, ApplicationRole, RoleSet};
use accredited_programmes::paths::AUTH_ERROR;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

pub const USER_HEADER: &str = "x-auth-user";
pub const ROLES_HEADER: &str = "x-auth-roles";

pub(crate) const REFERRER_ROLES: &[ApplicationRole] =
    &[ApplicationRole::AcpReferrer, ApplicationRole::AcpHsp];
pub(crate) const PROGRAMME_TEAM_ROLES: &[ApplicationRole] = &[ApplicationRole::AcpProgrammeTeam];

/// Caller as asserted by the auth proxy in front of the service.
#[derive(Debug, Clone, Default)]
pub(crate) struct Identity {
    pub(crate) username: String,
    pub(crate) roles: RoleSet,
}

impl Identity {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            username: header(USER_HEADER),
            roles: RoleSet::from_header(&header(ROLES_HEADER)),
        }
    }
}

pub(crate) async fn identity(mut request: Request, next: Next) -> Response {
    let identity = Identity::from_headers(request.headers());
    request.extensions_mut().insert(identity);
    next.run(request).await
}

pub(crate) fn auth_error_redirect() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, AUTH_ERROR.pattern())]).into_response()
}

/// Runs the handler only when the caller holds one of `allowed`.
pub(crate) async fn require_roles(
    State(allowed): State<&'static [ApplicationRole]>,
    request: Request,
    next: Next,
) -> Response {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or_default();

    if is_permitted(&identity.roles, allowed) {
        return next.run(request).await;
    }

    warn!(
        username = %identity.username,
        path = %request.uri().path(),
        "caller lacks a required role"
    );
    auth_error_redirect()
}

pub(crate) async fn auth_error_page() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        axum::Json(serde_json::json!({
            "heading": "You are not authorised to use this application",
        })),
    )
}
