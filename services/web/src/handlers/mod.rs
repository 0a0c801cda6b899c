//! Page handlers for the find, refer and assess journeys.
//!
//! GET handlers render a JSON view model pre-filled from upstream state and the flash.
//! POST handlers validate, persist through [`ReferralService`] and answer with a 303.

pub(crate) mod assess;
pub(crate) mod find;
pub(crate) mod refer;
pub(crate) mod status;

use std::str::FromStr;

use accredited_programmes::error::AppError;
use accredited_programmes::workflows::referrals::{
    ReferralId, ReferralServiceError, ReferralStatus, TransitionError,
};
use axum::response::{IntoResponse, Redirect, Response};
use tracing::warn;

use crate::auth::{auth_error_redirect, Identity};
use crate::session::Session;

pub(crate) type PageResult = Result<Response, AppError>;

pub(crate) fn see_other(path: &str) -> Response {
    Redirect::to(path).into_response()
}

/// Parses an id from the URL. Anything that is not an id is a missing page.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("no resource with id '{raw}'")))
}

pub(crate) fn not_found(referral_id: ReferralId) -> AppError {
    AppError::NotFound(format!("referral {referral_id}"))
}

/// Trimmed, non-empty form text.
pub(crate) fn text(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Present checkboxes post their value; absent ones post nothing.
pub(crate) fn checked(value: &Option<String>) -> bool {
    text(value).is_some()
}

pub(crate) fn forbidden(identity: &Identity, from: ReferralStatus, to: ReferralStatus) -> Response {
    warn!(
        username = %identity.username,
        from = from.code(),
        to = to.code(),
        "status change refused for caller"
    );
    auth_error_redirect()
}

/// Turns a rejected form submission into a flash and a redirect back to the form.
///
/// Errors that are not the user's to fix are returned for [`AppError`] to render.
pub(crate) fn rejected(
    identity: &Identity,
    session: &Session,
    err: ReferralServiceError,
    back: &str,
    values: &[(&str, &str)],
) -> PageResult {
    match err {
        ReferralServiceError::Invalid { field, message } => {
            session.flash_error(field, message, values);
            Ok(see_other(back))
        }
        ReferralServiceError::PersonNotFound(_) => {
            session.flash_error("prisonNumber", err.to_string(), values);
            Ok(see_other(back))
        }
        ReferralServiceError::Transition(TransitionError::Forbidden { from, to }) => {
            Ok(forbidden(identity, from, to))
        }
        ReferralServiceError::Transition(TransitionError::Illegal { from, to }) => {
            warn!(from = from.code(), to = to.code(), "stale status change submitted");
            session.flash_error(
                "status",
                format!("This referral can no longer be changed to {}", to.label().to_lowercase()),
                values,
            );
            Ok(see_other(back))
        }
        ReferralServiceError::StatusChanged(_) => {
            session.flash_error("status", err.to_string(), values);
            Ok(see_other(back))
        }
        ReferralServiceError::ProgrammeTeamOnly => {
            warn!(username = %identity.username, "LDC change refused for caller");
            Ok(auth_error_redirect())
        }
        other => Err(other.into()),
    }
}

#[cfg(test)]
pub(crate) mod tests;
