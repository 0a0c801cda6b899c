//! URL templates for the find, refer and assess journeys.
//!
//! Each template is tied to the params record that fills it, so a handler cannot build a
//! referral path from an offering id. [`verify`] walks every template once at startup and
//! fails if a placeholder has no matching param.

use std::marker::PhantomData;

use url::form_urlencoded;

use crate::workflows::referrals::domain::{OfferingId, ParticipationId, ReferralId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path {template} needs a value for :{param}")]
    MissingParam {
        template: &'static str,
        param: String,
    },
    #[error("path {template} was given an empty or unsafe value for :{param}")]
    InvalidParam {
        template: &'static str,
        param: String,
    },
}

/// Named values substituted into `:placeholder` segments.
pub trait PathParams {
    fn get(&self, name: &str) -> Option<String>;

    /// A representative value used by [`verify`].
    fn example() -> Self
    where
        Self: Sized;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoParams;

impl PathParams for NoParams {
    fn get(&self, _name: &str) -> Option<String> {
        None
    }

    fn example() -> Self {
        NoParams
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReferralParams {
    pub referral_id: ReferralId,
}

impl From<ReferralId> for ReferralParams {
    fn from(referral_id: ReferralId) -> Self {
        Self { referral_id }
    }
}

impl PathParams for ReferralParams {
    fn get(&self, name: &str) -> Option<String> {
        (name == "referralId").then(|| self.referral_id.to_string())
    }

    fn example() -> Self {
        ReferralId::new().into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OfferingParams {
    pub offering_id: OfferingId,
}

impl PathParams for OfferingParams {
    fn get(&self, name: &str) -> Option<String> {
        (name == "offeringId").then(|| self.offering_id.to_string())
    }

    fn example() -> Self {
        Self {
            offering_id: OfferingId::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersonParams {
    pub offering_id: OfferingId,
    pub prison_number: String,
}

impl PathParams for PersonParams {
    fn get(&self, name: &str) -> Option<String> {
        match name {
            "offeringId" => Some(self.offering_id.to_string()),
            "prisonNumber" => Some(self.prison_number.clone()),
            _ => None,
        }
    }

    fn example() -> Self {
        Self {
            offering_id: OfferingId::new(),
            prison_number: "A1234AA".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParticipationParams {
    pub referral_id: ReferralId,
    pub participation_id: ParticipationId,
}

impl PathParams for ParticipationParams {
    fn get(&self, name: &str) -> Option<String> {
        match name {
            "referralId" => Some(self.referral_id.to_string()),
            "courseParticipationId" => Some(self.participation_id.to_string()),
            _ => None,
        }
    }

    fn example() -> Self {
        Self {
            referral_id: ReferralId::new(),
            participation_id: ParticipationId::new(),
        }
    }
}

/// A route pattern in axum's `:name` syntax, bound to its params record.
pub struct PathTemplate<P> {
    pattern: &'static str,
    _params: PhantomData<fn(&P)>,
}

impl<P> Clone for PathTemplate<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PathTemplate<P> {}

impl<P> std::fmt::Debug for PathTemplate<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PathTemplate").field(&self.pattern).finish()
    }
}

impl<P> PathTemplate<P> {
    pub const fn new(pattern: &'static str) -> Self {
        Self {
            pattern,
            _params: PhantomData,
        }
    }

    /// The raw pattern, for registering the route.
    pub const fn pattern(&self) -> &'static str {
        self.pattern
    }
}

impl<P: PathParams> PathTemplate<P> {
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        self.pattern
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
    }

    pub fn build(&self, params: &P) -> Result<String, PathError> {
        let mut built = String::with_capacity(self.pattern.len() + 36);
        for (index, segment) in self.pattern.split('/').enumerate() {
            if index > 0 {
                built.push('/');
            }
            match segment.strip_prefix(':') {
                Some(name) => {
                    let value = params.get(name).ok_or_else(|| PathError::MissingParam {
                        template: self.pattern,
                        param: name.to_string(),
                    })?;
                    if value.trim().is_empty() || value.contains(['/', '?', '#']) {
                        return Err(PathError::InvalidParam {
                            template: self.pattern,
                            param: name.to_string(),
                        });
                    }
                    built.push_str(&value);
                }
                None => built.push_str(segment),
            }
        }
        Ok(built)
    }

    fn check(&self) -> Result<(), PathError> {
        self.build(&P::example()).map(|_| ())
    }
}

/// Appends `?key=value` pairs, form-encoding values and skipping `None`.
pub fn with_query<'a, I>(path: &str, pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<String>)>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in pairs {
        if let Some(value) = value {
            serializer.append_pair(key, &value);
            any = true;
        }
    }

    if any {
        format!("{path}?{}", serializer.finish())
    } else {
        path.to_string()
    }
}

pub const AUTH_ERROR: PathTemplate<NoParams> = PathTemplate::new("/authError");

pub mod find {
    use super::{NoParams, PathTemplate};

    pub const INDEX: PathTemplate<NoParams> = PathTemplate::new("/find");
    pub const PERSON_SEARCH: PathTemplate<NoParams> =
        PathTemplate::new("/find/recommended-pathway");
    pub const RECOMMENDED_PROGRAMMES: PathTemplate<NoParams> =
        PathTemplate::new("/find/recommended-programmes");
}

pub mod refer {
    use super::{
        NoParams, OfferingParams, ParticipationParams, PathTemplate, PersonParams, ReferralParams,
    };

    pub const PERSON_SEARCH: PathTemplate<OfferingParams> =
        PathTemplate::new("/refer/offerings/:offeringId/person-search");
    pub const PERSON: PathTemplate<PersonParams> =
        PathTemplate::new("/refer/offerings/:offeringId/people/:prisonNumber");
    pub const CREATE: PathTemplate<NoParams> = PathTemplate::new("/refer/referrals");
    pub const CASE_LIST: PathTemplate<NoParams> = PathTemplate::new("/refer/case-list");
    pub const TASK_LIST: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId");
    pub const PERSONAL_DETAILS: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/person");
    pub const PROGRAMME_HISTORY: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/programme-history");
    pub const PROGRAMME_HISTORY_REVIEW: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/review-programme-history");
    pub const PARTICIPATION_NEW: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/add-programme-history");
    pub const PARTICIPATION: PathTemplate<ParticipationParams> = PathTemplate::new(
        "/refer/referrals/:referralId/programme-history/:courseParticipationId",
    );
    pub const PARTICIPATION_DELETE: PathTemplate<ParticipationParams> = PathTemplate::new(
        "/refer/referrals/:referralId/programme-history/:courseParticipationId/delete",
    );
    pub const CONFIRM_OASYS: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/confirm-oasys");
    pub const REASON: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/reason");
    pub const ADDITIONAL_INFORMATION: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/additional-information");
    pub const OVERRIDE_REASON: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/reason-for-override");
    pub const CHECK_ANSWERS: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/check-answers");
    pub const SUBMIT: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/submit");
    pub const COMPLETE: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/complete");
    pub const DELETE: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/delete");
    pub const STATUS_HISTORY: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/status-history");
    pub const WITHDRAW: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/withdraw");
    pub const STATUS_CATEGORY: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/withdraw/category");
    pub const STATUS_REASON: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/withdraw/reason");
    pub const STATUS_REASON_INFORMATION: PathTemplate<ReferralParams> =
        PathTemplate::new("/refer/referrals/:referralId/withdraw/reason-information");
}

pub mod assess {
    use super::{NoParams, PathTemplate, ReferralParams};

    pub const CASE_LIST: PathTemplate<NoParams> = PathTemplate::new("/assess/case-list");
    pub const STATUS_HISTORY: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/status-history");
    pub const UPDATE_STATUS: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/update-status");
    pub const WITHDRAW: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/withdraw");
    pub const STATUS_CATEGORY: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/update-status/category");
    pub const STATUS_REASON: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/update-status/reason");
    pub const STATUS_REASON_INFORMATION: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/update-status/reason-information");
    pub const TRANSFER: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/transfer");
    pub const TRANSFER_ERROR: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/transfer-error");
    pub const UPDATE_LDC: PathTemplate<ReferralParams> =
        PathTemplate::new("/assess/referrals/:referralId/update-ldc");
}

/// Builds every journey template once with example params.
pub fn verify() -> Result<(), PathError> {
    AUTH_ERROR.check()?;

    for template in [find::INDEX, find::PERSON_SEARCH, find::RECOMMENDED_PROGRAMMES] {
        template.check()?;
    }

    refer::PERSON_SEARCH.check()?;
    refer::PERSON.check()?;
    refer::CREATE.check()?;
    refer::CASE_LIST.check()?;
    for template in [
        refer::TASK_LIST,
        refer::PERSONAL_DETAILS,
        refer::PROGRAMME_HISTORY,
        refer::PROGRAMME_HISTORY_REVIEW,
        refer::PARTICIPATION_NEW,
        refer::CONFIRM_OASYS,
        refer::REASON,
        refer::ADDITIONAL_INFORMATION,
        refer::OVERRIDE_REASON,
        refer::CHECK_ANSWERS,
        refer::SUBMIT,
        refer::COMPLETE,
        refer::DELETE,
        refer::STATUS_HISTORY,
        refer::WITHDRAW,
        refer::STATUS_CATEGORY,
        refer::STATUS_REASON,
        refer::STATUS_REASON_INFORMATION,
    ] {
        template.check()?;
    }
    refer::PARTICIPATION.check()?;
    refer::PARTICIPATION_DELETE.check()?;

    assess::CASE_LIST.check()?;
    for template in [
        assess::STATUS_HISTORY,
        assess::UPDATE_STATUS,
        assess::WITHDRAW,
        assess::STATUS_CATEGORY,
        assess::STATUS_REASON,
        assess::STATUS_REASON_INFORMATION,
        assess::TRANSFER,
        assess::TRANSFER_ERROR,
        assess::UPDATE_LDC,
    ] {
        template.check()?;
    }

    Ok(())
}
