//! Moving an open referral onto the Building Choices course the PNI recommends.

use serde::{Deserialize, Serialize};

use super::domain::{Course, CourseIntensity, CourseOffering, ReferralId};
use super::pni::{PniIntensity, ProgrammePathway};
use super::status::ReferralStatus;

/// Why a transfer could not be offered; stored in the session as `transferErrorData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferErrorReason {
    MissingInformation,
    NotEligible,
    NoCourse,
    Error,
}

impl TransferErrorReason {
    pub const fn heading(self) -> &'static str {
        match self {
            Self::MissingInformation => "This referral cannot be moved to Building Choices",
            Self::NotEligible => "This person is not eligible for Building Choices",
            Self::NoCourse => "There is no Building Choices course available",
            Self::Error => "Sorry, there is a problem with the service",
        }
    }

    pub const fn body(self) -> &'static str {
        match self {
            Self::MissingInformation => {
                "Risk and need scores are missing for this person, so the recommended programme intensity cannot be calculated."
            }
            Self::NotEligible => {
                "The programme needs identifier does not recommend Building Choices for this person."
            }
            Self::NoCourse => {
                "The location does not run a Building Choices course of the recommended intensity."
            }
            Self::Error => "The referral could not be moved. Try again later.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferErrorData {
    pub referral_id: ReferralId,
    pub reason: TransferErrorReason,
    pub person_name: String,
    pub course_name: String,
}

/// A Building Choices course and the offering at the referral's organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTarget {
    pub course: Course,
    pub offering: CourseOffering,
}

/// What the transfer check needs to know about the referral being moved.
#[derive(Debug, Clone, Copy)]
pub struct TransferSubject<'a> {
    pub status: ReferralStatus,
    pub has_ldc: Option<bool>,
    pub current_course: &'a Course,
    pub current_offering: &'a CourseOffering,
}

fn intensity_matches(course: CourseIntensity, wanted: PniIntensity) -> bool {
    match (course, wanted) {
        (CourseIntensity::HighModerate, _) => true,
        (CourseIntensity::High, PniIntensity::High) => true,
        (CourseIntensity::Moderate, PniIntensity::Moderate) => true,
        (CourseIntensity::High, PniIntensity::Moderate)
        | (CourseIntensity::Moderate, PniIntensity::High) => false,
    }
}

/// Picks the Building Choices offering to transfer to, or the error page to show instead.
///
/// `candidates` pairs every Building Choices course with its offerings.
pub fn transfer_target(
    pathway: ProgrammePathway,
    subject: TransferSubject<'_>,
    candidates: &[(Course, Vec<CourseOffering>)],
) -> Result<TransferTarget, TransferErrorReason> {
    if subject.current_course.building_choices
        || !subject.status.can_transition_to(ReferralStatus::Transferred)
    {
        return Err(TransferErrorReason::NotEligible);
    }

    let wanted = match pathway {
        ProgrammePathway::MissingInformation => {
            return Err(TransferErrorReason::MissingInformation)
        }
        ProgrammePathway::AlternativePathway | ProgrammePathway::Unknown => {
            return Err(TransferErrorReason::NotEligible)
        }
        ProgrammePathway::HighIntensityBc | ProgrammePathway::ModerateIntensityBc => pathway
            .recommended_intensity()
            .ok_or(TransferErrorReason::NotEligible)?,
    };

    let needs_ldc = subject.has_ldc.unwrap_or(false);
    let organisation_id = subject.current_offering.organisation_id.as_str();

    candidates
        .iter()
        .filter(|(course, _)| {
            course.building_choices
                && course.ldc == needs_ldc
                && intensity_matches(course.intensity, wanted)
        })
        .find_map(|(course, offerings)| {
            offerings
                .iter()
                .find(|offering| offering.referable && offering.organisation_id == organisation_id)
                .map(|offering| TransferTarget {
                    course: course.clone(),
                    offering: offering.clone(),
                })
        })
        .ok_or(TransferErrorReason::NoCourse)
}
