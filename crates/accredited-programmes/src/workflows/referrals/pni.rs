//! Programme Needs Identifier content table.
//!
//! The upstream scoring service has already decided which pathway suits the person; this
//! module only maps that pathway, the intensity of the course being viewed and whether the
//! referrer has chosen to override onto the fixed page content. The mapping is a single
//! exhaustive `match`, so adding a pathway or an intensity fails to compile until every
//! combination has content.

use serde::{Deserialize, Serialize};

use super::domain::CourseIntensity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgrammePathway {
    HighIntensityBc,
    ModerateIntensityBc,
    AlternativePathway,
    MissingInformation,
    Unknown,
}

impl ProgrammePathway {
    pub const ALL: [Self; 5] = [
        Self::HighIntensityBc,
        Self::ModerateIntensityBc,
        Self::AlternativePathway,
        Self::MissingInformation,
        Self::Unknown,
    ];

    /// Building Choices intensity this pathway recommends, if any.
    pub const fn recommended_intensity(self) -> Option<PniIntensity> {
        match self {
            Self::HighIntensityBc => Some(PniIntensity::High),
            Self::ModerateIntensityBc => Some(PniIntensity::Moderate),
            Self::AlternativePathway | Self::MissingInformation | Self::Unknown => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::HighIntensityBc => "High intensity",
            Self::ModerateIntensityBc => "Moderate intensity",
            Self::AlternativePathway => "Alternative pathway",
            Self::MissingInformation => "Missing information",
            Self::Unknown => "Unknown",
        }
    }
}

/// Intensity axis of the table. Courses delivered at both intensities match either pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PniIntensity {
    High,
    Moderate,
}

impl PniIntensity {
    pub const ALL: [Self; 2] = [Self::High, Self::Moderate];

    const fn name(self) -> &'static str {
        match self {
            Self::High => "High intensity",
            Self::Moderate => "Moderate intensity",
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::High => Self::Moderate,
            Self::Moderate => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PniVariant {
    Recommended,
    NotRecommended,
    OverrideAvailable,
    MissingInformation,
}

/// Fixed content rendered for one cell of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PniContent {
    pub variant: PniVariant,
    pub heading: String,
    pub body: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub override_offered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_button_label: Option<&'static str>,
    pub justification_required: bool,
}

const SCORES_BASIS: &str =
    "This is based on the risk and need scores in the person's OASys layer 3 assessment.";
const REFER_ANYWAY: &str = "Make a referral anyway";
const GIVE_A_REASON: &str =
    "You can still make a referral to this programme, but you must give a reason.";
const OVERRIDE_EXPLANATION: &str =
    "You will need to explain why you are referring this person to a programme that is not recommended for them.";

/// True when referring to a course of this intensity goes against the PNI recommendation.
pub fn requires_override(pathway: ProgrammePathway, intensity: CourseIntensity) -> bool {
    match pathway.recommended_intensity() {
        Some(recommended) => match intensity {
            CourseIntensity::HighModerate => false,
            CourseIntensity::High => recommended != PniIntensity::High,
            CourseIntensity::Moderate => recommended != PniIntensity::Moderate,
        },
        None => matches!(
            pathway,
            ProgrammePathway::AlternativePathway | ProgrammePathway::MissingInformation
        ),
    }
}

/// Picks the table column for a course intensity as seen against the pathway.
pub fn table_intensity(pathway: ProgrammePathway, intensity: CourseIntensity) -> PniIntensity {
    match intensity {
        CourseIntensity::High => PniIntensity::High,
        CourseIntensity::Moderate => PniIntensity::Moderate,
        CourseIntensity::HighModerate => {
            pathway.recommended_intensity().unwrap_or(PniIntensity::High)
        }
    }
}

pub fn content(
    pathway: ProgrammePathway,
    intensity: PniIntensity,
    overriding: bool,
) -> PniContent {
    use PniIntensity::{High, Moderate};
    use ProgrammePathway::*;

    match (pathway, intensity, overriding) {
        (HighIntensityBc, High, _) | (ModerateIntensityBc, Moderate, _) => recommended(intensity),
        (HighIntensityBc, Moderate, false) | (ModerateIntensityBc, High, false) => {
            not_recommended(intensity)
        }
        (HighIntensityBc, Moderate, true) | (ModerateIntensityBc, High, true) => {
            intensity_override(intensity)
        }
        (AlternativePathway, High | Moderate, false) => PniContent {
            variant: PniVariant::NotRecommended,
            heading: "Not eligible: Building Choices".to_string(),
            body: vec![
                "This person is recommended for an alternative pathway rather than Building Choices.",
                SCORES_BASIS,
                GIVE_A_REASON,
            ],
            warning: Some("Building Choices is not recommended for this person.".to_string()),
            override_offered: true,
            override_button_label: Some(REFER_ANYWAY),
            justification_required: false,
        },
        (AlternativePathway, High | Moderate, true) => PniContent {
            variant: PniVariant::OverrideAvailable,
            heading: format!("Override: {} Building Choices", intensity.name()),
            body: vec![
                "The programme needs identifier recommends an alternative pathway for this person.",
                OVERRIDE_EXPLANATION,
            ],
            warning: Some(
                "This referral goes against the programme needs identifier recommendation."
                    .to_string(),
            ),
            override_offered: false,
            override_button_label: None,
            justification_required: true,
        },
        (MissingInformation, High | Moderate, false) => PniContent {
            variant: PniVariant::MissingInformation,
            heading: "Information missing".to_string(),
            body: vec![
                "Some risk and need scores are missing from OASys, so a programme recommendation cannot be made.",
                "Update the OASys assessment, or continue with the referral and give a reason.",
            ],
            warning: Some("The programme needs identifier could not be calculated.".to_string()),
            override_offered: true,
            override_button_label: Some("Continue with referral"),
            justification_required: false,
        },
        (MissingInformation, High | Moderate, true) => PniContent {
            variant: PniVariant::OverrideAvailable,
            heading: format!("Override: {} Building Choices", intensity.name()),
            body: vec![
                "A programme recommendation cannot be made because information is missing from OASys.",
                OVERRIDE_EXPLANATION,
            ],
            warning: Some(
                "This referral was made without a programme needs identifier recommendation."
                    .to_string(),
            ),
            override_offered: false,
            override_button_label: None,
            justification_required: true,
        },
        (Unknown, High | Moderate, _) => PniContent {
            variant: PniVariant::MissingInformation,
            heading: "Recommendation unavailable".to_string(),
            body: vec![
                "The programme needs identifier is not available for this person at the moment.",
                "You can continue with the referral. The programme team will check suitability.",
            ],
            warning: None,
            override_offered: false,
            override_button_label: None,
            justification_required: false,
        },
    }
}

fn recommended(intensity: PniIntensity) -> PniContent {
    PniContent {
        variant: PniVariant::Recommended,
        heading: format!("Recommended: {} Building Choices", intensity.name()),
        body: vec![
            "This programme is recommended for this person.",
            SCORES_BASIS,
        ],
        warning: None,
        override_offered: false,
        override_button_label: None,
        justification_required: false,
    }
}

fn not_recommended(intensity: PniIntensity) -> PniContent {
    PniContent {
        variant: PniVariant::NotRecommended,
        heading: format!("Not recommended: {} Building Choices", intensity.name()),
        body: vec![
            "This person may be eligible for a different intensity of Building Choices.",
            SCORES_BASIS,
            GIVE_A_REASON,
        ],
        warning: Some(format!(
            "{} Building Choices is recommended for this person.",
            intensity.other().name()
        )),
        override_offered: true,
        override_button_label: Some(REFER_ANYWAY),
        justification_required: false,
    }
}

fn intensity_override(intensity: PniIntensity) -> PniContent {
    PniContent {
        variant: PniVariant::OverrideAvailable,
        heading: format!("Override: {} Building Choices", intensity.name()),
        body: vec![
            "The programme needs identifier recommends a different intensity of Building Choices for this person.",
            OVERRIDE_EXPLANATION,
        ],
        warning: Some(format!(
            "This referral is to {} Building Choices, but {} is recommended.",
            intensity.name(),
            intensity.other().name()
        )),
        override_offered: false,
        override_button_label: None,
        justification_required: true,
    }
}
