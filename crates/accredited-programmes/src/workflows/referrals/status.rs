use serde::{Deserialize, Serialize};

use crate::access::RoleSet;

/// Lifecycle status tracked for every referral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    ReferralStarted,
    ReferralSubmitted,
    AwaitingAssessment,
    AssessmentStarted,
    AssessedSuitable,
    OnProgramme,
    ProgrammeComplete,
    NotSuitable,
    Deselected,
    Withdrawn,
    Transferred,
    OnHoldReferralSubmitted,
    OnHoldAwaitingAssessment,
    OnHoldAssessmentStarted,
    OnHoldAssessedSuitable,
}

/// Who may drive a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Authority {
    Referrer,
    ProgrammeTeam,
    Either,
}

impl Authority {
    fn permits(self, roles: &RoleSet) -> bool {
        match self {
            Authority::Referrer => roles.has_referrer_authority(),
            Authority::ProgrammeTeam => roles.has_programme_team_authority(),
            Authority::Either => {
                roles.has_referrer_authority() || roles.has_programme_team_authority()
            }
        }
    }
}

use Authority::{Either, ProgrammeTeam, Referrer};
use ReferralStatus::*;

impl ReferralStatus {
    pub const ALL: [Self; 15] = [
        ReferralStarted,
        ReferralSubmitted,
        AwaitingAssessment,
        AssessmentStarted,
        AssessedSuitable,
        OnProgramme,
        ProgrammeComplete,
        NotSuitable,
        Deselected,
        Withdrawn,
        Transferred,
        OnHoldReferralSubmitted,
        OnHoldAwaitingAssessment,
        OnHoldAssessmentStarted,
        OnHoldAssessedSuitable,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            ReferralStarted => "referral_started",
            ReferralSubmitted => "referral_submitted",
            AwaitingAssessment => "awaiting_assessment",
            AssessmentStarted => "assessment_started",
            AssessedSuitable => "assessed_suitable",
            OnProgramme => "on_programme",
            ProgrammeComplete => "programme_complete",
            NotSuitable => "not_suitable",
            Deselected => "deselected",
            Withdrawn => "withdrawn",
            Transferred => "transferred",
            OnHoldReferralSubmitted => "on_hold_referral_submitted",
            OnHoldAwaitingAssessment => "on_hold_awaiting_assessment",
            OnHoldAssessmentStarted => "on_hold_assessment_started",
            OnHoldAssessedSuitable => "on_hold_assessed_suitable",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.code().eq_ignore_ascii_case(code))
    }

    pub const fn label(self) -> &'static str {
        match self {
            ReferralStarted => "Draft",
            ReferralSubmitted => "Referral submitted",
            AwaitingAssessment => "Awaiting assessment",
            AssessmentStarted => "Assessment started",
            AssessedSuitable => "Assessed as suitable",
            OnProgramme => "On programme",
            ProgrammeComplete => "Programme complete",
            NotSuitable => "Not suitable",
            Deselected => "Deselected",
            Withdrawn => "Withdrawn",
            Transferred => "Moved to Building Choices",
            OnHoldReferralSubmitted
            | OnHoldAwaitingAssessment
            | OnHoldAssessmentStarted
            | OnHoldAssessedSuitable => "On hold",
        }
    }

    /// Tag colour used by the case list and the status history timeline.
    pub const fn colour(self) -> &'static str {
        match self {
            ReferralStarted => "grey",
            ReferralSubmitted | AwaitingAssessment => "purple",
            AssessmentStarted => "yellow",
            AssessedSuitable | OnProgramme => "green",
            ProgrammeComplete => "blue",
            NotSuitable | Deselected | Withdrawn => "red",
            Transferred => "turquoise",
            OnHoldReferralSubmitted
            | OnHoldAwaitingAssessment
            | OnHoldAssessmentStarted
            | OnHoldAssessedSuitable => "orange",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ProgrammeComplete | NotSuitable | Deselected | Withdrawn | Transferred
        )
    }

    pub const fn is_draft(self) -> bool {
        matches!(self, ReferralStarted)
    }

    /// Open referrals are submitted and not yet closed.
    pub const fn is_open(self) -> bool {
        !self.is_draft() && !self.is_terminal()
    }

    /// The open state an on-hold status must return to.
    pub const fn held_from(self) -> Option<Self> {
        match self {
            OnHoldReferralSubmitted => Some(ReferralSubmitted),
            OnHoldAwaitingAssessment => Some(AwaitingAssessment),
            OnHoldAssessmentStarted => Some(AssessmentStarted),
            OnHoldAssessedSuitable => Some(AssessedSuitable),
            _ => None,
        }
    }

    pub const fn on_hold_variant(self) -> Option<Self> {
        match self {
            ReferralSubmitted => Some(OnHoldReferralSubmitted),
            AwaitingAssessment => Some(OnHoldAwaitingAssessment),
            AssessmentStarted => Some(OnHoldAssessmentStarted),
            AssessedSuitable => Some(OnHoldAssessedSuitable),
            _ => None,
        }
    }

    pub const fn is_on_hold(self) -> bool {
        self.held_from().is_some()
    }

    /// Closing statuses that are explained with a category and reason.
    pub const fn requires_category(self) -> bool {
        matches!(self, Withdrawn | Deselected)
    }

    fn transitions(self) -> &'static [(ReferralStatus, Authority)] {
        match self {
            ReferralStarted => &[(ReferralSubmitted, Referrer)],
            ReferralSubmitted => &[
                (AwaitingAssessment, ProgrammeTeam),
                (AssessmentStarted, ProgrammeTeam),
                (NotSuitable, ProgrammeTeam),
                (Transferred, ProgrammeTeam),
                (Withdrawn, Either),
                (OnHoldReferralSubmitted, Either),
            ],
            AwaitingAssessment => &[
                (AssessmentStarted, ProgrammeTeam),
                (NotSuitable, ProgrammeTeam),
                (Transferred, ProgrammeTeam),
                (Withdrawn, Either),
                (OnHoldAwaitingAssessment, Either),
            ],
            AssessmentStarted => &[
                (AssessedSuitable, ProgrammeTeam),
                (NotSuitable, ProgrammeTeam),
                (Transferred, ProgrammeTeam),
                (Withdrawn, ProgrammeTeam),
                (OnHoldAssessmentStarted, ProgrammeTeam),
            ],
            AssessedSuitable => &[
                (OnProgramme, ProgrammeTeam),
                (Deselected, ProgrammeTeam),
                (Transferred, ProgrammeTeam),
                (Withdrawn, ProgrammeTeam),
                (OnHoldAssessedSuitable, ProgrammeTeam),
            ],
            OnProgramme => &[
                (ProgrammeComplete, ProgrammeTeam),
                (Deselected, ProgrammeTeam),
                (Withdrawn, ProgrammeTeam),
            ],
            OnHoldReferralSubmitted => &[
                (ReferralSubmitted, Either),
                (NotSuitable, ProgrammeTeam),
                (Withdrawn, Either),
            ],
            OnHoldAwaitingAssessment => &[
                (AwaitingAssessment, Either),
                (NotSuitable, ProgrammeTeam),
                (Withdrawn, Either),
            ],
            OnHoldAssessmentStarted => &[
                (AssessmentStarted, ProgrammeTeam),
                (NotSuitable, ProgrammeTeam),
                (Withdrawn, ProgrammeTeam),
            ],
            OnHoldAssessedSuitable => &[
                (AssessedSuitable, ProgrammeTeam),
                (Deselected, ProgrammeTeam),
                (Withdrawn, ProgrammeTeam),
            ],
            ProgrammeComplete | NotSuitable | Deselected | Withdrawn | Transferred => &[],
        }
    }

    pub fn next_states(self) -> Vec<ReferralStatus> {
        self.transitions().iter().map(|(to, _)| *to).collect()
    }

    pub fn can_transition_to(self, to: ReferralStatus) -> bool {
        self.transitions().iter().any(|(next, _)| *next == to)
    }

    /// Next states the caller's roles allow them to choose.
    pub fn permitted_next_states(self, roles: &RoleSet) -> Vec<ReferralStatus> {
        self.transitions()
            .iter()
            .filter(|(_, authority)| authority.permits(roles))
            .map(|(to, _)| *to)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move a referral from {} to {}", from.code(), to.code())]
    Illegal {
        from: ReferralStatus,
        to: ReferralStatus,
    },
    #[error("caller may not move a referral from {} to {}", from.code(), to.code())]
    Forbidden {
        from: ReferralStatus,
        to: ReferralStatus,
    },
}

pub fn authorize_transition(
    from: ReferralStatus,
    to: ReferralStatus,
    roles: &RoleSet,
) -> Result<(), TransitionError> {
    let (_, authority) = from
        .transitions()
        .iter()
        .find(|(next, _)| *next == to)
        .ok_or(TransitionError::Illegal { from, to })?;

    if authority.permits(roles) {
        Ok(())
    } else {
        Err(TransitionError::Forbidden { from, to })
    }
}
