//! Application roles and the allow-list check used to gate route groups.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationRole {
    AcpReferrer,
    AcpProgrammeTeam,
    AcpHsp,
    AcpEditor,
}

impl ApplicationRole {
    pub const ALL: [Self; 4] = [
        Self::AcpReferrer,
        Self::AcpProgrammeTeam,
        Self::AcpHsp,
        Self::AcpEditor,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::AcpReferrer => "ACP_REFERRER",
            Self::AcpProgrammeTeam => "ACP_PROGRAMME_TEAM",
            Self::AcpHsp => "ACP_HSP",
            Self::AcpEditor => "ACP_EDITOR",
        }
    }
}

impl fmt::Display for ApplicationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised application role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for ApplicationRole {
    type Err = UnknownRole;

    /// Accepts the bare code or the `ROLE_`-prefixed authority name issued by the auth service.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let code = trimmed.strip_prefix("ROLE_").unwrap_or(trimmed);
        Self::ALL
            .into_iter()
            .find(|role| role.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| UnknownRole(trimmed.to_string()))
    }
}

/// Roles attached to the signed-in user for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<ApplicationRole>);

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = ApplicationRole>) -> Self {
        Self(roles.into_iter().collect())
    }

    /// Parses a comma separated authority list, skipping roles this service does not use.
    pub fn from_header(raw: &str) -> Self {
        Self(
            raw.split(',')
                .filter(|part| !part.trim().is_empty())
                .filter_map(|part| part.parse().ok())
                .collect(),
        )
    }

    pub fn contains(&self, role: ApplicationRole) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ApplicationRole> + '_ {
        self.0.iter().copied()
    }

    pub fn has_referrer_authority(&self) -> bool {
        self.contains(ApplicationRole::AcpReferrer) || self.contains(ApplicationRole::AcpHsp)
    }

    pub fn has_programme_team_authority(&self) -> bool {
        self.contains(ApplicationRole::AcpProgrammeTeam)
    }
}

impl FromIterator<ApplicationRole> for RoleSet {
    fn from_iter<T: IntoIterator<Item = ApplicationRole>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// True when the allow-list is empty or shares at least one role with the caller.
pub fn is_permitted(roles: &RoleSet, allowed: &[ApplicationRole]) -> bool {
    allowed.is_empty() || allowed.iter().any(|role| roles.contains(*role))
}
