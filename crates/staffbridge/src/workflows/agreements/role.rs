use serde::{Deserialize, Serialize};

use super::domain::{AgreementSnapshot, UserId};

/// Which side of the agreement a user stands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// Posted the contract; books and counter-signs last.
    Publisher,
    /// Applied for the contract; signs first and may owe a fee quote.
    Applicant,
    /// Neither party: read-only.
    Observer,
}

impl PartyRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Publisher => "publisher",
            Self::Applicant => "applicant",
            Self::Observer => "observer",
        }
    }
}

impl std::fmt::Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleResolutionError {
    #[error("agreement lists user {user} as both publisher and applicant")]
    SelfContract { user: UserId },
}

/// Resolve the user's role by exact id match. No inheritance, no fuzziness.
///
/// A non-party resolves to [`PartyRole::Observer`]; mutating paths translate
/// that into a distinct error rather than silently doing nothing. An
/// agreement naming the same user on both sides is a data-integrity failure,
/// never a role.
pub fn resolve_role(
    agreement: &AgreementSnapshot,
    user: UserId,
) -> Result<PartyRole, RoleResolutionError> {
    if agreement.client_user_id == agreement.agency_user_id {
        return Err(RoleResolutionError::SelfContract {
            user: agreement.client_user_id,
        });
    }
    if agreement.client_user_id == user {
        return Ok(PartyRole::Publisher);
    }
    if agreement.agency_user_id == user {
        return Ok(PartyRole::Applicant);
    }
    Ok(PartyRole::Observer)
}
