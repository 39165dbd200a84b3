mod policy;

use serde::Serialize;

use super::domain::{AgreementSnapshot, UserId};
use super::role::{resolve_role, PartyRole, RoleResolutionError};

/// What the current user may (or must) do next on one agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionEligibility {
    pub role: PartyRole,
    pub can_sign: bool,
    pub requires_fees_input: bool,
}

impl ActionEligibility {
    /// Used to badge/filter agreements waiting on the user.
    pub fn needs_action(&self) -> bool {
        self.can_sign || self.requires_fees_input
    }
}

/// Evaluate signature and fee-gate eligibility for `user`.
///
/// The authority's `can_sign` hint is returned verbatim whenever present;
/// the local fallback rules only run when the hint is absent. The fee-gate
/// check is deliberately permissive: any one of the three signals (pending
/// action hint, fees-pending status, fee block flag) asserts the gate.
pub fn evaluate(
    agreement: &AgreementSnapshot,
    user: UserId,
) -> Result<ActionEligibility, RoleResolutionError> {
    let role = resolve_role(agreement, user)?;
    Ok(ActionEligibility {
        role,
        can_sign: policy::can_sign(agreement, role),
        requires_fees_input: policy::requires_fees_input(agreement, role),
    })
}
