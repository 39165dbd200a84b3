use super::super::domain::{AgreementSnapshot, AgreementStatus, PendingAction};
use super::super::role::PartyRole;

/// Whether `role` may sign right now.
///
/// The applicant always signs before the publisher: the publisher only
/// becomes eligible in the pending-publisher state, which is unreachable
/// until `agency_signed` is set.
pub(crate) fn can_sign(agreement: &AgreementSnapshot, role: PartyRole) -> bool {
    // The server's computed answer is never overridden.
    if let Some(hint) = agreement.can_sign {
        return hint;
    }

    if agreement.status.is_terminal() {
        return false;
    }

    match role {
        PartyRole::Publisher => {
            !agreement.client_signed
                && agreement.status == AgreementStatus::PendingPublisherSignature
        }
        PartyRole::Applicant => {
            !agreement.agency_signed
                && agreement.status == AgreementStatus::PendingApplicantSignature
        }
        PartyRole::Observer => false,
    }
}

/// Whether `role` must submit a fee quote before signing.
///
/// Only an agency-category applicant can be gated. Three sources may assert
/// the gate and any one of them wins; a stale or missing hint from one
/// source must not block a legally required fee step.
pub(crate) fn requires_fees_input(agreement: &AgreementSnapshot, role: PartyRole) -> bool {
    if role != PartyRole::Applicant {
        return false;
    }
    if !agreement.applicant_category.requires_fee_quote() {
        return false;
    }

    if agreement.pending_action == Some(PendingAction::EnterFees) {
        return true;
    }

    if agreement.status == AgreementStatus::PendingApplicantFees {
        return true;
    }

    matches!(
        agreement.fee_state(),
        Some(fees) if fees.requires_input && !agreement.agency_signed
    )
}
