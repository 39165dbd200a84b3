use serde::Serialize;

use super::domain::{AgreementId, AgreementSnapshot, AgreementStatus};
use super::evaluation::ActionEligibility;
use super::role::PartyRole;

/// Badge tone for a status chip.
pub fn badge_tone(status: AgreementStatus) -> &'static str {
    match status {
        AgreementStatus::Draft => "secondary",
        AgreementStatus::PendingApplicantFees => "warning",
        AgreementStatus::PendingApplicantSignature => "info",
        AgreementStatus::PendingPublisherSignature => "warning",
        AgreementStatus::FullySigned => "success",
        AgreementStatus::Rejected => "danger",
        AgreementStatus::Expired => "dark",
    }
}

/// Status text as seen from one side of the agreement.
///
/// The same state reads differently per party: pending-publisher is
/// "Sign Now" to the publisher and "Waiting for Publisher" to the applicant.
/// Observers get the neutral description.
pub fn status_text(status: AgreementStatus, role: PartyRole) -> &'static str {
    match (status, role) {
        (AgreementStatus::Draft, PartyRole::Publisher) => "Choose Agreement Type",
        (AgreementStatus::Draft, _) => "Draft",
        (AgreementStatus::PendingApplicantFees, PartyRole::Applicant) => "Enter Your Fees",
        (AgreementStatus::PendingApplicantFees, _) => "Waiting for Applicant Fees",
        (AgreementStatus::PendingApplicantSignature, PartyRole::Applicant) => "Sign Now",
        (AgreementStatus::PendingApplicantSignature, _) => "Waiting for Applicant Signature",
        (AgreementStatus::PendingPublisherSignature, PartyRole::Publisher) => "Sign Now",
        (AgreementStatus::PendingPublisherSignature, _) => "Waiting for Publisher",
        (AgreementStatus::FullySigned, _) => "Fully Signed",
        (AgreementStatus::Rejected, _) => "Rejected",
        (AgreementStatus::Expired, _) => "Expired",
    }
}

/// Role-aware status line. A `status_message` from the authority always wins.
pub fn display_status(agreement: &AgreementSnapshot, role: PartyRole) -> String {
    match &agreement.status_message {
        Some(message) => message.clone(),
        None => status_text(agreement.status, role).to_string(),
    }
}

/// Serialized row for agreement list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AgreementListView {
    pub id: AgreementId,
    pub agreement_number: String,
    pub status: &'static str,
    pub badge: &'static str,
    pub status_text: String,
    pub needs_action: bool,
}

impl AgreementListView {
    pub fn from_snapshot(snapshot: &AgreementSnapshot, eligibility: &ActionEligibility) -> Self {
        Self {
            id: snapshot.id,
            agreement_number: snapshot.agreement_number.clone(),
            status: snapshot.status.label(),
            badge: badge_tone(snapshot.status),
            status_text: display_status(snapshot, eligibility.role),
            needs_action: eligibility.needs_action(),
        }
    }
}

/// Full detail payload for one agreement as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct AgreementDetailView {
    pub agreement: AgreementSnapshot,
    pub role: PartyRole,
    pub can_sign: bool,
    pub requires_fees_input: bool,
    pub needs_action: bool,
    pub status_text: String,
    pub badge: &'static str,
}

impl AgreementDetailView {
    pub fn new(agreement: AgreementSnapshot, eligibility: ActionEligibility) -> Self {
        let status_text = display_status(&agreement, eligibility.role);
        let badge = badge_tone(agreement.status);
        Self {
            role: eligibility.role,
            can_sign: eligibility.can_sign,
            requires_fees_input: eligibility.requires_fees_input,
            needs_action: eligibility.needs_action(),
            status_text,
            badge,
            agreement,
        }
    }
}
