use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for agreements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgreementId(pub u64);

/// Identifier wrapper for contracts owned by the contract subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId(pub u64);

/// Identifier wrapper for contract applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub u64);

/// Identifier wrapper for platform users on either side of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for AgreementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical lifecycle states.
///
/// Older records still arrive with pre-rename statuses; they are translated
/// to the canonical variant at deserialization so nothing downstream ever
/// sees an alias. `partially_signed` maps to the pending-publisher state
/// because the applicant always signs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Draft,
    #[serde(alias = "pending_fees")]
    PendingApplicantFees,
    #[serde(alias = "pending_agency")]
    PendingApplicantSignature,
    #[serde(alias = "pending_client", alias = "partially_signed")]
    PendingPublisherSignature,
    FullySigned,
    Rejected,
    Expired,
}

impl AgreementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApplicantFees => "pending_applicant_fees",
            Self::PendingApplicantSignature => "pending_applicant_signature",
            Self::PendingPublisherSignature => "pending_publisher_signature",
            Self::FullySigned => "fully_signed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Terminal states absorb: no signature or fee action is ever valid again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::FullySigned | Self::Rejected | Self::Expired)
    }
}

impl fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category of the applying party. Fee gating applies to agencies and
/// head-hunters; direct professionals never quote fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantCategory {
    Professional,
    Agency,
    HeadHunter,
}

impl ApplicantCategory {
    pub const fn requires_fee_quote(self) -> bool {
        matches!(self, Self::Agency | Self::HeadHunter)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Agency => "agency",
            Self::HeadHunter => "head_hunter",
        }
    }
}

/// Next-step hint computed by the authority. Authoritative when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    EnterFees,
}

/// How an agency fee is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    Percentage,
    Flat,
}

impl FeeType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Flat => "flat",
        }
    }
}

/// Fee block nested under `agreement_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeState {
    #[serde(default, alias = "requiresInput")]
    pub requires_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_fees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_type: Option<FeeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_description: Option<String>,
}

/// Free-form agreement payload; only the fee block is interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgreementData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<FeeState>,
}

/// Document backing an agreement: auto-generated or uploaded, set once in
/// draft, mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementKind {
    Platform,
    Custom,
}

impl AgreementKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for AgreementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Descriptor for an uploaded custom agreement. Storage and rendering belong
/// to the authority; the engine only forwards the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDocument {
    pub file_name: String,
    pub content_type: String,
    pub storage_key: String,
}

/// Opaque signature payload forwarded to the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub signature: String,
}

/// Read model of one agreement as reported by the authority.
///
/// The authority owns every transition; this snapshot is interpreted, never
/// mutated. The optional `can_sign` / `pending_action` hints take strict
/// precedence over locally recomputed fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementSnapshot {
    pub id: AgreementId,
    pub agreement_number: String,
    pub contract_id: ContractId,
    pub client_user_id: UserId,
    pub agency_user_id: UserId,
    pub applicant_category: ApplicantCategory,
    pub status: AgreementStatus,
    pub client_signed: bool,
    pub agency_signed: bool,
    #[serde(default)]
    pub agreement_data: AgreementData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_sign: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<AgreementKind>,
}

impl AgreementSnapshot {
    pub fn fee_state(&self) -> Option<&FeeState> {
        self.agreement_data.fees.as_ref()
    }

    /// Check the cross-field invariants a well-formed snapshot must satisfy.
    ///
    /// `fully_signed` requires both signature flags; `draft` requires
    /// neither; the two parties must be distinct users.
    pub fn validate(&self) -> Result<(), SnapshotIntegrityError> {
        if self.client_user_id == self.agency_user_id {
            return Err(SnapshotIntegrityError::SelfContract {
                id: self.id,
                user: self.client_user_id,
            });
        }

        let flags_consistent = match self.status {
            AgreementStatus::FullySigned => self.client_signed && self.agency_signed,
            AgreementStatus::Draft => !self.client_signed && !self.agency_signed,
            _ => true,
        };
        if !flags_consistent {
            return Err(SnapshotIntegrityError::SignatureFlagsMismatch {
                id: self.id,
                status: self.status,
            });
        }

        // The applicant signs first: a publisher-only signature is unreachable.
        if self.client_signed && !self.agency_signed {
            return Err(SnapshotIntegrityError::SignatureFlagsMismatch {
                id: self.id,
                status: self.status,
            });
        }

        Ok(())
    }
}

/// Snapshot-level data-integrity failures, surfaced distinctly so callers
/// can alert instead of mis-rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotIntegrityError {
    #[error("agreement {id} reports status {status} but its signature flags disagree")]
    SignatureFlagsMismatch {
        id: AgreementId,
        status: AgreementStatus,
    },
    #[error("agreement {id} lists user {user} as both publisher and applicant")]
    SelfContract { id: AgreementId, user: UserId },
}

/// Booking status of a contract in the external contract subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Open,
    Booked,
    Completed,
    Cancelled,
}

/// Read-only view of the contract backing an agreement or application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub id: ContractId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ContractStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_salary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_rate: Option<f64>,
}

impl ContractSnapshot {
    /// The value a cancellation fee is computed against. Contracts carry at
    /// most one of these depending on their type.
    pub fn billable_value(&self) -> Option<f64> {
        self.contract_value.or(self.annual_salary).or(self.daily_rate)
    }
}

/// One overlapping booking reported when a signature attempt cannot be
/// finalized. Transient: never persisted by this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConflict {
    pub id: ContractId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
}

/// Outcome of a withdrawal command against the contract subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalOutcome {
    pub withdrawn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_fee: Option<PendingFee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// A cancellation fee left owing after a withdrawal went through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingFee {
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}
