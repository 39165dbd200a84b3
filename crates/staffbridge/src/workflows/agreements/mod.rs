//! Agreement lifecycle decision logic.
//!
//! Snapshots come from the remote agreement authority; this module resolves
//! party roles, evaluates who may act next, gates signatures behind the
//! agency fee quote, prices withdrawals, and interprets booking-conflict
//! rejections. State transitions themselves stay on the authority's side of
//! the [`authority`] traits.

pub mod authority;
pub mod conflicts;
pub mod domain;
pub(crate) mod evaluation;
pub mod fees;
pub mod role;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use authority::{AgreementAuthority, AuthorityError, ContractDirectory};
pub use conflicts::BookingConflictReport;
pub use domain::{
    AgreementData, AgreementId, AgreementKind, AgreementSnapshot, AgreementStatus, ApplicantCategory,
    ApplicationId, BookingConflict, ContractId, ContractSnapshot, ContractStatus, CustomDocument,
    FeeState, FeeType, PendingAction, PendingFee, SignatureRequest, SnapshotIntegrityError, UserId,
    WithdrawalOutcome,
};
pub use evaluation::{evaluate, ActionEligibility};
pub use fees::{
    normalize, withdrawal_quote, FeeQuote, FeeSubmission, FeeValidationError, NormalizedFees,
    WithdrawalFeePolicy, DEFAULT_WITHDRAWAL_HOURS, DEFAULT_WITHDRAWAL_PERCENTAGE,
};
pub use role::{resolve_role, PartyRole, RoleResolutionError};
pub use router::agreement_router;
pub use service::{AgreementLifecycleService, AgreementServiceError, DEFAULT_LIST_LIMIT};
pub use views::{badge_tone, display_status, status_text, AgreementDetailView, AgreementListView};
