use super::domain::{
    AgreementId, AgreementKind, AgreementSnapshot, AgreementStatus, ApplicationId,
    BookingConflict, ContractId, ContractSnapshot, CustomDocument, SignatureRequest, UserId,
    WithdrawalOutcome,
};
use super::fees::{FeeQuote, NormalizedFees};

/// The remote service that owns agreement state.
///
/// Every method is a single-shot command or query; the engine sends at most
/// one mutating command per orchestration call and treats each returned
/// snapshot as a full replacement for whatever it held before.
pub trait AgreementAuthority: Send + Sync {
    fn fetch(&self, id: AgreementId) -> Result<AgreementSnapshot, AuthorityError>;

    fn list(
        &self,
        user: UserId,
        status: Option<AgreementStatus>,
        limit: usize,
    ) -> Result<Vec<AgreementSnapshot>, AuthorityError>;

    /// Agreements opened for one contract.
    fn find_by_contract(
        &self,
        contract: ContractId,
    ) -> Result<Vec<AgreementSnapshot>, AuthorityError>;

    fn choose_type(
        &self,
        id: AgreementId,
        user: UserId,
        kind: AgreementKind,
    ) -> Result<AgreementSnapshot, AuthorityError>;

    fn upload_custom(
        &self,
        id: AgreementId,
        user: UserId,
        document: CustomDocument,
    ) -> Result<AgreementSnapshot, AuthorityError>;

    fn update_fees(
        &self,
        id: AgreementId,
        user: UserId,
        fees: &NormalizedFees,
    ) -> Result<AgreementSnapshot, AuthorityError>;

    fn sign(
        &self,
        id: AgreementId,
        user: UserId,
        request: &SignatureRequest,
    ) -> Result<AgreementSnapshot, AuthorityError>;
}

/// Read-only contract/application collaborator used for fee computation and
/// the withdrawal command.
pub trait ContractDirectory: Send + Sync {
    /// The booked contract backing an application.
    fn booked_contract(&self, application: ApplicationId)
        -> Result<ContractSnapshot, AuthorityError>;

    fn withdraw(
        &self,
        application: ApplicationId,
        user: UserId,
        reason: Option<&str>,
    ) -> Result<WithdrawalOutcome, AuthorityError>;
}

/// Failures reported by the external collaborators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthorityError {
    #[error("record not found")]
    NotFound,
    #[error("the applicant holds an overlapping booked contract")]
    Overlap { conflicts: Vec<BookingConflict> },
    #[error("a withdrawal fee of ${:.2} must be settled first", .quote.amount)]
    FeeRequired { quote: FeeQuote },
    #[error("command rejected: {message}")]
    Rejected { message: String },
    #[error("authority unavailable: {0}")]
    Unavailable(String),
}
