use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::authority::{AgreementAuthority, AuthorityError, ContractDirectory};
use super::conflicts::BookingConflictReport;
use super::domain::{
    AgreementId, AgreementKind, AgreementSnapshot, AgreementStatus, ApplicationId, ContractId,
    CustomDocument, SignatureRequest, SnapshotIntegrityError, UserId, WithdrawalOutcome,
};
use super::evaluation::{self, ActionEligibility};
use super::fees::{
    self, FeeQuote, FeeSubmission, FeeValidationError, NormalizedFees, WithdrawalFeePolicy,
};
use super::role::{resolve_role, PartyRole, RoleResolutionError};

/// Default page size for agreement listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Facade sequencing role resolution, eligibility evaluation, fee gating,
/// and command dispatch, identical regardless of which party is acting.
///
/// The service never mutates state locally. A successful command's returned
/// snapshot fully replaces the previous one; on any error the previously
/// held snapshot remains valid.
pub struct AgreementLifecycleService<A, C> {
    authority: Arc<A>,
    contracts: Arc<C>,
    fee_policy: WithdrawalFeePolicy,
}

impl<A, C> AgreementLifecycleService<A, C>
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    pub fn new(authority: Arc<A>, contracts: Arc<C>, fee_policy: WithdrawalFeePolicy) -> Self {
        Self {
            authority,
            contracts,
            fee_policy,
        }
    }

    pub fn fee_policy(&self) -> &WithdrawalFeePolicy {
        &self.fee_policy
    }

    /// Fetch one agreement and validate its cross-field invariants.
    pub fn agreement(&self, id: AgreementId) -> Result<AgreementSnapshot, AgreementServiceError> {
        let snapshot = self.authority.fetch(id)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Agreements the user is party to, optionally filtered by status.
    pub fn my_agreements(
        &self,
        user: UserId,
        status: Option<AgreementStatus>,
        limit: usize,
    ) -> Result<Vec<AgreementSnapshot>, AgreementServiceError> {
        let snapshots = self.authority.list(user, status, limit)?;
        for snapshot in &snapshots {
            snapshot.validate()?;
        }
        Ok(snapshots)
    }

    /// Agreements opened for one contract, e.g. when navigating from a
    /// contract page rather than the agreement list.
    pub fn by_contract(
        &self,
        contract: ContractId,
    ) -> Result<Vec<AgreementSnapshot>, AgreementServiceError> {
        let snapshots = self.authority.find_by_contract(contract)?;
        for snapshot in &snapshots {
            snapshot.validate()?;
        }
        Ok(snapshots)
    }

    /// How many of the user's agreements are waiting on them (fees or
    /// signature). Drives list badges.
    pub fn pending_count(&self, user: UserId) -> Result<usize, AgreementServiceError> {
        let snapshots = self.my_agreements(user, None, DEFAULT_LIST_LIMIT)?;
        let mut count = 0;
        for snapshot in &snapshots {
            if evaluation::evaluate(snapshot, user)?.needs_action() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Evaluate what `user` may do next on an already-fetched snapshot.
    pub fn eligibility(
        &self,
        agreement: &AgreementSnapshot,
        user: UserId,
    ) -> Result<ActionEligibility, AgreementServiceError> {
        Ok(evaluation::evaluate(agreement, user)?)
    }

    /// Publisher selects the auto-generated platform agreement.
    pub fn choose_platform(
        &self,
        id: AgreementId,
        user: UserId,
    ) -> Result<AgreementSnapshot, AgreementServiceError> {
        let snapshot = self.prepare_document_choice(id, user)?;
        let next = self
            .authority
            .choose_type(snapshot.id, user, AgreementKind::Platform)?;
        next.validate()?;
        Ok(next)
    }

    /// Publisher replaces the auto-generated document with an uploaded one.
    pub fn upload_custom(
        &self,
        id: AgreementId,
        user: UserId,
        document: CustomDocument,
    ) -> Result<AgreementSnapshot, AgreementServiceError> {
        let snapshot = self.prepare_document_choice(id, user)?;
        let next = self.authority.upload_custom(snapshot.id, user, document)?;
        next.validate()?;
        Ok(next)
    }

    /// Applicant submits their fee quote. Validation is local and happens
    /// before any command is sent.
    pub fn submit_fees(
        &self,
        id: AgreementId,
        user: UserId,
        submission: FeeSubmission,
    ) -> Result<AgreementSnapshot, AgreementServiceError> {
        let normalized: NormalizedFees = fees::normalize(submission)?;

        let snapshot = self.agreement(id)?;
        match resolve_role(&snapshot, user)? {
            PartyRole::Applicant => {}
            PartyRole::Observer => {
                return Err(AgreementServiceError::NotAParty { id, user });
            }
            PartyRole::Publisher => {
                return Err(AgreementServiceError::RoleNotPermitted {
                    id,
                    expected: PartyRole::Applicant,
                    action: "submit fees for",
                });
            }
        }

        let next = self.authority.update_fees(id, user, &normalized)?;
        next.validate()?;
        Ok(next)
    }

    /// Attempt a signature.
    ///
    /// A fee-gated applicant must have completed fee submission first: the
    /// gate refuses locally, before the authority is contacted, so the two
    /// commands can never race. Booking overlaps come back as a typed
    /// conflict with full detail.
    pub fn sign(
        &self,
        id: AgreementId,
        user: UserId,
        request: &SignatureRequest,
    ) -> Result<AgreementSnapshot, AgreementServiceError> {
        let snapshot = self.agreement(id)?;
        let eligibility = evaluation::evaluate(&snapshot, user)?;

        if eligibility.role == PartyRole::Observer {
            return Err(AgreementServiceError::NotAParty { id, user });
        }
        if eligibility.requires_fees_input {
            return Err(AgreementServiceError::FeesOutstanding { id });
        }
        if !eligibility.can_sign {
            return Err(AgreementServiceError::SignatureNotAllowed {
                id,
                status: snapshot.status,
            });
        }

        match self.authority.sign(id, user, request) {
            Ok(next) => {
                next.validate()?;
                Ok(next)
            }
            Err(AuthorityError::Overlap { conflicts }) => Err(
                AgreementServiceError::BookingConflict(BookingConflictReport::new(conflicts)),
            ),
            Err(other) => Err(other.into()),
        }
    }

    /// Quote the cancellation fee for withdrawing an application at `now`.
    pub fn withdrawal_quote(
        &self,
        application: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<FeeQuote, AgreementServiceError> {
        let contract = self.contracts.booked_contract(application)?;
        Ok(fees::withdrawal_quote(&contract, now, &self.fee_policy))
    }

    /// Withdraw an application. A fee-required rejection surfaces the quote
    /// so the caller can route the user to payment.
    pub fn withdraw(
        &self,
        application: ApplicationId,
        user: UserId,
        reason: Option<&str>,
    ) -> Result<WithdrawalOutcome, AgreementServiceError> {
        match self.contracts.withdraw(application, user, reason) {
            Err(AuthorityError::FeeRequired { quote }) => {
                Err(AgreementServiceError::WithdrawalBlocked { quote })
            }
            other => Ok(other?),
        }
    }

    fn prepare_document_choice(
        &self,
        id: AgreementId,
        user: UserId,
    ) -> Result<AgreementSnapshot, AgreementServiceError> {
        let snapshot = self.agreement(id)?;
        match resolve_role(&snapshot, user)? {
            PartyRole::Publisher => {}
            PartyRole::Observer => {
                return Err(AgreementServiceError::NotAParty { id, user });
            }
            PartyRole::Applicant => {
                return Err(AgreementServiceError::RoleNotPermitted {
                    id,
                    expected: PartyRole::Publisher,
                    action: "choose the document for",
                });
            }
        }

        if snapshot.status != AgreementStatus::Draft {
            return Err(AgreementServiceError::DocumentLocked {
                id,
                status: snapshot.status,
            });
        }
        if let Some(existing) = snapshot.document {
            return Err(AgreementServiceError::DocumentAlreadyChosen { id, existing });
        }

        Ok(snapshot)
    }
}

/// Error taxonomy of the orchestrator.
///
/// Validation and data-integrity failures are raised before any command is
/// sent; conflict and authority failures only after the authority responds.
#[derive(Debug, thiserror::Error)]
pub enum AgreementServiceError {
    #[error(transparent)]
    Validation(#[from] FeeValidationError),
    #[error(transparent)]
    Integrity(#[from] SnapshotIntegrityError),
    #[error(transparent)]
    Role(#[from] RoleResolutionError),
    #[error("user {user} is not a party to agreement {id}")]
    NotAParty { id: AgreementId, user: UserId },
    #[error("only the {expected} may {action} agreement {id}")]
    RoleNotPermitted {
        id: AgreementId,
        expected: PartyRole,
        action: &'static str,
    },
    #[error("agreement {id} requires a fee quote before it can be signed")]
    FeesOutstanding { id: AgreementId },
    #[error("agreement {id} cannot be signed while {status}")]
    SignatureNotAllowed {
        id: AgreementId,
        status: AgreementStatus,
    },
    #[error("agreement {id} no longer accepts a document choice ({status})")]
    DocumentLocked {
        id: AgreementId,
        status: AgreementStatus,
    },
    #[error("agreement {id} already carries a {existing} document")]
    DocumentAlreadyChosen {
        id: AgreementId,
        existing: AgreementKind,
    },
    #[error("{0}")]
    BookingConflict(BookingConflictReport),
    #[error("a withdrawal fee of ${:.2} is due before this application can be withdrawn", .quote.amount)]
    WithdrawalBlocked { quote: FeeQuote },
    #[error(transparent)]
    Authority(#[from] AuthorityError),
}
