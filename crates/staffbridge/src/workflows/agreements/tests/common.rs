use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::workflows::agreements::authority::{
    AgreementAuthority, AuthorityError, ContractDirectory,
};
use crate::workflows::agreements::domain::{
    AgreementId, AgreementKind, AgreementSnapshot, AgreementStatus, ApplicantCategory,
    ApplicationId, BookingConflict, ContractId, ContractSnapshot, ContractStatus, CustomDocument,
    FeeState, PendingFee, SignatureRequest, UserId, WithdrawalOutcome,
};
use crate::workflows::agreements::fees::{
    withdrawal_quote, NormalizedFees, WithdrawalFeePolicy,
};
use crate::workflows::agreements::service::AgreementLifecycleService;

pub(super) const PUBLISHER: UserId = UserId(1);
pub(super) const APPLICANT: UserId = UserId(2);
pub(super) const OUTSIDER: UserId = UserId(3);

pub(super) fn timestamp(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).expect("valid timestamp")
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Agreement with an agency-category applicant and no server hints, so the
/// local fallback rules are exercised.
pub(super) fn agency_agreement(status: AgreementStatus) -> AgreementSnapshot {
    AgreementSnapshot {
        id: AgreementId(41),
        agreement_number: "AGR-2025-0041".to_string(),
        contract_id: ContractId(77),
        client_user_id: PUBLISHER,
        agency_user_id: APPLICANT,
        applicant_category: ApplicantCategory::Agency,
        status,
        client_signed: false,
        agency_signed: false,
        agreement_data: Default::default(),
        can_sign: None,
        pending_action: None,
        status_message: None,
        document: None,
    }
}

pub(super) fn professional_agreement(status: AgreementStatus) -> AgreementSnapshot {
    AgreementSnapshot {
        applicant_category: ApplicantCategory::Professional,
        ..agency_agreement(status)
    }
}

pub(super) fn fees_pending_state() -> FeeState {
    FeeState {
        requires_input: true,
        agency_fees: None,
        fee_type: None,
        fee_description: None,
    }
}

pub(super) fn booked_contract(start: DateTime<Utc>, value: Option<f64>) -> ContractSnapshot {
    ContractSnapshot {
        id: ContractId(77),
        start_date: start,
        end_date: start + chrono::Duration::days(30),
        status: ContractStatus::Booked,
        contract_value: value,
        annual_salary: None,
        daily_rate: None,
    }
}

pub(super) fn sample_conflicts() -> Vec<BookingConflict> {
    vec![BookingConflict {
        id: ContractId(7),
        start_date: date(2025, 1, 1),
        end_date: date(2025, 1, 10),
        status: "booked".to_string(),
    }]
}

/// Authority test double that owns transitions the way the remote service
/// does. When `overlap` is non-empty, the publisher's finalizing signature
/// is rejected with those conflicts.
#[derive(Default)]
pub(super) struct MemoryAuthority {
    agreements: Mutex<HashMap<AgreementId, AgreementSnapshot>>,
    overlap: Mutex<Vec<BookingConflict>>,
    sign_calls: AtomicUsize,
}

impl MemoryAuthority {
    pub(super) fn seeded(snapshot: AgreementSnapshot) -> Self {
        let authority = Self::default();
        authority.seed(snapshot);
        authority
    }

    pub(super) fn seed(&self, snapshot: AgreementSnapshot) {
        self.agreements
            .lock()
            .expect("authority mutex poisoned")
            .insert(snapshot.id, snapshot);
    }

    pub(super) fn reject_finalize_with(&self, conflicts: Vec<BookingConflict>) {
        *self.overlap.lock().expect("authority mutex poisoned") = conflicts;
    }

    pub(super) fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::Relaxed)
    }

    pub(super) fn stored(&self, id: AgreementId) -> Option<AgreementSnapshot> {
        self.agreements
            .lock()
            .expect("authority mutex poisoned")
            .get(&id)
            .cloned()
    }
}

impl AgreementAuthority for MemoryAuthority {
    fn fetch(&self, id: AgreementId) -> Result<AgreementSnapshot, AuthorityError> {
        self.stored(id).ok_or(AuthorityError::NotFound)
    }

    fn list(
        &self,
        user: UserId,
        status: Option<AgreementStatus>,
        limit: usize,
    ) -> Result<Vec<AgreementSnapshot>, AuthorityError> {
        let guard = self.agreements.lock().expect("authority mutex poisoned");
        Ok(guard
            .values()
            .filter(|snapshot| {
                snapshot.client_user_id == user || snapshot.agency_user_id == user
            })
            .filter(|snapshot| status.map_or(true, |wanted| snapshot.status == wanted))
            .take(limit)
            .cloned()
            .collect())
    }

    fn find_by_contract(
        &self,
        contract: ContractId,
    ) -> Result<Vec<AgreementSnapshot>, AuthorityError> {
        let guard = self.agreements.lock().expect("authority mutex poisoned");
        Ok(guard
            .values()
            .filter(|snapshot| snapshot.contract_id == contract)
            .cloned()
            .collect())
    }

    fn choose_type(
        &self,
        id: AgreementId,
        _user: UserId,
        kind: AgreementKind,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        let mut guard = self.agreements.lock().expect("authority mutex poisoned");
        let snapshot = guard.get_mut(&id).ok_or(AuthorityError::NotFound)?;
        snapshot.document = Some(kind);
        snapshot.status = if snapshot.applicant_category.requires_fee_quote() {
            snapshot.agreement_data.fees = Some(fees_pending_state());
            AgreementStatus::PendingApplicantFees
        } else {
            AgreementStatus::PendingApplicantSignature
        };
        Ok(snapshot.clone())
    }

    fn upload_custom(
        &self,
        id: AgreementId,
        user: UserId,
        _document: CustomDocument,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        self.choose_type(id, user, AgreementKind::Custom)
    }

    fn update_fees(
        &self,
        id: AgreementId,
        _user: UserId,
        fees: &NormalizedFees,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        let mut guard = self.agreements.lock().expect("authority mutex poisoned");
        let snapshot = guard.get_mut(&id).ok_or(AuthorityError::NotFound)?;
        snapshot.agreement_data.fees = Some(FeeState {
            requires_input: false,
            agency_fees: Some(fees.agency_fees),
            fee_type: Some(fees.fee_type),
            fee_description: fees.fee_description.clone(),
        });
        snapshot.pending_action = None;
        snapshot.status = AgreementStatus::PendingApplicantSignature;
        Ok(snapshot.clone())
    }

    fn sign(
        &self,
        id: AgreementId,
        user: UserId,
        _request: &SignatureRequest,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        self.sign_calls.fetch_add(1, Ordering::Relaxed);

        let mut guard = self.agreements.lock().expect("authority mutex poisoned");
        let snapshot = guard.get_mut(&id).ok_or(AuthorityError::NotFound)?;

        if user == snapshot.agency_user_id
            && snapshot.status == AgreementStatus::PendingApplicantSignature
        {
            snapshot.agency_signed = true;
            snapshot.status = AgreementStatus::PendingPublisherSignature;
            return Ok(snapshot.clone());
        }

        if user == snapshot.client_user_id
            && snapshot.status == AgreementStatus::PendingPublisherSignature
        {
            let conflicts = self.overlap.lock().expect("authority mutex poisoned");
            if !conflicts.is_empty() {
                return Err(AuthorityError::Overlap {
                    conflicts: conflicts.clone(),
                });
            }
            snapshot.client_signed = true;
            snapshot.status = AgreementStatus::FullySigned;
            return Ok(snapshot.clone());
        }

        Err(AuthorityError::Rejected {
            message: format!("user {user} may not sign agreement {id} in {}", snapshot.status),
        })
    }
}

pub(super) struct UnavailableAuthority;

impl AgreementAuthority for UnavailableAuthority {
    fn fetch(&self, _id: AgreementId) -> Result<AgreementSnapshot, AuthorityError> {
        Err(AuthorityError::Unavailable("authority offline".to_string()))
    }

    fn list(
        &self,
        _user: UserId,
        _status: Option<AgreementStatus>,
        _limit: usize,
    ) -> Result<Vec<AgreementSnapshot>, AuthorityError> {
        Err(AuthorityError::Unavailable("authority offline".to_string()))
    }

    fn find_by_contract(
        &self,
        _contract: ContractId,
    ) -> Result<Vec<AgreementSnapshot>, AuthorityError> {
        Err(AuthorityError::Unavailable("authority offline".to_string()))
    }

    fn choose_type(
        &self,
        _id: AgreementId,
        _user: UserId,
        _kind: AgreementKind,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        Err(AuthorityError::Unavailable("authority offline".to_string()))
    }

    fn upload_custom(
        &self,
        _id: AgreementId,
        _user: UserId,
        _document: CustomDocument,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        Err(AuthorityError::Unavailable("authority offline".to_string()))
    }

    fn update_fees(
        &self,
        _id: AgreementId,
        _user: UserId,
        _fees: &NormalizedFees,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        Err(AuthorityError::Unavailable("authority offline".to_string()))
    }

    fn sign(
        &self,
        _id: AgreementId,
        _user: UserId,
        _request: &SignatureRequest,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        Err(AuthorityError::Unavailable("authority offline".to_string()))
    }
}

/// Contract directory double with a pinned clock so quotes are reproducible.
/// Uses the pay-first flow: a required fee rejects the withdrawal.
pub(super) struct MemoryDirectory {
    contracts: Mutex<HashMap<ApplicationId, ContractSnapshot>>,
    now: DateTime<Utc>,
    policy: WithdrawalFeePolicy,
}

impl MemoryDirectory {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            contracts: Mutex::new(HashMap::new()),
            now,
            policy: WithdrawalFeePolicy::default(),
        }
    }

    pub(super) fn seed(&self, application: ApplicationId, contract: ContractSnapshot) {
        self.contracts
            .lock()
            .expect("directory mutex poisoned")
            .insert(application, contract);
    }
}

impl ContractDirectory for MemoryDirectory {
    fn booked_contract(
        &self,
        application: ApplicationId,
    ) -> Result<ContractSnapshot, AuthorityError> {
        self.contracts
            .lock()
            .expect("directory mutex poisoned")
            .get(&application)
            .cloned()
            .ok_or(AuthorityError::NotFound)
    }

    fn withdraw(
        &self,
        application: ApplicationId,
        _user: UserId,
        reason: Option<&str>,
    ) -> Result<WithdrawalOutcome, AuthorityError> {
        let contract = self.booked_contract(application)?;
        let quote = withdrawal_quote(&contract, self.now, &self.policy);
        if quote.fee_required {
            return Err(AuthorityError::FeeRequired { quote });
        }
        Ok(WithdrawalOutcome {
            withdrawn: true,
            message: Some(match reason {
                Some(reason) => format!("application withdrawn: {reason}"),
                None => "application withdrawn".to_string(),
            }),
            pending_fee: None,
            warning: None,
        })
    }
}

/// Directory double for the withdraw-then-collect flow: the withdrawal goes
/// through but leaves a pending fee on the outcome.
pub(super) struct CollectingDirectory {
    pub(super) pending_amount: f64,
}

impl ContractDirectory for CollectingDirectory {
    fn booked_contract(
        &self,
        _application: ApplicationId,
    ) -> Result<ContractSnapshot, AuthorityError> {
        Err(AuthorityError::NotFound)
    }

    fn withdraw(
        &self,
        _application: ApplicationId,
        _user: UserId,
        _reason: Option<&str>,
    ) -> Result<WithdrawalOutcome, AuthorityError> {
        Ok(WithdrawalOutcome {
            withdrawn: true,
            message: Some("application withdrawn".to_string()),
            pending_fee: Some(PendingFee {
                amount: self.pending_amount,
                payment_url: Some("https://payments.example/session/123".to_string()),
            }),
            warning: Some("You must pay this fee before applying to new contracts.".to_string()),
        })
    }
}

pub(super) fn build_service(
    authority: Arc<MemoryAuthority>,
    directory: Arc<MemoryDirectory>,
) -> AgreementLifecycleService<MemoryAuthority, MemoryDirectory> {
    AgreementLifecycleService::new(authority, directory, WithdrawalFeePolicy::default())
}
