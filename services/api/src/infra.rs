use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use staffbridge::config::WithdrawalConfig;
use staffbridge::workflows::agreements::{
    withdrawal_quote, AgreementAuthority, AgreementId, AgreementKind, AgreementSnapshot,
    AgreementStatus, ApplicantCategory, ApplicationId, AuthorityError, BookingConflict,
    ContractDirectory, ContractId, ContractSnapshot, CustomDocument, FeeState, NormalizedFees,
    PendingAction, SignatureRequest, UserId, WithdrawalFeePolicy, WithdrawalOutcome,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn fee_policy_from(config: &WithdrawalConfig) -> WithdrawalFeePolicy {
    WithdrawalFeePolicy::new(config.hours_threshold, config.percentage)
}

/// In-memory stand-in for the remote agreement authority.
///
/// It owns the transitions exactly as the remote service does, so the engine
/// in front of it can be exercised end to end: drafts move through the fee
/// gate, the applicant signs before the publisher, and a finalizing
/// signature can be rejected with booking conflicts.
#[derive(Default)]
pub(crate) struct InMemoryAgreementAuthority {
    agreements: Mutex<HashMap<AgreementId, AgreementSnapshot>>,
    overlaps: Mutex<HashMap<AgreementId, Vec<BookingConflict>>>,
    sequence: AtomicU64,
}

impl InMemoryAgreementAuthority {
    /// Open a draft agreement for an accepted application.
    pub(crate) fn create_draft(
        &self,
        contract_id: ContractId,
        publisher: UserId,
        applicant: UserId,
        category: ApplicantCategory,
    ) -> AgreementSnapshot {
        let serial = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = AgreementSnapshot {
            id: AgreementId(serial),
            agreement_number: format!("AGR-{serial:06}"),
            contract_id,
            client_user_id: publisher,
            agency_user_id: applicant,
            applicant_category: category,
            status: AgreementStatus::Draft,
            client_signed: false,
            agency_signed: false,
            agreement_data: Default::default(),
            can_sign: None,
            pending_action: None,
            status_message: None,
            document: None,
        };
        self.agreements
            .lock()
            .expect("agreement mutex poisoned")
            .insert(snapshot.id, snapshot.clone());
        snapshot
    }

    /// Register overlapping bookings that will block this agreement's
    /// finalizing signature.
    pub(crate) fn block_finalize(&self, id: AgreementId, conflicts: Vec<BookingConflict>) {
        self.overlaps
            .lock()
            .expect("overlap mutex poisoned")
            .insert(id, conflicts);
    }
}

impl AgreementAuthority for InMemoryAgreementAuthority {
    fn fetch(&self, id: AgreementId) -> Result<AgreementSnapshot, AuthorityError> {
        self.agreements
            .lock()
            .expect("agreement mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or(AuthorityError::NotFound)
    }

    fn list(
        &self,
        user: UserId,
        status: Option<AgreementStatus>,
        limit: usize,
    ) -> Result<Vec<AgreementSnapshot>, AuthorityError> {
        let guard = self.agreements.lock().expect("agreement mutex poisoned");
        let mut snapshots: Vec<AgreementSnapshot> = guard
            .values()
            .filter(|snapshot| {
                snapshot.client_user_id == user || snapshot.agency_user_id == user
            })
            .filter(|snapshot| status.map_or(true, |wanted| snapshot.status == wanted))
            .cloned()
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.id.0);
        snapshots.truncate(limit);
        Ok(snapshots)
    }

    fn find_by_contract(
        &self,
        contract: ContractId,
    ) -> Result<Vec<AgreementSnapshot>, AuthorityError> {
        let guard = self.agreements.lock().expect("agreement mutex poisoned");
        let mut snapshots: Vec<AgreementSnapshot> = guard
            .values()
            .filter(|snapshot| snapshot.contract_id == contract)
            .cloned()
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.id.0);
        Ok(snapshots)
    }

    fn choose_type(
        &self,
        id: AgreementId,
        user: UserId,
        kind: AgreementKind,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        let mut guard = self.agreements.lock().expect("agreement mutex poisoned");
        let snapshot = guard.get_mut(&id).ok_or(AuthorityError::NotFound)?;

        if user != snapshot.client_user_id {
            return Err(AuthorityError::Rejected {
                message: "only the contract publisher selects the agreement document".to_string(),
            });
        }
        if snapshot.status != AgreementStatus::Draft || snapshot.document.is_some() {
            return Err(AuthorityError::Rejected {
                message: format!("agreement {id} is past document selection"),
            });
        }

        snapshot.document = Some(kind);
        if snapshot.applicant_category.requires_fee_quote() {
            snapshot.status = AgreementStatus::PendingApplicantFees;
            snapshot.pending_action = Some(PendingAction::EnterFees);
            snapshot.agreement_data.fees = Some(FeeState {
                requires_input: true,
                ..Default::default()
            });
            snapshot.status_message = Some("Waiting for the applicant's fee quote".to_string());
        } else {
            snapshot.status = AgreementStatus::PendingApplicantSignature;
            snapshot.status_message = Some("Waiting for the applicant's signature".to_string());
        }
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
        user: UserId,
        fees: &NormalizedFees,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        let mut guard = self.agreements.lock().expect("agreement mutex poisoned");
        let snapshot = guard.get_mut(&id).ok_or(AuthorityError::NotFound)?;

        if user != snapshot.agency_user_id {
            return Err(AuthorityError::Rejected {
                message: "only the applicant submits agency fees".to_string(),
            });
        }
        if snapshot.status != AgreementStatus::PendingApplicantFees {
            return Err(AuthorityError::Rejected {
                message: format!("agreement {id} is not collecting fees"),
            });
        }

        snapshot.agreement_data.fees = Some(FeeState {
            requires_input: false,
            agency_fees: Some(fees.agency_fees),
            fee_type: Some(fees.fee_type),
            fee_description: fees.fee_description.clone(),
        });
        snapshot.pending_action = None;
        snapshot.status = AgreementStatus::PendingApplicantSignature;
        snapshot.status_message = Some("Waiting for the applicant's signature".to_string());
        Ok(snapshot.clone())
    }

    fn sign(
        &self,
        id: AgreementId,
        user: UserId,
        _request: &SignatureRequest,
    ) -> Result<AgreementSnapshot, AuthorityError> {
        let mut guard = self.agreements.lock().expect("agreement mutex poisoned");
        let snapshot = guard.get_mut(&id).ok_or(AuthorityError::NotFound)?;

        if user == snapshot.agency_user_id
            && snapshot.status == AgreementStatus::PendingApplicantSignature
        {
            snapshot.agency_signed = true;
            snapshot.status = AgreementStatus::PendingPublisherSignature;
            snapshot.status_message = Some("Waiting for the publisher's signature".to_string());
            return Ok(snapshot.clone());
        }

        if user == snapshot.client_user_id
            && snapshot.status == AgreementStatus::PendingPublisherSignature
        {
            let overlaps = self.overlaps.lock().expect("overlap mutex poisoned");
            if let Some(conflicts) = overlaps.get(&id).filter(|c| !c.is_empty()) {
                return Err(AuthorityError::Overlap {
                    conflicts: conflicts.clone(),
                });
            }
            snapshot.client_signed = true;
            snapshot.status = AgreementStatus::FullySigned;
            snapshot.status_message = Some("Fully signed".to_string());
            return Ok(snapshot.clone());
        }

        Err(AuthorityError::Rejected {
            message: format!(
                "user {user} may not sign agreement {id} while {}",
                snapshot.status
            ),
        })
    }
}

/// In-memory contract/application directory using the pay-first withdrawal
/// flow: a withdrawal landing inside the fee window is rejected with the
/// quote until the fee is settled out of band.
pub(crate) struct InMemoryContractDirectory {
    contracts: Mutex<HashMap<ApplicationId, ContractSnapshot>>,
    policy: WithdrawalFeePolicy,
    fixed_now: Option<DateTime<Utc>>,
}

impl InMemoryContractDirectory {
    pub(crate) fn new(policy: WithdrawalFeePolicy) -> Self {
        Self {
            contracts: Mutex::new(HashMap::new()),
            policy,
            fixed_now: None,
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn with_clock(policy: WithdrawalFeePolicy, now: DateTime<Utc>) -> Self {
        Self {
            contracts: Mutex::new(HashMap::new()),
            policy,
            fixed_now: Some(now),
        }
    }

    pub(crate) fn seed(&self, application: ApplicationId, contract: ContractSnapshot) {
        self.contracts
            .lock()
            .expect("contract mutex poisoned")
            .insert(application, contract);
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }
}

impl ContractDirectory for InMemoryContractDirectory {
    fn booked_contract(
        &self,
        application: ApplicationId,
    ) -> Result<ContractSnapshot, AuthorityError> {
        self.contracts
            .lock()
            .expect("contract mutex poisoned")
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
        let quote = withdrawal_quote(&contract, self.now(), &self.policy);
        if quote.fee_required {
            return Err(AuthorityError::FeeRequired { quote });
        }

        self.contracts
            .lock()
            .expect("contract mutex poisoned")
            .remove(&application);

        Ok(WithdrawalOutcome {
            withdrawn: true,
            message: Some(match reason {
                Some(reason) => format!("application withdrawn ({reason})"),
                None => "application withdrawn".to_string(),
            }),
            pending_fee: None,
            warning: None,
        })
    }
}

pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as RFC 3339 ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use staffbridge::workflows::agreements::ContractStatus;

    fn draft() -> (InMemoryAgreementAuthority, AgreementSnapshot) {
        let authority = InMemoryAgreementAuthority::default();
        let snapshot = authority.create_draft(
            ContractId(500),
            UserId(1),
            UserId(2),
            ApplicantCategory::Agency,
        );
        (authority, snapshot)
    }

    #[test]
    fn choose_type_routes_agencies_through_the_fee_state() {
        let (authority, snapshot) = draft();
        let next = authority
            .choose_type(snapshot.id, UserId(1), AgreementKind::Platform)
            .expect("document chosen");
        assert_eq!(next.status, AgreementStatus::PendingApplicantFees);
        assert_eq!(next.pending_action, Some(PendingAction::EnterFees));
    }

    #[test]
    fn choose_type_skips_the_fee_state_for_professionals() {
        let authority = InMemoryAgreementAuthority::default();
        let snapshot = authority.create_draft(
            ContractId(500),
            UserId(1),
            UserId(2),
            ApplicantCategory::Professional,
        );
        let next = authority
            .choose_type(snapshot.id, UserId(1), AgreementKind::Platform)
            .expect("document chosen");
        assert_eq!(next.status, AgreementStatus::PendingApplicantSignature);
        assert_eq!(next.pending_action, None);
    }

    #[test]
    fn out_of_turn_signatures_are_rejected() {
        let (authority, snapshot) = draft();
        let request = SignatureRequest {
            signature: "sig".to_string(),
        };
        assert!(matches!(
            authority.sign(snapshot.id, UserId(1), &request),
            Err(AuthorityError::Rejected { .. })
        ));
    }

    #[test]
    fn withdraw_inside_the_window_demands_the_fee() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).expect("valid");
        let directory =
            InMemoryContractDirectory::with_clock(WithdrawalFeePolicy::default(), now);
        directory.seed(
            ApplicationId(9),
            ContractSnapshot {
                id: ContractId(500),
                start_date: now + Duration::hours(12),
                end_date: now + Duration::days(30),
                status: ContractStatus::Booked,
                contract_value: Some(1000.0),
                annual_salary: None,
                daily_rate: None,
            },
        );

        match directory.withdraw(ApplicationId(9), UserId(2), None) {
            Err(AuthorityError::FeeRequired { quote }) => assert_eq!(quote.amount, 250.0),
            other => panic!("expected fee-required rejection, got {other:?}"),
        }
    }
}
