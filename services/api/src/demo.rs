use crate::infra::{parse_datetime, InMemoryAgreementAuthority, InMemoryContractDirectory};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use staffbridge::error::AppError;
use staffbridge::workflows::agreements::{
    display_status, withdrawal_quote, AgreementLifecycleService, AgreementServiceError,
    AgreementSnapshot, ApplicantCategory, ApplicationId, BookingConflict, ContractId,
    ContractSnapshot, ContractStatus, FeeSubmission, PartyRole, SignatureRequest, UserId,
    WithdrawalFeePolicy,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Run the demo with a direct professional applicant (no fee gate)
    #[arg(long)]
    pub(crate) professional: bool,
    /// Inject an overlapping booking so the finalizing signature conflicts
    #[arg(long)]
    pub(crate) with_conflict: bool,
}

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Contract start (RFC 3339, e.g. 2025-07-01T09:00:00Z)
    #[arg(long, value_parser = parse_datetime)]
    pub(crate) start: DateTime<Utc>,
    /// Contract value the fee is computed against
    #[arg(long)]
    pub(crate) value: f64,
    /// Booking status of the contract (booked, open, completed, cancelled)
    #[arg(long, default_value = "booked", value_parser = parse_contract_status)]
    pub(crate) status: ContractStatus,
    /// Withdrawal moment (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_datetime)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Override the fee window in hours
    #[arg(long)]
    pub(crate) hours: Option<i64>,
    /// Override the fee percentage
    #[arg(long)]
    pub(crate) percent: Option<f64>,
}

fn parse_contract_status(raw: &str) -> Result<ContractStatus, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "booked" => Ok(ContractStatus::Booked),
        "open" => Ok(ContractStatus::Open),
        "completed" => Ok(ContractStatus::Completed),
        "cancelled" => Ok(ContractStatus::Cancelled),
        other => Err(format!("unknown contract status '{other}'")),
    }
}

const PUBLISHER: UserId = UserId(1);
const APPLICANT: UserId = UserId(2);

fn print_snapshot(snapshot: &AgreementSnapshot) {
    println!(
        "  [{}] {} | publisher: {} | applicant: {}",
        snapshot.status,
        snapshot.agreement_number,
        display_status(snapshot, PartyRole::Publisher),
        display_status(snapshot, PartyRole::Applicant),
    );
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let category = if args.professional {
        ApplicantCategory::Professional
    } else {
        ApplicantCategory::Agency
    };

    println!("Agreement lifecycle demo ({} applicant)", category.label());

    let authority = Arc::new(InMemoryAgreementAuthority::default());
    let contracts = Arc::new(InMemoryContractDirectory::new(
        WithdrawalFeePolicy::default(),
    ));
    let service = AgreementLifecycleService::new(
        authority.clone(),
        contracts.clone(),
        WithdrawalFeePolicy::default(),
    );

    let draft = authority.create_draft(ContractId(500), PUBLISHER, APPLICANT, category);
    println!("Draft opened:");
    print_snapshot(&draft);

    let chosen = service.choose_platform(draft.id, PUBLISHER)?;
    println!("Publisher selected the platform agreement:");
    print_snapshot(&chosen);

    let eligibility = service.eligibility(&chosen, APPLICANT)?;
    if eligibility.requires_fees_input {
        println!("Fee gate active: the applicant must quote fees before signing");
        let with_fees = service.submit_fees(draft.id, APPLICANT, FeeSubmission::Amount(15.0))?;
        println!("Applicant submitted a 15% fee quote:");
        print_snapshot(&with_fees);
    }

    let signature = SignatureRequest {
        signature: "demo-signature".to_string(),
    };
    let half_signed = service.sign(draft.id, APPLICANT, &signature)?;
    println!("Applicant signed:");
    print_snapshot(&half_signed);

    if args.with_conflict {
        let overlap_start = (Utc::now() + Duration::days(3)).date_naive();
        let overlap_end = overlap_start + Duration::days(9);
        authority.block_finalize(
            draft.id,
            vec![BookingConflict {
                id: ContractId(7),
                start_date: overlap_start,
                end_date: overlap_end,
                status: "booked".to_string(),
            }],
        );

        match service.sign(draft.id, PUBLISHER, &signature) {
            Err(AgreementServiceError::BookingConflict(report)) => {
                println!("Finalizing signature rejected:");
                for line in report.to_string().lines() {
                    println!("  {line}");
                }
            }
            Ok(_) => println!("unexpected: conflict did not trigger"),
            Err(other) => return Err(other.into()),
        }

        println!("Conflict resolved out of band; retrying");
        authority.block_finalize(draft.id, Vec::new());
    }

    let done = service.sign(draft.id, PUBLISHER, &signature)?;
    println!("Publisher counter-signed:");
    print_snapshot(&done);

    let now = Utc::now();
    let contract = ContractSnapshot {
        id: ContractId(501),
        start_date: now + Duration::hours(24),
        end_date: now + Duration::days(60),
        status: ContractStatus::Booked,
        contract_value: Some(2000.0),
        annual_salary: None,
        daily_rate: None,
    };
    contracts.seed(ApplicationId(300), contract);
    let quote = service.withdrawal_quote(ApplicationId(300), now)?;
    println!(
        "Withdrawal pricing for a booked contract starting in 24h: fee_required={} amount=${:.2} ({}% of ${:.2} inside {}h)",
        quote.fee_required, quote.amount, quote.percentage, quote.contract_value, quote.hours_threshold
    );

    Ok(())
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let policy = WithdrawalFeePolicy::new(
        args.hours.unwrap_or(staffbridge::workflows::agreements::DEFAULT_WITHDRAWAL_HOURS),
        args.percent
            .unwrap_or(staffbridge::workflows::agreements::DEFAULT_WITHDRAWAL_PERCENTAGE),
    );
    let now = args.now.unwrap_or_else(Utc::now);
    let contract = ContractSnapshot {
        id: ContractId(0),
        start_date: args.start,
        end_date: args.start + Duration::days(30),
        status: args.status,
        contract_value: Some(args.value),
        annual_salary: None,
        daily_rate: None,
    };

    let quote = withdrawal_quote(&contract, now, &policy);
    match serde_json::to_string_pretty(&quote) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("quote unavailable: {err}"),
    }
    Ok(())
}
