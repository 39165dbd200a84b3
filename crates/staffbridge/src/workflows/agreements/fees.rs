use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ContractSnapshot, ContractStatus, FeeType};

pub const DEFAULT_WITHDRAWAL_HOURS: i64 = 48;
pub const DEFAULT_WITHDRAWAL_PERCENTAGE: f64 = 25.0;

/// Policy dials for the cancellation-fee window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalFeePolicy {
    pub hours_threshold: i64,
    pub percentage: f64,
}

impl WithdrawalFeePolicy {
    pub fn new(hours_threshold: i64, percentage: f64) -> Self {
        let hours_threshold = if hours_threshold > 0 {
            hours_threshold
        } else {
            DEFAULT_WITHDRAWAL_HOURS
        };
        let percentage = if percentage.is_finite() && percentage >= 0.0 {
            percentage
        } else {
            DEFAULT_WITHDRAWAL_PERCENTAGE
        };
        Self {
            hours_threshold,
            percentage,
        }
    }
}

impl Default for WithdrawalFeePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WITHDRAWAL_HOURS, DEFAULT_WITHDRAWAL_PERCENTAGE)
    }
}

/// Fee quote derived from a contract and the current time. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub fee_required: bool,
    pub amount: f64,
    pub hours_threshold: i64,
    pub percentage: f64,
    pub contract_value: f64,
}

/// A fee quote as submitted by an agency applicant: either a bare amount
/// (interpreted as a percentage) or the structured form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FeeSubmission {
    Amount(f64),
    Detailed {
        agency_fees: serde_json::Value,
        #[serde(default)]
        fee_type: Option<FeeType>,
        #[serde(default)]
        fee_description: Option<String>,
    },
}

impl From<NormalizedFees> for FeeSubmission {
    fn from(fees: NormalizedFees) -> Self {
        FeeSubmission::Detailed {
            agency_fees: serde_json::json!(fees.agency_fees),
            fee_type: Some(fees.fee_type),
            fee_description: fees.fee_description,
        }
    }
}

/// The canonical structured form sent to the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFees {
    pub agency_fees: f64,
    pub fee_type: FeeType,
    pub fee_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeeValidationError {
    #[error("agency_fees must be numeric, got {found}")]
    NonNumericAmount { found: String },
    #[error("agency_fees must be a finite, non-negative amount (got {value})")]
    AmountOutOfRange { value: f64 },
}

/// Normalize a fee submission into the structured form.
///
/// Normalization is idempotent: feeding a normalized value back through
/// yields the identical object.
pub fn normalize(submission: FeeSubmission) -> Result<NormalizedFees, FeeValidationError> {
    let (amount, fee_type, fee_description) = match submission {
        FeeSubmission::Amount(amount) => (amount, FeeType::Percentage, None),
        FeeSubmission::Detailed {
            agency_fees,
            fee_type,
            fee_description,
        } => {
            let amount = agency_fees
                .as_f64()
                .ok_or_else(|| FeeValidationError::NonNumericAmount {
                    found: agency_fees.to_string(),
                })?;
            (
                amount,
                fee_type.unwrap_or(FeeType::Percentage),
                fee_description,
            )
        }
    };

    if !amount.is_finite() || amount < 0.0 {
        return Err(FeeValidationError::AmountOutOfRange { value: amount });
    }

    Ok(NormalizedFees {
        agency_fees: amount,
        fee_type,
        fee_description,
    })
}

/// Quote the cancellation fee for withdrawing from `contract` at `now`.
///
/// A fee is owed only when the contract is already booked and the withdrawal
/// lands within `hours_threshold` hours of the start (boundary inclusive; a
/// withdrawal after the start has also missed the window). Pure in
/// `(contract, now)`: no clock reads, no I/O.
pub fn withdrawal_quote(
    contract: &ContractSnapshot,
    now: DateTime<Utc>,
    policy: &WithdrawalFeePolicy,
) -> FeeQuote {
    let booked = contract.status == ContractStatus::Booked;
    let window_opens = contract.start_date - Duration::hours(policy.hours_threshold);
    let fee_required = booked && now >= window_opens;

    let contract_value = contract.billable_value().unwrap_or(0.0);
    let amount = if fee_required {
        round_cents(contract_value * policy.percentage / 100.0)
    } else {
        0.0
    };

    FeeQuote {
        fee_required,
        amount,
        hours_threshold: policy.hours_threshold,
        percentage: policy.percentage,
        contract_value,
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
