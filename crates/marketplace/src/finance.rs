//! Payout batches and refund requests (read-only here; owned by scheduled
//! jobs and the payment processor).

use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use detailr_core::{BookingId, DetailerId, DomainError, Money, PayoutId, ProfileId, RefundId};

/// Status of a weekly transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(DomainError::unknown("transfer status", s)),
        }
    }
}

/// Aggregated detailer earnings for a period, paid in one external transfer.
///
/// Weekly transfers carry a `transfer_status`; legacy batches only record
/// whether an external payout id exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutBatch {
    pub id: PayoutId,
    pub detailer_id: DetailerId,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub amount: Money,
    pub booking_count: i64,
    pub transfer_status: Option<TransferStatus>,
    pub external_payout_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PayoutBatch {
    /// Paid out, under either batch model.
    pub fn is_settled(&self) -> bool {
        match self.transfer_status {
            Some(status) => status == TransferStatus::Succeeded,
            None => self.external_payout_id.is_some(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

impl FromStr for RefundStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::unknown("refund status", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub id: RefundId,
    pub booking_id: BookingId,
    pub requested_by: ProfileId,
    pub amount: Money,
    pub reason: Option<String>,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
}

/// Admin decision on a pending refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundDecision {
    pub approve: bool,
    pub notes: Option<String>,
}

impl RefundDecision {
    pub fn resulting_status(&self) -> RefundStatus {
        if self.approve {
            RefundStatus::Approved
        } else {
            RefundStatus::Rejected
        }
    }
}
