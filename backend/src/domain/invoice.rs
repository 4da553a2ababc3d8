//! Invoice aggregate and its status lifecycle.
//!
//! Invoices are created `Pending` and reference an operation by id only;
//! removing an operation does not cascade. The modeled transitions are
//! `Pending -> Paid` and `Pending -> Cancelled`, but transitions out of a
//! terminal state are accepted so that mistaken cancellations can be
//! corrected. [`InvoiceStatus::is_terminal`] lets callers detect that case.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{InvoiceId, OperationId};
use super::money::Money;
use super::timestamp::stored_precision;

/// Error returned when parsing an unknown invoice status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid invoice status '{0}'")]
pub struct ParseInvoiceStatusError(String);

/// Payment state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    /// Stable storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    /// `Paid` and `Cancelled` end the modeled lifecycle.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ParseInvoiceStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ParseInvoiceStatusError(value.to_owned())),
        }
    }
}

/// Errors raised by [`Invoice::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvoiceValidationError {
    #[error("last update precedes creation time")]
    LastUpdateBeforeCreation,
}

/// Input for [`Invoice::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    pub id: InvoiceId,
    pub operation_id: OperationId,
    pub amount: Money,
    pub status: InvoiceStatus,
    pub creation_date_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

/// Bill raised for a patient operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    id: InvoiceId,
    operation_id: OperationId,
    amount: Money,
    status: InvoiceStatus,
    creation_date_time: DateTime<Utc>,
    last_update: DateTime<Utc>,
}

impl Invoice {
    /// Rehydrate an invoice in any status.
    pub fn new(draft: InvoiceDraft) -> Result<Self, InvoiceValidationError> {
        let creation_date_time = stored_precision(draft.creation_date_time);
        let last_update = stored_precision(draft.last_update);
        if last_update < creation_date_time {
            return Err(InvoiceValidationError::LastUpdateBeforeCreation);
        }
        Ok(Self {
            id: draft.id,
            operation_id: draft.operation_id,
            amount: draft.amount,
            status: draft.status,
            creation_date_time,
            last_update,
        })
    }

    /// Issue a new invoice; always `Pending`.
    pub fn issue(
        id: InvoiceId,
        operation_id: OperationId,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Self {
        let now = stored_precision(now);
        Self {
            id,
            operation_id,
            amount,
            status: InvoiceStatus::Pending,
            creation_date_time: now,
            last_update: now,
        }
    }

    pub fn id(&self) -> &InvoiceId {
        &self.id
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn creation_date_time(&self) -> DateTime<Utc> {
        self.creation_date_time
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Move to `status` and stamp `last_update`. Never refused.
    pub fn transition_to(mut self, status: InvoiceStatus, at: DateTime<Utc>) -> Self {
        self.status = status;
        self.last_update = stored_precision(at).max(self.creation_date_time);
        self
    }
}
