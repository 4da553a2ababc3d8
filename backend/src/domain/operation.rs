//! Patient operation aggregate.
//!
//! A [`PatientOperation`] owns three collections that persistence stores
//! outside the parent row: free-text [`OperationNote`]s (append-only history,
//! newest first), asset references (ordered, replaced wholesale on re-save or
//! appended one at a time), and the per-tooth [`Detail`] cost breakdown.
//!
//! ## Invariants
//! - When `details` is non-empty its costs sum exactly to `estimated_cost`
//!   in the same currency.
//! - `last_update >= creation_date_time`.
//! - `additional_notes` are ordered newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{OperationId, PatientId};
use super::money::{Money, MoneyError};
use super::timestamp::stored_precision;

/// Errors raised when a cost breakdown does not match its estimate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CostBreakdownError {
    #[error("amount {estimated} does not equal sum of details {sum}")]
    Mismatch { estimated: Money, sum: Money },
    #[error("cost details must share one currency: {0}")]
    Currency(#[from] MoneyError),
}

/// Errors raised when an operation aggregate would violate its invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationInvariantError {
    #[error(transparent)]
    CostBreakdown(#[from] CostBreakdownError),
    #[error("last update precedes creation time")]
    LastUpdateBeforeCreation,
}

/// Cost estimate for work on a single tooth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detail {
    pub tooth_number: u8,
    pub estimated_cost: Money,
}

impl Detail {
    pub fn new(tooth_number: u8, estimated_cost: Money) -> Self {
        Self {
            tooth_number,
            estimated_cost,
        }
    }
}

/// Immutable history entry attached to an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationNote {
    content: String,
    creation_time: DateTime<Utc>,
}

impl OperationNote {
    pub fn new(content: impl Into<String>, creation_time: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            creation_time: stored_precision(creation_time),
        }
    }

    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }
}

/// Check that a non-empty cost breakdown sums to the estimated cost.
///
/// An empty breakdown always passes.
pub fn check_cost_breakdown(
    estimated_cost: &Money,
    details: &[Detail],
) -> Result<(), CostBreakdownError> {
    if details.is_empty() {
        return Ok(());
    }
    let sum = Money::sum(details.iter().map(|detail| &detail.estimated_cost))?;
    if sum.try_cmp(estimated_cost)?.is_eq() {
        Ok(())
    } else {
        Err(CostBreakdownError::Mismatch {
            estimated: estimated_cost.clone(),
            sum,
        })
    }
}

/// Input for [`PatientOperation::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientOperationDraft {
    pub id: OperationId,
    pub patient_id: PatientId,
    pub operation_type: String,
    pub description: String,
    pub executor: String,
    pub assets: Vec<String>,
    pub additional_notes: Vec<OperationNote>,
    pub creation_date_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub estimated_cost: Money,
    pub details: Vec<Detail>,
}

/// Replacement values for a full re-save of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRevision {
    pub operation_type: String,
    pub description: String,
    pub executor: String,
    pub assets: Vec<String>,
    pub estimated_cost: Money,
    pub details: Vec<Detail>,
}

/// Clinical operation performed on a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientOperation {
    id: OperationId,
    patient_id: PatientId,
    #[serde(rename = "type")]
    operation_type: String,
    description: String,
    executor: String,
    assets: Vec<String>,
    additional_notes: Vec<OperationNote>,
    creation_date_time: DateTime<Utc>,
    last_update: DateTime<Utc>,
    estimated_cost: Money,
    details: Vec<Detail>,
}

impl PatientOperation {
    /// Build an aggregate, sorting notes newest first and checking invariants.
    pub fn new(draft: PatientOperationDraft) -> Result<Self, OperationInvariantError> {
        let PatientOperationDraft {
            id,
            patient_id,
            operation_type,
            description,
            executor,
            assets,
            mut additional_notes,
            creation_date_time,
            last_update,
            estimated_cost,
            details,
        } = draft;
        let creation_date_time = stored_precision(creation_date_time);
        let last_update = stored_precision(last_update);

        if last_update < creation_date_time {
            return Err(OperationInvariantError::LastUpdateBeforeCreation);
        }
        check_cost_breakdown(&estimated_cost, &details)?;
        // Stable sort keeps insertion order for notes sharing a timestamp.
        additional_notes.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));

        Ok(Self {
            id,
            patient_id,
            operation_type,
            description,
            executor,
            assets,
            additional_notes,
            creation_date_time,
            last_update,
            estimated_cost,
            details,
        })
    }

    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn operation_type(&self) -> &str {
        self.operation_type.as_str()
    }

    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    pub fn executor(&self) -> &str {
        self.executor.as_str()
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Notes ordered newest first.
    pub fn additional_notes(&self) -> &[OperationNote] {
        &self.additional_notes
    }

    pub fn creation_date_time(&self) -> DateTime<Utc> {
        self.creation_date_time
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn estimated_cost(&self) -> &Money {
        &self.estimated_cost
    }

    pub fn details(&self) -> &[Detail] {
        &self.details
    }

    /// Replace the mutable scalar fields and the asset list.
    ///
    /// Notes, identity, and creation time are untouched.
    pub fn revise(
        mut self,
        revision: OperationRevision,
        at: DateTime<Utc>,
    ) -> Result<Self, OperationInvariantError> {
        check_cost_breakdown(&revision.estimated_cost, &revision.details)?;
        let at = stored_precision(at);
        if at < self.creation_date_time {
            return Err(OperationInvariantError::LastUpdateBeforeCreation);
        }
        let OperationRevision {
            operation_type,
            description,
            executor,
            assets,
            estimated_cost,
            details,
        } = revision;
        self.operation_type = operation_type;
        self.description = description;
        self.executor = executor;
        self.assets = assets;
        self.estimated_cost = estimated_cost;
        self.details = details;
        self.last_update = at;
        Ok(self)
    }

    /// Prepend a note and bump `last_update`.
    pub fn append_note(&mut self, note: OperationNote) {
        self.last_update = note.creation_time.max(self.last_update);
        self.additional_notes.insert(0, note);
    }

    /// Append an asset reference and bump `last_update`.
    pub fn append_asset(&mut self, asset_name: impl Into<String>, at: DateTime<Utc>) {
        self.assets.push(asset_name.into());
        self.last_update = stored_precision(at).max(self.last_update);
    }
}
