//! Estimated cost must equal the sum of its per-tooth breakdown.

use super::{OperationValidator, ValidationError};
use crate::domain::OperationRequest;
use crate::domain::operation::{CostBreakdownError, check_cost_breakdown};

/// Fails when a non-empty detail list does not sum to `estimated_cost`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CostConsistencyValidator;

impl OperationValidator for CostConsistencyValidator {
    fn validate(&self, request: &OperationRequest) -> Result<(), ValidationError> {
        check_cost_breakdown(&request.estimated_cost, &request.details).map_err(Into::into)
    }
}

impl From<CostBreakdownError> for ValidationError {
    fn from(value: CostBreakdownError) -> Self {
        match value {
            CostBreakdownError::Mismatch { estimated, sum } => {
                Self::CostMismatch { estimated, sum }
            }
            CostBreakdownError::Currency(error) => Self::Currency(error),
        }
    }
}
