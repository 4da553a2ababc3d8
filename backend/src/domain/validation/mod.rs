//! Pre-persistence business-rule checks for operation requests.
//!
//! Validators are pure: they inspect an [`OperationRequest`] and either pass
//! or return a [`ValidationError`]. [`CompositeValidator`] runs a list of them
//! in order and stops at the first failure, returning it unchanged.

mod cost_consistency;
mod required_fields;

use crate::domain::OperationRequest;
use crate::domain::money::{Money, MoneyError};

pub use cost_consistency::CostConsistencyValidator;
pub use required_fields::RequiredFieldsValidator;

/// Business-rule violations detected before any write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Detail costs do not add up to the estimated cost.
    #[error("amount {estimated} does not equal sum of details {sum}")]
    CostMismatch { estimated: Money, sum: Money },
    /// Detail costs use a different currency from the estimate or each other.
    #[error("cost details must share one currency: {0}")]
    Currency(MoneyError),
    /// A mandatory text field is blank.
    #[error("{field} must not be blank")]
    MissingField { field: &'static str },
    /// Tooth number is not a valid FDI tooth.
    #[error("tooth number {tooth_number} is not a valid FDI tooth")]
    InvalidToothNumber { tooth_number: u8 },
    /// Note content is blank.
    #[error("note content must not be blank")]
    BlankNote,
    /// Note content carries a NUL character, which text columns cannot hold.
    #[error("note content must not contain NUL characters")]
    NulInNote,
    /// Asset name is not a bare file name.
    #[error("asset name '{name}' must be a bare file name")]
    InvalidAssetName { name: String },
    /// Invoice amount is below zero.
    #[error("invoice amount {amount} must not be negative")]
    NegativeAmount { amount: Money },
}

/// Single business-rule check over an operation request.
#[cfg_attr(test, mockall::automock)]
pub trait OperationValidator: Send + Sync {
    /// Return `Ok(())` when the request satisfies the rule.
    fn validate(&self, request: &OperationRequest) -> Result<(), ValidationError>;
}

/// Ordered, fail-fast chain of validators.
///
/// # Examples
/// ```
/// use clinic_backend::domain::validation::{
///     CompositeValidator, CostConsistencyValidator, OperationValidator,
/// };
/// use clinic_backend::domain::{CurrencyCode, Money, OperationRequest};
/// use rust_decimal::Decimal;
///
/// let pipeline = CompositeValidator::new(vec![Box::new(CostConsistencyValidator)]);
/// let request = OperationRequest {
///     operation_type: "cleaning".to_owned(),
///     description: String::new(),
///     executor: "dr-lee".to_owned(),
///     estimated_cost: Money::new(Decimal::new(1000, 2), CurrencyCode::new("EUR").unwrap()),
///     details: vec![],
/// };
/// assert!(pipeline.validate(&request).is_ok());
/// ```
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn OperationValidator>>,
}

impl CompositeValidator {
    pub fn new(validators: Vec<Box<dyn OperationValidator>>) -> Self {
        Self { validators }
    }

    /// Pipeline used by the operation service: required fields, then costs.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(RequiredFieldsValidator),
            Box::new(CostConsistencyValidator),
        ])
    }

    /// Append a validator to the end of the chain.
    pub fn with(mut self, validator: impl OperationValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl OperationValidator for CompositeValidator {
    fn validate(&self, request: &OperationRequest) -> Result<(), ValidationError> {
        self.validators
            .iter()
            .try_for_each(|validator| validator.validate(request))
    }
}

#[cfg(test)]
mod tests;
