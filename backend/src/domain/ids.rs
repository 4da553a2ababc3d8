//! Opaque string identifiers for patients, operations, and invoices.
//!
//! Identifiers are generated by an [`IdGenerator`](crate::domain::ports::IdGenerator)
//! and never interpreted by the domain. Construction only rejects blank or
//! padded values so a stray space cannot create a second identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors returned by identifier constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    #[error("{kind} id must not be empty")]
    Empty { kind: &'static str },
    #[error("{kind} id must not have leading or trailing whitespace")]
    Padded { kind: &'static str },
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and construct the identifier.
            pub fn new(id: impl Into<String>) -> Result<Self, IdValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(IdValidationError::Empty { kind: $kind });
                }
                if id.trim() != id {
                    return Err(IdValidationError::Padded { kind: $kind });
                }
                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(value: uuid::Uuid) -> Self {
                Self(value.hyphenated().to_string())
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

define_id!(
    /// Identifier of a patient owned by the patient registry.
    PatientId,
    "patient"
);
define_id!(
    /// Identifier of a [`PatientOperation`](crate::domain::PatientOperation).
    OperationId,
    "operation"
);
define_id!(
    /// Identifier of an [`Invoice`](crate::domain::Invoice).
    InvoiceId,
    "invoice"
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", IdValidationError::Empty { kind: "operation" })]
    #[case("   ", IdValidationError::Empty { kind: "operation" })]
    #[case(" op-1", IdValidationError::Padded { kind: "operation" })]
    fn rejects_blank_and_padded(#[case] raw: &str, #[case] expected: IdValidationError) {
        assert_eq!(OperationId::new(raw), Err(expected));
    }

    #[rstest]
    fn serde_round_trips_as_plain_string() {
        let id = InvoiceId::new("inv-42").expect("valid id");
        let json = serde_json::to_string(&id).expect("serialise");
        assert_eq!(json, "\"inv-42\"");
        let parsed: InvoiceId = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(parsed, id);
    }

    #[rstest]
    fn deserialisation_rejects_blank_ids() {
        let result = serde_json::from_str::<PatientId>("\"\"");
        assert!(result.is_err());
    }
}
