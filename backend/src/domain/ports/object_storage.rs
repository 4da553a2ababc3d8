//! Port for storing uploaded asset bytes.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by object storage adapters.
    pub enum ObjectStorageError {
        /// The object could not be written.
        Upload { key: String, message: String } => "upload of {key} failed: {message}",
        /// The key cannot be mapped onto the store.
        InvalidKey { key: String } => "invalid object key: {key}",
    }
}

/// Port for writing binary objects under a key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ObjectStorageError>;
}

/// Build the storage key for an operation asset.
pub fn asset_object_key(operation_id: &crate::domain::OperationId, asset_name: &str) -> String {
    format!("operations/{operation_id}/{asset_name}")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::OperationId;

    #[rstest]
    fn asset_keys_nest_under_operation() {
        let id = OperationId::new("op-7").expect("valid id");
        assert_eq!(asset_object_key(&id, "xray2.png"), "operations/op-7/xray2.png");
    }

    #[rstest]
    fn upload_error_names_key() {
        let err = ObjectStorageError::upload("operations/op-7/xray2.png", "disk full");
        assert!(err.to_string().contains("operations/op-7/xray2.png"));
    }
}
