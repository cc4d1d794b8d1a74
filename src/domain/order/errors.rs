use uuid::Uuid;

use crate::store::StorageError;
use super::value_objects::ResourceKind;

// ============================================================================
// Order Store Errors - the vocabulary surfaced to the booking orchestrator
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderStoreError {
    #[error("Unsupported currency: expected {expected}, got {actual}")]
    UnsupportedCurrency { expected: String, actual: String },

    #[error("{resource} already exists for order {order_id}")]
    DuplicateResource { resource: ResourceKind, order_id: Uuid },

    #[error("Order item id missing for order {0}")]
    InvalidOrderItemId(Uuid),

    #[error("Invalid lease duration: {0} seconds")]
    InvalidLeaseDuration(u64),

    #[error("Invalid transaction state: {0}")]
    FatalTransactionState(String),

    #[error("Storage failure: {0}")]
    Storage(StorageError),
}

impl OrderStoreError {
    /// Name of the booking error the orchestrator should report
    pub fn booking_error_type(&self) -> &'static str {
        match self {
            OrderStoreError::UnsupportedCurrency { .. } => "UnsupportedCurrencyError",
            OrderStoreError::DuplicateResource { .. } => "OrderAlreadyExistsError",
            OrderStoreError::InvalidOrderItemId(_) => "InvalidOrderItemIdError",
            OrderStoreError::InvalidLeaseDuration(_)
            | OrderStoreError::FatalTransactionState(_)
            | OrderStoreError::Storage(_) => "InternalApplicationError",
        }
    }

    /// Caller defects that must not be retried
    pub fn is_fatal(&self) -> bool {
        matches!(self, OrderStoreError::FatalTransactionState(_))
    }
}

/// Uniqueness failures become the duplicate error the orchestrator
/// understands; everything else stays opaque
impl From<StorageError> for OrderStoreError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::UniqueViolation { resource, order_id } => {
                OrderStoreError::DuplicateResource { resource, order_id }
            }
            other => OrderStoreError::Storage(other),
        }
    }
}

pub type OrderStoreResult<T> = Result<T, OrderStoreError>;
