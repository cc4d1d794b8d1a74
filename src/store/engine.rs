use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{LeaseRecord, OrderRecord, ResourceKind};

// ============================================================================
// Storage Engine - the outbound contract of the order store
// ============================================================================
//
// Writes that belong to a unit-of-work go through a connection obtained from
// `open_connection` and become visible only on `commit`. Deletions and item
// cancellation are standalone and apply immediately.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Another unit-of-work committed the same id first
    #[error("Uniqueness constraint violated for {resource} {order_id}")]
    UniqueViolation { resource: ResourceKind, order_id: Uuid },

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Exclusively owned by one unit-of-work
    type Connection: Send;

    async fn open_connection(&self) -> Result<Self::Connection, StorageError>;

    /// Returns false when a lease or order already exists for the id
    async fn add_lease(
        &self,
        connection: &mut Self::Connection,
        lease: LeaseRecord,
    ) -> Result<bool, StorageError>;

    /// Returns false when an order already exists for the id
    async fn add_order(
        &self,
        connection: &mut Self::Connection,
        order: OrderRecord,
    ) -> Result<bool, StorageError>;

    /// Absent ids are not an error
    async fn delete_lease(&self, order_id: Uuid) -> Result<(), StorageError>;

    /// Absent ids are not an error
    async fn delete_order(&self, order_id: Uuid) -> Result<(), StorageError>;

    /// Returns whether the order was found
    async fn cancel_order_items(
        &self,
        order_id: Uuid,
        order_item_ids: &[i64],
        customer_initiated: bool,
    ) -> Result<bool, StorageError>;

    /// Publishes every write made through the connection, or none of them
    async fn commit(&self, connection: Self::Connection) -> Result<(), StorageError>;

    /// Discards every write made through the connection
    async fn clear(&self, connection: Self::Connection);
}
