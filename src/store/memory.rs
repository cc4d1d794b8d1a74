use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::{
    LeaseRecord, OrderItemRecord, OrderItemStatus, OrderRecord, ResourceKind,
};
use super::engine::{StorageEngine, StorageError};

// ============================================================================
// In-Memory Booking Database
// ============================================================================
//
// Tables live behind one read-write lock shared by every connection. A
// connection only stages writes; commit re-checks uniqueness under the write
// lock so that of two racing units-of-work for the same id exactly one wins.
//
// ============================================================================

#[derive(Default)]
struct Tables {
    leases: HashMap<Uuid, LeaseRecord>,
    orders: HashMap<Uuid, OrderRecord>,
    order_items: HashMap<Uuid, Vec<OrderItemRecord>>,
}

/// Writes staged by one unit-of-work
#[derive(Debug)]
pub struct PendingWrites {
    id: Uuid,
    leases: Vec<LeaseRecord>,
    orders: Vec<OrderRecord>,
}

impl PendingWrites {
    fn has_lease(&self, order_id: Uuid) -> bool {
        self.leases.iter().any(|l| l.order_id == order_id)
    }

    fn has_order(&self, order_id: Uuid) -> bool {
        self.orders.iter().any(|o| o.order_id == order_id)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lease(&self, order_id: Uuid) -> Option<LeaseRecord> {
        self.tables.read().await.leases.get(&order_id).cloned()
    }

    pub async fn order(&self, order_id: Uuid) -> Option<OrderRecord> {
        self.tables.read().await.orders.get(&order_id).cloned()
    }

    pub async fn order_items(&self, order_id: Uuid) -> Vec<OrderItemRecord> {
        self.tables
            .read()
            .await
            .order_items
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn lease_count(&self) -> usize {
        self.tables.read().await.leases.len()
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Seed a confirmed item against an order
    pub async fn add_order_item(&self, order_id: Uuid, order_item_id: i64) {
        let mut tables = self.tables.write().await;
        tables.order_items.entry(order_id).or_default().push(OrderItemRecord {
            id: order_item_id,
            order_id,
            status: OrderItemStatus::Confirmed,
        });
    }

    /// Drop leases whose expiry has passed; returns how many were removed
    pub async fn purge_expired_leases(&self, now: DateTime<Utc>) -> usize {
        let mut tables = self.tables.write().await;
        let before = tables.leases.len();
        tables.leases.retain(|_, lease| !lease.is_expired(now));
        let removed = before - tables.leases.len();

        if removed > 0 {
            tracing::info!(removed = removed, "Purged expired leases");
        }
        removed
    }
}

#[async_trait]
impl StorageEngine for InMemoryDatabase {
    type Connection = PendingWrites;

    async fn open_connection(&self) -> Result<Self::Connection, StorageError> {
        Ok(PendingWrites {
            id: Uuid::new_v4(),
            leases: Vec::new(),
            orders: Vec::new(),
        })
    }

    async fn add_lease(
        &self,
        connection: &mut Self::Connection,
        lease: LeaseRecord,
    ) -> Result<bool, StorageError> {
        let order_id = lease.order_id;
        let tables = self.tables.read().await;

        if tables.leases.contains_key(&order_id)
            || tables.orders.contains_key(&order_id)
            || connection.has_lease(order_id)
            || connection.has_order(order_id)
        {
            return Ok(false);
        }

        connection.leases.push(lease);
        Ok(true)
    }

    async fn add_order(
        &self,
        connection: &mut Self::Connection,
        order: OrderRecord,
    ) -> Result<bool, StorageError> {
        let order_id = order.order_id;
        let tables = self.tables.read().await;

        if tables.orders.contains_key(&order_id) || connection.has_order(order_id) {
            return Ok(false);
        }

        connection.orders.push(order);
        Ok(true)
    }

    async fn delete_lease(&self, order_id: Uuid) -> Result<(), StorageError> {
        self.tables.write().await.leases.remove(&order_id);
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        tables.orders.remove(&order_id);
        tables.order_items.remove(&order_id);
        Ok(())
    }

    async fn cancel_order_items(
        &self,
        order_id: Uuid,
        order_item_ids: &[i64],
        customer_initiated: bool,
    ) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;

        if !tables.orders.contains_key(&order_id) {
            return Ok(false);
        }

        let status = OrderItemStatus::cancelled(customer_initiated);
        if let Some(items) = tables.order_items.get_mut(&order_id) {
            for item in items
                .iter_mut()
                .filter(|item| order_item_ids.contains(&item.id) && !item.status.is_cancelled())
            {
                item.status = status;
            }
        }

        Ok(true)
    }

    async fn commit(&self, connection: Self::Connection) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;

        // Validate everything before applying anything
        for lease in &connection.leases {
            if tables.leases.contains_key(&lease.order_id) || tables.orders.contains_key(&lease.order_id) {
                return Err(StorageError::UniqueViolation {
                    resource: ResourceKind::Lease,
                    order_id: lease.order_id,
                });
            }
        }
        for order in &connection.orders {
            if tables.orders.contains_key(&order.order_id) {
                return Err(StorageError::UniqueViolation {
                    resource: ResourceKind::Order,
                    order_id: order.order_id,
                });
            }
        }

        let PendingWrites { id, leases, orders } = connection;
        let (lease_count, order_count) = (leases.len(), orders.len());

        for lease in leases {
            tables.leases.insert(lease.order_id, lease);
        }
        // The lease is superseded by the order it held the slot for
        for order in orders {
            tables.leases.remove(&order.order_id);
            tables.orders.insert(order.order_id, order);
        }

        tracing::debug!(
            connection_id = %id,
            leases = lease_count,
            orders = order_count,
            "Committed pending writes"
        );
        Ok(())
    }

    async fn clear(&self, connection: Self::Connection) {
        tracing::debug!(
            connection_id = %connection.id,
            leases = connection.leases.len(),
            orders = connection.orders.len(),
            "Discarded pending writes"
        );
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
