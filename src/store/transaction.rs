use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{LeaseRecord, OrderRecord, OrderStoreError, OrderStoreResult};
use crate::models::FlowStage;
use super::engine::StorageEngine;

// ============================================================================
// Transaction Handle - one unit-of-work on one storage connection
// ============================================================================
//
// States:
// - Open: connection held, writes are staged
// - Committed: writes published, connection released
// - RolledBack: writes discarded, connection released
//
// Committed and RolledBack are terminal. Writing through, or completing, a
// finalized handle is a caller defect and fails with FatalTransactionState.
// Rolling back an already rolled back handle is a no-op.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Open,
    Committed,
    RolledBack,
}

enum TransactionState<C> {
    Open(C),
    Committed,
    RolledBack,
}

pub struct TransactionHandle<E: StorageEngine> {
    id: Uuid,
    stage: FlowStage,
    engine: Arc<E>,
    state: TransactionState<E::Connection>,
}

impl<E: StorageEngine> TransactionHandle<E> {
    /// Open a fresh connection. The stage is carried for logging only.
    pub async fn begin(engine: Arc<E>, stage: FlowStage) -> OrderStoreResult<Self> {
        let connection = engine.open_connection().await?;
        let id = Uuid::now_v7();

        tracing::debug!(transaction_id = %id, stage = ?stage, "Transaction opened");

        Ok(Self {
            id,
            stage,
            engine,
            state: TransactionState::Open(connection),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn status(&self) -> TransactionStatus {
        match self.state {
            TransactionState::Open(_) => TransactionStatus::Open,
            TransactionState::Committed => TransactionStatus::Committed,
            TransactionState::RolledBack => TransactionStatus::RolledBack,
        }
    }

    fn finalized_error(&self, action: &str) -> OrderStoreError {
        OrderStoreError::FatalTransactionState(format!(
            "{} on transaction {} which is already {:?}",
            action,
            self.id,
            self.status()
        ))
    }

    fn connection(&mut self) -> OrderStoreResult<&mut E::Connection> {
        let status = self.status();
        match &mut self.state {
            TransactionState::Open(connection) => Ok(connection),
            _ => Err(OrderStoreError::FatalTransactionState(format!(
                "write on transaction {} which is already {:?}",
                self.id, status
            ))),
        }
    }

    /// Stage a lease write; false means the id is already taken
    pub async fn add_lease(&mut self, lease: LeaseRecord) -> OrderStoreResult<bool> {
        let engine = Arc::clone(&self.engine);
        let connection = self.connection()?;
        Ok(engine.add_lease(connection, lease).await?)
    }

    /// Stage an order write; false means the id is already taken
    pub async fn add_order(&mut self, order: OrderRecord) -> OrderStoreResult<bool> {
        let engine = Arc::clone(&self.engine);
        let connection = self.connection()?;
        Ok(engine.add_order(connection, order).await?)
    }

    /// Commit all staged writes. A failed commit leaves the handle rolled back.
    pub async fn complete(&mut self) -> OrderStoreResult<()> {
        match std::mem::replace(&mut self.state, TransactionState::RolledBack) {
            TransactionState::Open(connection) => {
                self.engine.commit(connection).await?;
                self.state = TransactionState::Committed;
                tracing::debug!(transaction_id = %self.id, stage = ?self.stage, "Transaction committed");
                Ok(())
            }
            finalized => {
                self.state = finalized;
                Err(self.finalized_error("commit"))
            }
        }
    }

    /// Discard all staged writes and release the connection
    pub async fn rollback(&mut self) -> OrderStoreResult<()> {
        match std::mem::replace(&mut self.state, TransactionState::RolledBack) {
            TransactionState::Open(connection) => {
                self.engine.clear(connection).await;
                tracing::debug!(transaction_id = %self.id, stage = ?self.stage, "Transaction rolled back");
                Ok(())
            }
            TransactionState::RolledBack => {
                tracing::debug!(transaction_id = %self.id, "Rollback on a cleared connection ignored");
                Ok(())
            }
            TransactionState::Committed => {
                self.state = TransactionState::Committed;
                Err(self.finalized_error("rollback"))
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
