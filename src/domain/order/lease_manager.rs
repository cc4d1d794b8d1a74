use chrono::Utc;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::models::{FlowContext, FlowStage, Lease, OrderIdComponents, OrderQuote};
use crate::store::{StorageEngine, TransactionHandle};
use super::errors::{OrderStoreError, OrderStoreResult};
use super::value_objects::{ensure_supported_currency, LeaseRecord, ResourceKind};

// ============================================================================
// Lease Manager
// ============================================================================
//
// Leases are granted at exactly one stage of the flow. Asking for one at any
// other stage is a normal "no lease" outcome, not an error.
//
// ============================================================================

pub struct LeaseManager<E: StorageEngine> {
    engine: Arc<E>,
    config: StoreConfig,
}

impl<E: StorageEngine> LeaseManager<E> {
    pub fn new(engine: Arc<E>, config: &StoreConfig) -> Self {
        Self {
            engine,
            config: config.clone(),
        }
    }

    pub fn lease_stage(&self) -> FlowStage {
        self.config.lease_stage
    }

    /// Hold the booking until `now + lease_duration` within the caller's transaction
    pub async fn create_lease(
        &self,
        quote: &OrderQuote,
        context: &FlowContext,
        transaction: &mut TransactionHandle<E>,
    ) -> OrderStoreResult<Option<Lease>> {
        ensure_supported_currency(&quote.total_payment_due, &self.config.supported_currency)?;

        if context.stage != self.config.lease_stage {
            tracing::debug!(
                order_id = %context.order_id.uuid,
                stage = ?context.stage,
                "Lease not applicable at this stage"
            );
            return Ok(None);
        }

        let order_id = context.order_id.uuid;
        let lease_expires = self
            .config
            .lease_expiry(Utc::now())
            .ok_or(OrderStoreError::InvalidLeaseDuration(self.config.lease_duration_secs))?;

        let added = transaction
            .add_lease(LeaseRecord {
                order_id,
                broker_role: context.broker_role,
                broker_name: context.broker_name(),
                seller_id: context.seller_id.seller_id_long,
                customer_email: context.customer_email(),
                lease_expires,
            })
            .await?;

        if !added {
            tracing::warn!(order_id = %order_id, "Lease rejected, order or lease already exists");
            return Err(OrderStoreError::DuplicateResource {
                resource: ResourceKind::Lease,
                order_id,
            });
        }

        tracing::info!(
            order_id = %order_id,
            lease_expires = %lease_expires,
            transaction_id = %transaction.id(),
            "Lease staged"
        );

        Ok(Some(Lease { lease_expires }))
    }

    /// Best-effort removal outside any unit-of-work
    pub async fn delete_lease(&self, order_id: &OrderIdComponents) -> OrderStoreResult<()> {
        self.engine.delete_lease(order_id.uuid).await?;
        tracing::debug!(order_id = %order_id.uuid, "Lease deleted");
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
