use std::sync::Arc;

use crate::config::StoreConfig;
use crate::models::{FlowContext, Order, OrderIdComponents, OrderIdTemplate};
use crate::store::{StorageEngine, TransactionHandle};
use super::errors::{OrderStoreError, OrderStoreResult};
use super::value_objects::{ensure_supported_currency, OrderRecord, ResourceKind};

// ============================================================================
// Order Manager
// ============================================================================

pub struct OrderManager<E: StorageEngine> {
    engine: Arc<E>,
    supported_currency: String,
}

impl<E: StorageEngine> OrderManager<E> {
    pub fn new(engine: Arc<E>, config: &StoreConfig) -> Self {
        Self {
            engine,
            supported_currency: config.supported_currency.clone(),
        }
    }

    /// Stage the durable order. A retried request for the same id fails
    /// rather than booking twice.
    pub async fn create_order(
        &self,
        order: &Order,
        context: &FlowContext,
        transaction: &mut TransactionHandle<E>,
    ) -> OrderStoreResult<()> {
        ensure_supported_currency(&order.total_payment_due, &self.supported_currency)?;

        let order_id = context.order_id.uuid;
        let added = transaction
            .add_order(OrderRecord {
                order_id,
                broker_role: context.broker_role,
                broker_name: context.broker_name(),
                seller_id: context.seller_id.seller_id_long,
                customer_email: context.customer_email(),
                payment_identifier: context.payment_identifier(),
                total_order_price: order.total_payment_due.price,
            })
            .await?;

        if !added {
            tracing::warn!(order_id = %order_id, "Order rejected, already exists");
            return Err(OrderStoreError::DuplicateResource {
                resource: ResourceKind::Order,
                order_id,
            });
        }

        tracing::info!(
            order_id = %order_id,
            total = %order.total_payment_due.price,
            transaction_id = %transaction.id(),
            "Order staged"
        );
        Ok(())
    }

    pub async fn delete_order(&self, order_id: &OrderIdComponents) -> OrderStoreResult<()> {
        self.engine.delete_order(order_id.uuid).await?;
        tracing::info!(order_id = %order_id.uuid, "Order deleted");
        Ok(())
    }

    /// Customer-initiated cancellation; returns whether the order was found
    pub async fn cancel_order_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
    ) -> OrderStoreResult<bool> {
        self.cancel_items(template, order_id, order_item_ids, true).await
    }

    /// Seller-initiated cancellation; returns whether the order was found
    pub async fn seller_cancel_order_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
    ) -> OrderStoreResult<bool> {
        self.cancel_items(template, order_id, order_item_ids, false).await
    }

    async fn cancel_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
        customer_initiated: bool,
    ) -> OrderStoreResult<bool> {
        let item_ids = order_item_ids
            .iter()
            .map(|id| id.order_item_id.ok_or(OrderStoreError::InvalidOrderItemId(order_id.uuid)))
            .collect::<OrderStoreResult<Vec<i64>>>()?;

        let found = self
            .engine
            .cancel_order_items(order_id.uuid, &item_ids, customer_initiated)
            .await?;

        if found {
            tracing::info!(
                order = %template.render_order_id(order_id),
                items = ?item_ids,
                customer_initiated = customer_initiated,
                "Order item cancellation initiated"
            );
        } else {
            tracing::debug!(order = %template.render_order_id(order_id), "Order not found for cancellation");
        }

        Ok(found)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
