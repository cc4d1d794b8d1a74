use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::domain::order::{
    LeaseManager, OrderManager, OrderStoreError, OrderStoreResult, ResourceKind,
};
use crate::metrics::StoreMetrics;
use crate::models::{FlowContext, FlowStage, Lease, Order, OrderIdComponents, OrderIdTemplate, OrderQuote};
use crate::store::{StorageEngine, TransactionHandle};

// ============================================================================
// Order Store Capability Set
// ============================================================================
//
// Everything the booking flow orchestrator needs from a backend. Any type
// implementing this trait can sit behind the coordinator.
//
// ============================================================================

#[async_trait]
pub trait OrderStore: Send + Sync {
    type Transaction: Send;

    async fn begin_transaction(&self, stage: FlowStage) -> OrderStoreResult<Self::Transaction>;

    async fn complete_transaction(&self, transaction: &mut Self::Transaction) -> OrderStoreResult<()>;

    async fn rollback_transaction(&self, transaction: &mut Self::Transaction) -> OrderStoreResult<()>;

    /// `Ok(None)` when leasing does not apply at the context's stage
    async fn create_lease(
        &self,
        quote: &OrderQuote,
        context: &FlowContext,
        transaction: &mut Self::Transaction,
    ) -> OrderStoreResult<Option<Lease>>;

    async fn delete_lease(&self, order_id: &OrderIdComponents) -> OrderStoreResult<()>;

    async fn create_order(
        &self,
        order: &Order,
        context: &FlowContext,
        transaction: &mut Self::Transaction,
    ) -> OrderStoreResult<()>;

    async fn delete_order(&self, order_id: &OrderIdComponents) -> OrderStoreResult<()>;

    /// Customer-initiated; returns whether the order was found
    async fn cancel_order_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
    ) -> OrderStoreResult<bool>;

    /// Seller-initiated; returns whether the order was found
    async fn seller_cancel_order_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
    ) -> OrderStoreResult<bool>;
}

// ============================================================================
// Booking Order Store - the capability set over any StorageEngine
// ============================================================================

pub struct BookingOrderStore<E: StorageEngine> {
    engine: Arc<E>,
    leases: LeaseManager<E>,
    orders: OrderManager<E>,
}

impl<E: StorageEngine> BookingOrderStore<E> {
    pub fn new(engine: Arc<E>, config: &StoreConfig) -> Self {
        Self {
            leases: LeaseManager::new(engine.clone(), config),
            orders: OrderManager::new(engine.clone(), config),
            engine,
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn orders(&self) -> &OrderManager<E> {
        &self.orders
    }
}

#[async_trait]
impl<E: StorageEngine + 'static> OrderStore for BookingOrderStore<E> {
    type Transaction = TransactionHandle<E>;

    async fn begin_transaction(&self, stage: FlowStage) -> OrderStoreResult<Self::Transaction> {
        TransactionHandle::begin(self.engine.clone(), stage).await
    }

    async fn complete_transaction(&self, transaction: &mut Self::Transaction) -> OrderStoreResult<()> {
        transaction.complete().await
    }

    async fn rollback_transaction(&self, transaction: &mut Self::Transaction) -> OrderStoreResult<()> {
        transaction.rollback().await
    }

    async fn create_lease(
        &self,
        quote: &OrderQuote,
        context: &FlowContext,
        transaction: &mut Self::Transaction,
    ) -> OrderStoreResult<Option<Lease>> {
        self.leases.create_lease(quote, context, transaction).await
    }

    async fn delete_lease(&self, order_id: &OrderIdComponents) -> OrderStoreResult<()> {
        self.leases.delete_lease(order_id).await
    }

    async fn create_order(
        &self,
        order: &Order,
        context: &FlowContext,
        transaction: &mut Self::Transaction,
    ) -> OrderStoreResult<()> {
        self.orders.create_order(order, context, transaction).await
    }

    async fn delete_order(&self, order_id: &OrderIdComponents) -> OrderStoreResult<()> {
        self.orders.delete_order(order_id).await
    }

    async fn cancel_order_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
    ) -> OrderStoreResult<bool> {
        self.orders.cancel_order_items(template, order_id, order_item_ids).await
    }

    async fn seller_cancel_order_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
    ) -> OrderStoreResult<bool> {
        self.orders.seller_cancel_order_items(template, order_id, order_item_ids).await
    }
}

// ============================================================================
// Order Lifecycle Coordinator
// ============================================================================
//
// One logical operation: Idle -> TransactionOpen -> Committed | RolledBack
//
// Every failure after begin triggers exactly one rollback, and the original
// error is returned unchanged. A failed rollback is logged, never returned.
//
// ============================================================================

pub struct OrderLifecycleCoordinator<S: OrderStore> {
    store: S,
    metrics: Option<Arc<StoreMetrics>>,
}

impl<S: OrderStore> OrderLifecycleCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<StoreMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lease the booking for the context's order, in its own unit-of-work
    pub async fn create_lease(
        &self,
        quote: &OrderQuote,
        context: &FlowContext,
    ) -> OrderStoreResult<Option<Lease>> {
        let mut transaction = self.store.begin_transaction(context.stage).await?;
        let outcome = self.store.create_lease(quote, context, &mut transaction).await;
        let lease = self
            .finish(&mut transaction, outcome, context.order_id.uuid, ResourceKind::Lease)
            .await?;

        if lease.is_some() {
            self.record(|m| m.record_created(ResourceKind::Lease.as_str()));
        }
        Ok(lease)
    }

    /// Book the order for the context's order id, in its own unit-of-work
    pub async fn create_order(&self, order: &Order, context: &FlowContext) -> OrderStoreResult<()> {
        let mut transaction = self.store.begin_transaction(context.stage).await?;
        let outcome = self.store.create_order(order, context, &mut transaction).await;
        self.finish(&mut transaction, outcome, context.order_id.uuid, ResourceKind::Order)
            .await?;

        self.record(|m| m.record_created(ResourceKind::Order.as_str()));
        Ok(())
    }

    pub async fn delete_lease(&self, order_id: &OrderIdComponents) -> OrderStoreResult<()> {
        self.store.delete_lease(order_id).await
    }

    pub async fn delete_order(&self, order_id: &OrderIdComponents) -> OrderStoreResult<()> {
        self.store.delete_order(order_id).await
    }

    pub async fn cancel_order_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
    ) -> OrderStoreResult<bool> {
        let found = self
            .store
            .cancel_order_items(template, order_id, order_item_ids)
            .await?;

        if found {
            self.record(|m| m.record_order_item_cancellation());
        }
        Ok(found)
    }

    pub async fn seller_cancel_order_items(
        &self,
        template: &OrderIdTemplate,
        order_id: &OrderIdComponents,
        order_item_ids: &[OrderIdComponents],
    ) -> OrderStoreResult<bool> {
        let found = self
            .store
            .seller_cancel_order_items(template, order_id, order_item_ids)
            .await?;

        if found {
            self.record(|m| m.record_order_item_cancellation());
        }
        Ok(found)
    }

    /// Commit on success; otherwise roll back once and hand back the cause
    async fn finish<T>(
        &self,
        transaction: &mut S::Transaction,
        outcome: OrderStoreResult<T>,
        order_id: Uuid,
        resource: ResourceKind,
    ) -> OrderStoreResult<T> {
        let error = match outcome {
            Ok(value) => match self.store.complete_transaction(transaction).await {
                Ok(()) => {
                    self.record(|m| m.record_transaction(true));
                    tracing::info!(order_id = %order_id, resource = %resource, "✅ Transaction committed");
                    return Ok(value);
                }
                Err(error) => error,
            },
            Err(error) => error,
        };

        if let Err(rollback_error) = self.store.rollback_transaction(transaction).await {
            tracing::error!(
                order_id = %order_id,
                error = %rollback_error,
                "Rollback failed"
            );
        }

        self.record(|m| m.record_transaction(false));
        if let OrderStoreError::DuplicateResource { resource, .. } = &error {
            self.record(|m| m.record_duplicate(resource.as_str()));
        }

        tracing::warn!(
            order_id = %order_id,
            resource = %resource,
            error = %error,
            booking_error = error.booking_error_type(),
            "Transaction rolled back"
        );

        Err(error)
    }

    fn record(&self, f: impl FnOnce(&StoreMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderItemStatus;
    use crate::models::{
        Broker, BrokerRole, Customer, Payment, PriceSpecification, SellerIdComponents,
    };
    use crate::store::{InMemoryDatabase, StorageError, TransactionStatus};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ------------------------------------------------------------------------
    // Recording store: counts lifecycle calls and fails on demand
    // ------------------------------------------------------------------------

    #[derive(Clone, Copy, PartialEq)]
    enum Failure {
        None,
        Create,
        Commit,
        CreateAndRollback,
    }

    struct RecordingStore {
        failure: Failure,
        begins: AtomicUsize,
        completes: AtomicUsize,
        rollbacks: AtomicUsize,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingStore {
        fn new(failure: Failure) -> Self {
            Self {
                failure,
                begins: AtomicUsize::new(0),
                completes: AtomicUsize::new(0),
                rollbacks: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn log(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderStore for RecordingStore {
        type Transaction = u32;

        async fn begin_transaction(&self, _stage: FlowStage) -> OrderStoreResult<u32> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            self.log("begin");
            Ok(1)
        }

        async fn complete_transaction(&self, _transaction: &mut u32) -> OrderStoreResult<()> {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.log("complete");
            if self.failure == Failure::Commit {
                return Err(OrderStoreError::Storage(StorageError::ConnectionClosed));
            }
            Ok(())
        }

        async fn rollback_transaction(&self, _transaction: &mut u32) -> OrderStoreResult<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            self.log("rollback");
            if self.failure == Failure::CreateAndRollback {
                return Err(OrderStoreError::Storage(StorageError::Backend("rollback".into())));
            }
            Ok(())
        }

        async fn create_lease(
            &self,
            _quote: &OrderQuote,
            _context: &FlowContext,
            _transaction: &mut u32,
        ) -> OrderStoreResult<Option<Lease>> {
            self.log("create_lease");
            Ok(Some(Lease { lease_expires: chrono::Utc::now() }))
        }

        async fn delete_lease(&self, _order_id: &OrderIdComponents) -> OrderStoreResult<()> {
            Ok(())
        }

        async fn create_order(
            &self,
            _order: &Order,
            context: &FlowContext,
            _transaction: &mut u32,
        ) -> OrderStoreResult<()> {
            self.log("create_order");
            match self.failure {
                Failure::Create | Failure::CreateAndRollback => Err(OrderStoreError::DuplicateResource {
                    resource: ResourceKind::Order,
                    order_id: context.order_id.uuid,
                }),
                _ => Ok(()),
            }
        }

        async fn delete_order(&self, _order_id: &OrderIdComponents) -> OrderStoreResult<()> {
            Ok(())
        }

        async fn cancel_order_items(
            &self,
            _template: &OrderIdTemplate,
            _order_id: &OrderIdComponents,
            _order_item_ids: &[OrderIdComponents],
        ) -> OrderStoreResult<bool> {
            Ok(false)
        }

        async fn seller_cancel_order_items(
            &self,
            _template: &OrderIdTemplate,
            _order_id: &OrderIdComponents,
            _order_item_ids: &[OrderIdComponents],
        ) -> OrderStoreResult<bool> {
            Ok(false)
        }
    }

    // ------------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------------

    fn context(stage: FlowStage, order_id: Uuid) -> FlowContext {
        FlowContext {
            stage,
            order_id: OrderIdComponents::order(order_id),
            broker_role: BrokerRole::AgentBroker,
            broker: Some(Broker { name: "Acme Broker".to_string() }),
            seller_id: SellerIdComponents { seller_id_long: 1 },
            customer: Some(Customer { email: Some("geoff@example.com".to_string()) }),
            payment: Some(Payment { identifier: Some("pay-1".to_string()) }),
        }
    }

    fn price(currency: &str) -> PriceSpecification {
        PriceSpecification::new(Decimal::new(1999, 2), currency)
    }

    fn quote(currency: &str) -> OrderQuote {
        OrderQuote { total_payment_due: price(currency) }
    }

    fn order(currency: &str) -> Order {
        Order { total_payment_due: price(currency) }
    }

    fn in_memory() -> (Arc<InMemoryDatabase>, OrderLifecycleCoordinator<BookingOrderStore<InMemoryDatabase>>) {
        let database = Arc::new(InMemoryDatabase::new());
        let store = BookingOrderStore::new(database.clone(), &StoreConfig::default());
        (database, OrderLifecycleCoordinator::new(store))
    }

    // ------------------------------------------------------------------------
    // Lifecycle sequencing
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_success_commits_without_rollback() {
        let coordinator = OrderLifecycleCoordinator::new(RecordingStore::new(Failure::None));

        coordinator.create_order(&order("GBP"), &context(FlowStage::B, Uuid::new_v4())).await.unwrap();

        assert_eq!(coordinator.store().calls(), vec!["begin", "create_order", "complete"]);
        assert_eq!(coordinator.store().rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_operation_failure_rolls_back_once() {
        let coordinator = OrderLifecycleCoordinator::new(RecordingStore::new(Failure::Create));
        let order_id = Uuid::new_v4();

        let result = coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await;

        assert!(matches!(
            result,
            Err(OrderStoreError::DuplicateResource { order_id: id, .. }) if id == order_id
        ));
        assert_eq!(coordinator.store().calls(), vec!["begin", "create_order", "rollback"]);
        assert_eq!(coordinator.store().completes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back_once() {
        let coordinator = OrderLifecycleCoordinator::new(RecordingStore::new(Failure::Commit));

        let result = coordinator.create_lease(&quote("GBP"), &context(FlowStage::C2, Uuid::new_v4())).await;

        assert!(matches!(result, Err(OrderStoreError::Storage(StorageError::ConnectionClosed))));
        assert_eq!(coordinator.store().begins.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.store().rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_does_not_mask_cause() {
        let coordinator = OrderLifecycleCoordinator::new(RecordingStore::new(Failure::CreateAndRollback));

        let result = coordinator.create_order(&order("GBP"), &context(FlowStage::B, Uuid::new_v4())).await;

        assert!(matches!(result, Err(OrderStoreError::DuplicateResource { .. })));
        assert_eq!(coordinator.store().rollbacks.load(Ordering::SeqCst), 1);
    }

    // ------------------------------------------------------------------------
    // End to end over the in-memory engine
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_lease_then_order() {
        let (database, coordinator) = in_memory();
        let order_id = Uuid::new_v4();

        let lease = coordinator.create_lease(&quote("GBP"), &context(FlowStage::C2, order_id)).await.unwrap();
        assert!(lease.is_some());
        assert!(database.lease(order_id).await.is_some());

        coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await.unwrap();
        assert!(database.lease(order_id).await.is_none());

        let record = database.order(order_id).await.unwrap();
        assert_eq!(record.payment_identifier.as_deref(), Some("pay-1"));
        assert_eq!(record.broker_role, BrokerRole::AgentBroker);
    }

    #[tokio::test]
    async fn test_duplicate_order_leaves_first_untouched() {
        let (database, coordinator) = in_memory();
        let order_id = Uuid::new_v4();

        coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await.unwrap();
        let first = database.order(order_id).await.unwrap();

        let mut retry = context(FlowStage::B, order_id);
        retry.customer = Some(Customer { email: Some("someone-else@example.com".to_string()) });
        let result = coordinator.create_order(&order("GBP"), &retry).await;

        assert!(matches!(
            result,
            Err(OrderStoreError::DuplicateResource { resource: ResourceKind::Order, .. })
        ));
        assert_eq!(database.order(order_id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_duplicate_lease_at_lease_stage() {
        let (_database, coordinator) = in_memory();
        let order_id = Uuid::new_v4();

        coordinator.create_lease(&quote("GBP"), &context(FlowStage::C2, order_id)).await.unwrap();
        let result = coordinator.create_lease(&quote("GBP"), &context(FlowStage::C2, order_id)).await;

        assert!(matches!(
            result,
            Err(OrderStoreError::DuplicateResource { resource: ResourceKind::Lease, .. })
        ));
    }

    #[tokio::test]
    async fn test_no_lease_outside_lease_stage() {
        let (database, coordinator) = in_memory();

        let lease = coordinator.create_lease(&quote("GBP"), &context(FlowStage::C1, Uuid::new_v4())).await.unwrap();

        assert!(lease.is_none());
        assert_eq!(database.lease_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsupported_currency_leaves_no_state() {
        let (database, coordinator) = in_memory();
        let order_id = Uuid::new_v4();

        let lease = coordinator.create_lease(&quote("EUR"), &context(FlowStage::C2, order_id)).await;
        let booked = coordinator.create_order(&order("EUR"), &context(FlowStage::B, order_id)).await;

        assert!(matches!(lease, Err(OrderStoreError::UnsupportedCurrency { .. })));
        assert!(matches!(booked, Err(OrderStoreError::UnsupportedCurrency { .. })));
        assert!(database.lease(order_id).await.is_none());
        assert!(database.order(order_id).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_creates_book_once() {
        let (database, coordinator) = in_memory();
        let coordinator = Arc::new(coordinator);
        let order_id = Uuid::new_v4();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let coordinator = coordinator.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => successes += 1,
                Err(error) => assert!(matches!(error, OrderStoreError::DuplicateResource { .. })),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(database.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_leases_hold_once() {
        let (database, coordinator) = in_memory();
        let coordinator = Arc::new(coordinator);
        let order_id = Uuid::new_v4();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let coordinator = coordinator.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.create_lease(&quote("GBP"), &context(FlowStage::C2, order_id)).await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(lease) => {
                    assert!(lease.is_some());
                    successes += 1;
                }
                Err(error) => assert!(matches!(
                    error,
                    OrderStoreError::DuplicateResource { resource: ResourceKind::Lease, .. }
                )),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(database.lease_count().await, 1);
    }

    #[tokio::test]
    async fn test_staged_lease_rejected_at_commit() {
        let (database, coordinator) = in_memory();
        let order_id = Uuid::new_v4();
        let store = coordinator.store();

        // Both staged against an empty store, so only the commit can catch the clash
        let mut leased = store.begin_transaction(FlowStage::C2).await.unwrap();
        let mut rival = store.begin_transaction(FlowStage::C2).await.unwrap();
        store.create_lease(&quote("GBP"), &context(FlowStage::C2, order_id), &mut leased).await.unwrap();
        store.create_lease(&quote("GBP"), &context(FlowStage::C2, order_id), &mut rival).await.unwrap();

        store.complete_transaction(&mut leased).await.unwrap();
        let result = store.complete_transaction(&mut rival).await;

        assert!(matches!(
            result,
            Err(OrderStoreError::DuplicateResource { resource: ResourceKind::Lease, .. })
        ));
        assert_eq!(rival.status(), TransactionStatus::RolledBack);
        assert_eq!(database.lease_count().await, 1);
    }

    #[tokio::test]
    async fn test_order_booked_while_lease_staged() {
        let (database, coordinator) = in_memory();
        let order_id = Uuid::new_v4();
        let store = coordinator.store();

        let mut transaction = store.begin_transaction(FlowStage::C2).await.unwrap();
        store.create_lease(&quote("GBP"), &context(FlowStage::C2, order_id), &mut transaction).await.unwrap();

        coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await.unwrap();
        let result = store.complete_transaction(&mut transaction).await;

        assert!(matches!(
            result,
            Err(OrderStoreError::DuplicateResource { resource: ResourceKind::Lease, .. })
        ));
        store.rollback_transaction(&mut transaction).await.unwrap();
        assert!(database.lease(order_id).await.is_none());
        assert!(database.order(order_id).await.is_some());
    }

    #[tokio::test]
    async fn test_seller_cancellation() {
        let metrics = Arc::new(StoreMetrics::new().unwrap());
        let database = Arc::new(InMemoryDatabase::new());
        let coordinator =
            OrderLifecycleCoordinator::new(BookingOrderStore::new(database.clone(), &StoreConfig::default()))
                .with_metrics(metrics.clone());
        let template = OrderIdTemplate::new("https://example.com/api");
        let order_id = Uuid::new_v4();
        let id = OrderIdComponents::order(order_id);

        coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await.unwrap();
        database.add_order_item(order_id, 1).await;
        database.add_order_item(order_id, 2).await;

        let found = coordinator
            .seller_cancel_order_items(&template, &id, &[OrderIdComponents::order_item(order_id, 2)])
            .await
            .unwrap();
        assert!(found);

        let items = database.order_items(order_id).await;
        assert_eq!(items[0].status, OrderItemStatus::Confirmed);
        assert_eq!(items[1].status, OrderItemStatus::SellerCancelled);
        assert_eq!(metrics.order_item_cancellations.get(), 1);

        let missing = coordinator
            .seller_cancel_order_items(&template, &OrderIdComponents::order(Uuid::new_v4()), &[])
            .await
            .unwrap();
        assert!(!missing);
        assert_eq!(metrics.order_item_cancellations.get(), 1);
    }

    #[tokio::test]
    async fn test_cancel_and_delete() {
        let (database, coordinator) = in_memory();
        let template = OrderIdTemplate::new("https://example.com/api");
        let order_id = Uuid::new_v4();
        let id = OrderIdComponents::order(order_id);

        let missing = coordinator
            .cancel_order_items(&template, &id, &[OrderIdComponents::order_item(order_id, 1)])
            .await
            .unwrap();
        assert!(!missing);

        coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await.unwrap();
        database.add_order_item(order_id, 1).await;
        database.add_order_item(order_id, 2).await;

        let found = coordinator
            .cancel_order_items(&template, &id, &[OrderIdComponents::order_item(order_id, 1)])
            .await
            .unwrap();
        assert!(found);

        let items = database.order_items(order_id).await;
        assert_eq!(items[0].status, OrderItemStatus::CustomerCancelled);
        assert_eq!(items[1].status, OrderItemStatus::Confirmed);

        coordinator.delete_order(&id).await.unwrap();
        coordinator.delete_order(&id).await.unwrap();
        coordinator.delete_lease(&id).await.unwrap();
        assert!(database.order(order_id).await.is_none());
    }

    #[tokio::test]
    async fn test_store_handle_reaches_terminal_state() {
        let database = Arc::new(InMemoryDatabase::new());
        let store = BookingOrderStore::new(database, &StoreConfig::default());
        let order_id = Uuid::new_v4();

        let mut transaction = store.begin_transaction(FlowStage::B).await.unwrap();
        store.create_order(&order("GBP"), &context(FlowStage::B, order_id), &mut transaction).await.unwrap();
        store.complete_transaction(&mut transaction).await.unwrap();

        assert_eq!(transaction.status(), TransactionStatus::Committed);
        assert!(store.complete_transaction(&mut transaction).await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_metrics_track_outcomes() {
        let metrics = Arc::new(StoreMetrics::new().unwrap());
        let database = Arc::new(InMemoryDatabase::new());
        let coordinator = OrderLifecycleCoordinator::new(BookingOrderStore::new(database, &StoreConfig::default()))
            .with_metrics(metrics.clone());
        let order_id = Uuid::new_v4();

        coordinator.create_lease(&quote("GBP"), &context(FlowStage::C2, order_id)).await.unwrap();
        coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await.unwrap();
        let _ = coordinator.create_order(&order("GBP"), &context(FlowStage::B, order_id)).await;

        assert_eq!(metrics.transactions_total.with_label_values(&["committed"]).get(), 2);
        assert_eq!(metrics.transactions_total.with_label_values(&["rolled_back"]).get(), 1);
        assert_eq!(metrics.resources_created.with_label_values(&["lease"]).get(), 1);
        assert_eq!(metrics.resources_created.with_label_values(&["order"]).get(), 1);
        assert_eq!(metrics.duplicates_rejected.with_label_values(&["order"]).get(), 1);
    }
}
