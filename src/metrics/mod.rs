use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for the order store
// ============================================================================
//
// Provides metrics for:
// - Unit-of-work outcomes (committed, rolled back)
// - Orders and leases created
// - Duplicate creations rejected by the idempotency guard
// - Order items cancelled
//
// ============================================================================

pub struct StoreMetrics {
    registry: Registry,

    pub transactions_total: IntCounterVec,
    pub resources_created: IntCounterVec,
    pub duplicates_rejected: IntCounterVec,
    pub order_item_cancellations: IntCounter,
}

impl StoreMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transactions_total = IntCounterVec::new(
            Opts::new("order_store_transactions_total", "Units of work by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let resources_created = IntCounterVec::new(
            Opts::new("order_store_resources_created_total", "Orders and leases committed"),
            &["resource"],
        )?;
        registry.register(Box::new(resources_created.clone()))?;

        let duplicates_rejected = IntCounterVec::new(
            Opts::new("order_store_duplicates_rejected_total", "Creations rejected as already existing"),
            &["resource"],
        )?;
        registry.register(Box::new(duplicates_rejected.clone()))?;

        let order_item_cancellations = IntCounter::new(
            "order_store_order_items_cancelled_total",
            "Order item cancellation requests against existing orders",
        )?;
        registry.register(Box::new(order_item_cancellations.clone()))?;

        Ok(Self {
            registry,
            transactions_total,
            resources_created,
            duplicates_rejected,
            order_item_cancellations,
        })
    }

    /// Get the Prometheus registry for exposing metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transaction(&self, committed: bool) {
        let outcome = if committed { "committed" } else { "rolled_back" };
        self.transactions_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_created(&self, resource: &str) {
        self.resources_created.with_label_values(&[resource]).inc();
    }

    pub fn record_duplicate(&self, resource: &str) {
        self.duplicates_rejected.with_label_values(&[resource]).inc();
    }

    pub fn record_order_item_cancellation(&self) {
        self.order_item_cancellations.inc();
    }
}
