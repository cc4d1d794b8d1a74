use std::sync::Arc;
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use booking_order_store::metrics::StoreMetrics;
use booking_order_store::models::{
    Broker, BrokerRole, Customer, FlowContext, FlowStage, Order, OrderIdComponents,
    OrderIdTemplate, OrderQuote, Payment, PriceSpecification, SellerIdComponents,
};
use booking_order_store::{BookingOrderStore, InMemoryDatabase, OrderLifecycleCoordinator, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,booking_order_store=debug"))
        )
        .init();

    let config = StoreConfig::from_env()?;
    tracing::info!(
        currency = %config.supported_currency,
        lease_secs = config.lease_duration_secs,
        lease_stage = ?config.lease_stage,
        "🚀 Starting booking order store demo"
    );

    let database = Arc::new(InMemoryDatabase::new());
    let metrics = Arc::new(StoreMetrics::new()?);
    let coordinator = OrderLifecycleCoordinator::new(BookingOrderStore::new(database.clone(), &config))
        .with_metrics(metrics.clone());

    let order_id = Uuid::new_v4();
    let total = PriceSpecification::new(Decimal::new(1450, 2), config.supported_currency.clone());
    let context = |stage: FlowStage| FlowContext {
        stage,
        order_id: OrderIdComponents::order(order_id),
        broker_role: BrokerRole::AgentBroker,
        broker: Some(Broker { name: "Acme Broker".to_string() }),
        seller_id: SellerIdComponents { seller_id_long: 1 },
        customer: Some(Customer { email: Some("geoff@example.com".to_string()) }),
        payment: (stage == FlowStage::B).then(|| Payment { identifier: Some("pay-001".to_string()) }),
    };

    // === 1. Quote without a lease, then lease at the lease stage ===
    let quote = OrderQuote { total_payment_due: total.clone() };
    let lease = coordinator.create_lease(&quote, &context(FlowStage::C1)).await?;
    tracing::info!(leased = lease.is_some(), "C1 quote processed");

    if let Some(lease) = coordinator.create_lease(&quote, &context(config.lease_stage)).await? {
        tracing::info!(order_id = %order_id, lease_expires = %lease.lease_expires, "✅ Lease granted");
    }

    // === 2. Book, then show the retry is rejected ===
    let order = Order { total_payment_due: total };
    coordinator.create_order(&order, &context(FlowStage::B)).await?;
    tracing::info!(order_id = %order_id, "✅ Order booked");

    if let Err(e) = coordinator.create_order(&order, &context(FlowStage::B)).await {
        tracing::info!(error = %e, booking_error = e.booking_error_type(), "Retry rejected as expected");
    }

    // === 3. Customer cancels one item ===
    database.add_order_item(order_id, 1).await;
    database.add_order_item(order_id, 2).await;
    let template = OrderIdTemplate::new("https://example.com/api");
    let found = coordinator
        .cancel_order_items(
            &template,
            &OrderIdComponents::order(order_id),
            &[OrderIdComponents::order_item(order_id, 2)],
        )
        .await?;
    tracing::info!(found = found, items = ?database.order_items(order_id).await, "Cancellation requested");

    tracing::info!(
        metric_families = metrics.registry().gather().len(),
        "🎉 Demo complete"
    );

    Ok(())
}
