// ============================================================================
// Booking Order Store
// ============================================================================
//
// Transactional order and lease lifecycle for a booking flow:
// - models/      - flow context handed over by the orchestrator
// - domain/      - currency and idempotency rules (LeaseManager, OrderManager)
// - store/       - StorageEngine, TransactionHandle, in-memory engine
// - coordinator  - OrderStore capability set and OrderLifecycleCoordinator
// - metrics/     - Prometheus counters
//
// ============================================================================

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod metrics;
pub mod models;
pub mod store;

pub use config::StoreConfig;
pub use coordinator::{BookingOrderStore, OrderLifecycleCoordinator, OrderStore};
pub use domain::order::{OrderStoreError, OrderStoreResult};
pub use store::{InMemoryDatabase, StorageEngine, StorageError, TransactionHandle};
