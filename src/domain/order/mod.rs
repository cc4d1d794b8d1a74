// ============================================================================
// Order Domain - order and lease lifecycle rules
// ============================================================================
//
// - Value objects (LeaseRecord, OrderRecord, OrderItemRecord)
// - Errors (OrderStoreError)
// - LeaseManager (stage-gated temporary holds)
// - OrderManager (idempotent order creation, deletion, item cancellation)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod lease_manager;
pub mod order_manager;

pub use value_objects::*;
pub use errors::*;
pub use lease_manager::*;
pub use order_manager::*;
