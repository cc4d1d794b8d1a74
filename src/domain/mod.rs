// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Currency and idempotency rules for orders and leases. Storage mechanics
// live in src/store/.
//
// ============================================================================

pub mod order;
