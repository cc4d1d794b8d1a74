// ============================================================================
// Storage Layer
// ============================================================================
//
// - engine      - StorageEngine trait and StorageError
// - transaction - TransactionHandle, the explicit unit-of-work state machine
// - memory      - InMemoryDatabase, a StorageEngine for tests and demos
//
// ============================================================================

mod engine;
mod memory;
mod transaction;

pub use engine::{StorageEngine, StorageError};
pub use memory::{InMemoryDatabase, PendingWrites};
pub use transaction::{TransactionHandle, TransactionStatus};
