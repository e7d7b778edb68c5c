// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Order validation, workflow orchestration, events and error kinds. Storage
// and messaging are reached only through the `db` and `messaging` traits.
//
// ============================================================================

pub mod order;
