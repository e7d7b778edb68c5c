// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (OrderStatus, NewLineItem)
// - Commands and their validation (CreateOrder)
// - Events (OrderCreatedEvent)
// - Errors (OrderError, response codes)
// - Workflow service (OrderService)
//
// ============================================================================

pub mod commands;
pub mod errors;
pub mod events;
pub mod service;
pub mod value_objects;

pub use commands::*;
pub use errors::*;
pub use events::*;
pub use service::*;
pub use value_objects::*;
