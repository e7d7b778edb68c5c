pub mod handler;
pub mod proto;
mod server;

pub use handler::OrderGrpcHandler;
pub use server::serve;
