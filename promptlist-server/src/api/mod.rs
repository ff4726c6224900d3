//! HTTP API handlers for promptlist-server

pub mod export;
pub mod generate;
pub mod health;

pub use export::export_routes;
pub use generate::generate_routes;
pub use health::health_routes;
