//! REST API over the proxy pool

pub mod handlers;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
