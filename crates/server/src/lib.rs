//! Adoption prediction service: HTTP surface over the adoption pipeline

pub mod api;

pub use api::{create_router, serve, AppState};
