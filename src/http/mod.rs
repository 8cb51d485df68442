// src/http/mod.rs

//! HTTP surface: the human-readable status page and the Prometheus
//! exposition endpoint.
//!
//! This layer is a thin reader over [`SharedState`](crate::state::SharedState)
//! and the metrics registry; it contains no run logic of its own.

pub mod routes;
pub mod server;

pub use routes::create_router;
pub use server::serve;
