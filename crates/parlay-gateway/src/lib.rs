//! HTTP surface for parlay
//!
//! A thin Axum layer over the core orchestrator: one liveness route and
//! one chat route. All routing and persistence decisions live below this
//! crate; this one only maps the error taxonomy onto status codes.

pub mod server;

pub use server::{ApiServer, ApiState};
