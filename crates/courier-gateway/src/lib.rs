//! # Courier Gateway
//!
//! HTTP control surface: scheduler start/stop, message intake, sent listing.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
