//! HTTP API layer for the interop server.
//!
//! Provides the obstacle endpoint plus login, mission and user administration.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
