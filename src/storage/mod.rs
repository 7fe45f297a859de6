//! Storage layer for the interop server.
//!
//! Provides database access via SQLx with SQLite.

mod models;
mod repository;

pub use repository::InteropRepository;
