//! Domain types for the interop server.
//!
//! This module contains the mission entities and value objects.

mod access_log;
mod mission;
mod obstacle;
mod position;
mod user;

pub use access_log::*;
pub use mission::*;
pub use obstacle::*;
pub use position::*;
pub use user::*;
