//! Session authentication for the interop server.
//!
//! Users log in with a username and password and receive a signed session
//! token, carried back as the `sessionid` cookie or a bearer header.

mod middleware;
mod session;

pub use middleware::*;
pub use session::*;
