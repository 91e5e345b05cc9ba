//! pwhash-server: HTTP binding for the password hashing service
//!
//! Exposes `hash` and `verify` over JSON, with optional admin routes for
//! rotating cost parameters while the server is running. Responses to the
//! two password routes are never compressed, whatever the client offers.

pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ServerError;
pub use routes::create_router;
pub use server::{PwhashServer, ServerBuilder};
pub use state::{create_shared_state, ServerState, SharedState};
