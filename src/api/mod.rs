//! HTTP boundary for the report pipeline.
//!
//! `api_router()` returns a composable `Router`; `server` owns the
//! bind → spawn → graceful-shutdown lifecycle.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_server, ApiServer, ServerError};
pub use types::ApiContext;
