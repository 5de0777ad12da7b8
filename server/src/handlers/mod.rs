//! Request handlers for the sync protocol.

mod pull;
mod upsert;

pub use pull::*;
pub use upsert::*;
