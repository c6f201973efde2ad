//! Token wire models, persisted state, and secret wrappers.

pub mod response;
pub mod secret;
pub mod state;
