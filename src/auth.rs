//! Account identifiers, token models, and the coordinator that owns them.

pub mod coordinator;
pub mod id;
pub mod token;

pub use coordinator::*;
pub use id::*;
pub use token::{response::*, secret::*, state::*};
