//! Records and wire shapes shared by the store, the domain layer and both
//! front-ends.

pub mod api;
pub mod models;

pub use models::*;
