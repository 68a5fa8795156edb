//! Profile domain module.
//!
//! Named, free-form profiles kept by the messaging automation client
//! (e.g., a reusable message template and target chat).
//!
//! - `model`: `Profile`
//! - `repository`: Repository trait for profile persistence

mod model;
mod repository;

pub use model::{Profile, ProfileMap};
pub use repository::ProfileRepository;
