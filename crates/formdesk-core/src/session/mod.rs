//! Session domain module.
//!
//! This module contains the per-conversant questionnaire state and the
//! in-memory registry of active sessions.
//!
//! # Module Structure
//!
//! - `model`: Core session model (`Session`) and its step transition (`Advance`)
//! - `store`: Active sessions keyed by identity (`SessionStore`)
//!
//! # Usage
//!
//! ```ignore
//! use formdesk_core::session::{Session, SessionStore, StepInput, Advance};
//! ```

mod model;
mod store;

// Re-export public API
pub use model::{Advance, Session, StepInput};
pub use store::SessionStore;
