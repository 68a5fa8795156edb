//! Repository trait re-exports.
//!
//! This module provides centralized access to all repository traits.

// Re-export FormRepository from form module
pub use crate::form::FormRepository;

// Re-export ProfileRepository from profile module
pub use crate::profile::ProfileRepository;
