pub mod admin;
pub mod config;
pub mod error;
pub mod form;
pub mod identity;
pub mod platform;
pub mod profile;
pub mod repository;
pub mod session;
pub mod task;
pub mod transport;

// Re-export common error type
pub use error::FormdeskError;
pub use identity::{AllowList, UserId};
