pub mod config_service;
pub mod json_profile_repository;
pub mod paths;
pub mod sqlite_form_repository;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_profile_repository::JsonProfileRepository;
pub use crate::paths::{FormdeskPaths, PathError};
pub use crate::sqlite_form_repository::SqliteFormRepository;
