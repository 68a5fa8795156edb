//! Form domain module.
//!
//! This module contains the questionnaire step machine, the persisted form
//! record and the repository interface for the form table.
//!
//! # Module Structure
//!
//! - `step`: Ordered steps, expected input shapes and the single branch (`FormStep`, `FormFlow`)
//! - `model`: Accumulated answers and the persisted record (`FormAnswers`, `FormRecord`, `FormStatus`)
//! - `repository`: Repository trait for the form table
//!
//! # Usage
//!
//! ```ignore
//! use formdesk_core::form::{FormFlow, FormStep, FormAnswers, FormRecord, FormStatus};
//! use formdesk_core::form::FormRepository;
//! ```

mod model;
mod repository;
mod step;

// Re-export public API
pub use model::{
    FormAnswers, FormRecord, FormStatistics, FormStatus, FormSummary, PASSPORT_BACK_SKIPPED,
    SearchField,
};
pub use repository::FormRepository;
pub use step::{DEFAULT_BACK_SIDE_MARKER, FormFlow, FormStep, InputShape};
