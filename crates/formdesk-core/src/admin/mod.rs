//! Administrator review domain.
//!
//! - `action`: Callback vocabulary of the admin keyboards (`AdminAction`)
//! - `state`: Per-admin pending search / reply state (`AdminState`, `AdminStateStore`)

mod action;
mod state;

pub use action::{AdminAction, SUMMARY_MONTH_DAYS, SUMMARY_WEEK_DAYS};
pub use state::{AdminState, AdminStateStore};
