//! Messaging automation client.
//!
//! Drives named sessions of a third-party messaging platform through the
//! [`PlatformClient`](formdesk_core::platform::PlatformClient) trait.
//!
//! # Module Structure
//!
//! - `session_manager`: Named platform sessions and their sign-in (`PlatformSessionManager`)
//! - `operations`: Dialogs, messages, participants, invitations (`ClientOperations`)
//! - `auto_responder`: Canned replies to private messages (`AutoResponder`)
//! - `profiles`: Named profile CRUD over a `ProfileRepository` (`ProfileManager`)
//! - `facade`: Synchronous headless API over the async loop and worker pool (`ClientFacade`)

pub mod auto_responder;
pub mod facade;
pub mod operations;
pub mod profiles;
pub mod session_manager;

#[cfg(test)]
mod test_support;

pub use auto_responder::AutoResponder;
pub use facade::ClientFacade;
pub use operations::{ClientOperations, InviteSummary};
pub use profiles::ProfileManager;
pub use session_manager::{PlatformSessionManager, SessionState};
