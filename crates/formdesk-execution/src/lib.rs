//! Execution layer: the cooperative async loop, the blocking worker pool and
//! tracing setup.
//!
//! # Module Structure
//!
//! - `async_bridge`: One async loop on a dedicated thread, fed from any thread (`AsyncBridge`)
//! - `task_registry`: Bounded worker pool with per-task status tracking (`TaskRegistry`)
//! - `tracing_layer`: Tracing layer that forwards log events to a channel (`LogForwardLayer`)
//! - `logging`: Subscriber setup with stderr, rolling file and forwarding outputs

pub mod async_bridge;
pub mod logging;
pub mod task_registry;
pub mod tracing_layer;

pub use async_bridge::{AsyncBridge, BridgeHandle};
pub use logging::{LoggingOptions, init_tracing};
pub use task_registry::TaskRegistry;
pub use tracing_layer::{LogEvent, LogForwardLayer};

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
