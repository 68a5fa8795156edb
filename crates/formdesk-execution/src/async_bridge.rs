//! A single cooperative async loop that synchronous code can submit work to.
//!
//! The loop is a tokio current-thread runtime driven by one named background
//! thread. Any thread may call [`AsyncBridge::submit`]; the future is sent to
//! the loop thread, spawned there, and its output is handed back through a
//! [`BridgeHandle`] the caller can block on.
//!
//! # Usage
//!
//! ```ignore
//! let bridge = AsyncBridge::new("client-loop");
//! bridge.start()?;
//! let value = bridge.submit(async { 21 * 2 })?.wait()?;
//! bridge.shutdown();
//! ```

use crate::panic_message;
use formdesk_core::error::{FormdeskError, Result};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Mutex, mpsc as std_mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default bound for joining the loop thread on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type Unit = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type Outcome<T> = std::result::Result<T, String>;

enum BridgeState {
    Idle,
    Running(LoopThread),
    Stopped,
}

struct LoopThread {
    sender: mpsc::UnboundedSender<Unit>,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of the async loop thread.
///
/// Lifecycle: `new` (idle) -> `start` (running) -> `shutdown` (stopped).
/// A stopped bridge cannot be restarted.
pub struct AsyncBridge {
    name: String,
    shutdown_timeout: Duration,
    state: Mutex<BridgeState>,
}

impl AsyncBridge {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_shutdown_timeout(name, DEFAULT_SHUTDOWN_TIMEOUT)
    }

    pub fn with_shutdown_timeout(name: impl Into<String>, shutdown_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            shutdown_timeout,
            state: Mutex::new(BridgeState::Idle),
        }
    }

    /// Creates the runtime and spawns the loop thread.
    ///
    /// Calling `start` on a running bridge does nothing.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            BridgeState::Running(_) => {
                tracing::debug!("[AsyncBridge:{}] Already running", self.name);
                return Ok(());
            }
            BridgeState::Stopped => {
                return Err(FormdeskError::unavailable(format!(
                    "async bridge '{}' was shut down",
                    self.name
                )));
            }
            BridgeState::Idle => {}
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (sender, receiver) = mpsc::unbounded_channel::<Unit>();
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                runtime.block_on(run_loop(receiver, loop_token));
                tracing::debug!("[AsyncBridge:{}] Loop exited", name);
            })?;

        *state = BridgeState::Running(LoopThread {
            sender,
            token,
            handle,
        });
        tracing::info!("[AsyncBridge:{}] Started", self.name);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(|e| e.into_inner()),
            BridgeState::Running(_)
        )
    }

    /// Schedules `future` on the loop thread.
    ///
    /// Fails with `Unavailable` before [`start`](Self::start) and after
    /// [`shutdown`](Self::shutdown). A unit that panics resolves to an
    /// execution error on its handle.
    pub fn submit<F, T>(&self, future: F) -> Result<BridgeHandle<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = std_mpsc::sync_channel::<Outcome<T>>(1);
        let unit: Unit = Box::pin(async move {
            let outcome = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .map_err(panic_message);
            let _ = tx.send(outcome);
        });

        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            BridgeState::Running(loop_thread) => {
                loop_thread.sender.send(unit).map_err(|_| {
                    FormdeskError::unavailable(format!("async bridge '{}' loop has exited", self.name))
                })?;
            }
            BridgeState::Idle => {
                return Err(FormdeskError::unavailable(format!(
                    "async bridge '{}' is not started",
                    self.name
                )));
            }
            BridgeState::Stopped => {
                return Err(FormdeskError::unavailable(format!(
                    "async bridge '{}' was shut down",
                    self.name
                )));
            }
        }

        Ok(BridgeHandle { receiver: rx })
    }

    /// Stops the loop and joins its thread, waiting at most the configured
    /// shutdown timeout. Safe to call more than once.
    pub fn shutdown(&self) {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *state, BridgeState::Stopped)
        };

        let LoopThread {
            sender,
            token,
            handle,
        } = match previous {
            BridgeState::Running(loop_thread) => loop_thread,
            BridgeState::Idle | BridgeState::Stopped => return,
        };

        token.cancel();
        drop(sender);

        let deadline = Instant::now() + self.shutdown_timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        if handle.is_finished() {
            if handle.join().is_err() {
                tracing::error!("[AsyncBridge:{}] Loop thread panicked", self.name);
            }
            tracing::info!("[AsyncBridge:{}] Stopped", self.name);
        } else {
            tracing::warn!(
                "[AsyncBridge:{}] Loop thread did not exit within {:?}; detaching",
                self.name,
                self.shutdown_timeout
            );
        }
    }
}

impl Drop for AsyncBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_loop(mut receiver: mpsc::UnboundedReceiver<Unit>, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            unit = receiver.recv() => match unit {
                Some(unit) => {
                    tokio::spawn(unit);
                }
                None => break,
            },
        }
    }
}

/// Handle to the output of a submitted unit.
///
/// Waiting blocks the calling thread, so it must not be used from inside an
/// async task.
pub struct BridgeHandle<T> {
    receiver: std_mpsc::Receiver<Outcome<T>>,
}

impl<T> BridgeHandle<T> {
    /// Blocks until the unit finishes.
    pub fn wait(self) -> Result<T> {
        match self.receiver.recv() {
            Ok(outcome) => outcome.map_err(unit_panicked),
            Err(_) => Err(dropped()),
        }
    }

    /// Blocks for at most `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome.map_err(unit_panicked),
            Err(std_mpsc::RecvTimeoutError::Timeout) => Err(FormdeskError::execution(format!(
                "timed out after {:?} waiting for async unit",
                timeout
            ))),
            Err(std_mpsc::RecvTimeoutError::Disconnected) => Err(dropped()),
        }
    }
}

fn unit_panicked(message: String) -> FormdeskError {
    FormdeskError::execution(format!("async unit panicked: {}", message))
}

fn dropped() -> FormdeskError {
    FormdeskError::unavailable("async bridge stopped before the unit completed")
}
