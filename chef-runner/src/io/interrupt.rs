//! Cooperative cancellation driven by Ctrl-C.
//!
//! The batch loop never reacts to a signal directly. A watcher thread turns
//! the first interrupt into a [`CancelToken`] flip that the loop observes
//! between steps; a second interrupt exits immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::exit_codes;

/// Shared cancellation flag checked at batch checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Poll for cancellation until `grace` has passed.
    pub fn cancelled_within(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(unix)]
type Interrupts = tokio::signal::unix::Signal;
#[cfg(windows)]
type Interrupts = tokio::signal::windows::CtrlC;

/// Registers the Ctrl-C handler immediately, before the watcher first polls.
#[cfg(unix)]
fn listen() -> std::io::Result<Interrupts> {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
}

#[cfg(windows)]
fn listen() -> std::io::Result<Interrupts> {
    tokio::signal::windows::ctrl_c()
}

/// Listens for Ctrl-C while alive. Dropping it stops and joins the watcher.
pub struct InterruptWatcher {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl InterruptWatcher {
    pub fn install(token: CancelToken) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build signal runtime")?;
        let mut interrupts = {
            let _guard = runtime.enter();
            listen().context("listen for interrupts")?
        };
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = thread::Builder::new()
            .name("interrupt-watcher".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    loop {
                        tokio::select! {
                            received = interrupts.recv() => {
                                if received.is_none() {
                                    warn!("interrupt stream closed");
                                    return;
                                }
                                if token.is_cancelled() {
                                    warn!("second interrupt, exiting now");
                                    std::process::exit(exit_codes::INTERRUPTED);
                                }
                                warn!("interrupt received, stopping after the current step");
                                token.cancel();
                            }
                            _ = &mut shutdown_rx => {
                                debug!("interrupt watcher shut down");
                                return;
                            }
                        }
                    }
                });
            })
            .context("spawn interrupt watcher")?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }
}

impl Drop for InterruptWatcher {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("interrupt watcher panicked");
        }
    }
}
