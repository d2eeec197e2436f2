//! Cancellation-request handling
//!
//! [`CtrlCHandler`] intercepts the console interrupt on a small tokio runtime.
//! Once installed the default terminate behavior is suppressed and every
//! interrupt sets the [`CancellationSignal`].

use eyre::{Context, Result, eyre};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

use super::signal::CancellationSignal;

pub trait InterruptHook: Send {
    fn install(&mut self, signal: Arc<CancellationSignal>) -> Result<()>;

    fn remove(&mut self) -> Result<()>;
}

#[cfg(unix)]
type Interrupts = tokio::signal::unix::Signal;

#[cfg(unix)]
fn listen() -> std::io::Result<Interrupts> {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
}

#[cfg(windows)]
type Interrupts = tokio::signal::windows::CtrlC;

#[cfg(windows)]
fn listen() -> std::io::Result<Interrupts> {
    tokio::signal::windows::ctrl_c()
}

#[derive(Default)]
pub struct CtrlCHandler {
    runtime: Option<Runtime>,
    task: Option<JoinHandle<()>>,
}

impl CtrlCHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InterruptHook for CtrlCHandler {
    fn install(&mut self, signal: Arc<CancellationSignal>) -> Result<()> {
        if self.runtime.is_some() {
            return Err(eyre!("Interrupt handler is already installed"));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("interrupt")
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        // Register inside the runtime so the handler is live before we return
        let mut interrupts = runtime
            .block_on(async { listen() })
            .context("Failed to install interrupt handler")?;

        let task = runtime.spawn(async move {
            while interrupts.recv().await.is_some() {
                if signal.set() {
                    log::info!("Interrupt received, stopping");
                } else {
                    log::debug!("Interrupt received, already stopping");
                }
            }
        });

        self.runtime = Some(runtime);
        self.task = Some(task);
        log::debug!("Interrupt handler installed");
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        match self.runtime.take() {
            Some(runtime) => {
                runtime.shutdown_background();
                log::debug!("Interrupt handler removed");
                Ok(())
            }
            None => Err(eyre!("Interrupt handler is not installed")),
        }
    }
}

impl Drop for CtrlCHandler {
    fn drop(&mut self) {
        if self.runtime.is_some() {
            let _ = self.remove();
        }
    }
}
