//! Lifecycle coordinator
//!
//! Drives `Idle -> Running -> Stopping -> Stopped`:
//! - `start` registers every source and installs the interrupt hook
//! - `wait` blocks the calling thread until the cancellation signal is set
//! - `stop` removes the interrupt hook and unwinds the sources in reverse

use eyre::{Result, eyre};
use std::sync::Arc;

pub mod interrupt;
pub mod signal;

pub use interrupt::{CtrlCHandler, InterruptHook};
pub use signal::CancellationSignal;

use crate::event::NormalizedEvent;
use crate::registry::SubscriptionRegistry;
use crate::sink::Sink;
use crate::source::{Callback, EventSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

pub struct LifecycleCoordinator {
    state: LifecycleState,
    sources: Vec<Box<dyn EventSource>>,
    registry: SubscriptionRegistry,
    signal: Arc<CancellationSignal>,
    sink: Arc<Sink>,
    interrupt: Box<dyn InterruptHook>,
}

impl LifecycleCoordinator {
    pub fn new(sources: Vec<Box<dyn EventSource>>, sink: Arc<Sink>, interrupt: Box<dyn InterruptHook>) -> Self {
        Self {
            state: LifecycleState::Idle,
            sources,
            registry: SubscriptionRegistry::new(),
            signal: Arc::new(CancellationSignal::new()),
            sink,
            interrupt,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Handle for requesting cancellation from another thread
    #[allow(dead_code)]
    pub fn signal(&self) -> Arc<CancellationSignal> {
        Arc::clone(&self.signal)
    }

    #[allow(dead_code)]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Register all sources and install the interrupt hook.
    ///
    /// On failure nothing stays registered and the state remains `Idle`.
    pub fn start(&mut self) -> Result<()> {
        if self.state != LifecycleState::Idle {
            return Err(eyre!("Cannot start from {:?}", self.state));
        }

        let sink = Arc::clone(&self.sink);
        let on_event: Callback = Arc::new(move |event: NormalizedEvent| sink.emit_now(&event));
        self.registry.register_all(&mut self.sources, &on_event)?;

        if let Err(e) = self.interrupt.install(Arc::clone(&self.signal)) {
            self.registry.teardown_all(&mut self.sources);
            return Err(e);
        }

        self.state = LifecycleState::Running;
        log::info!("Running with {} subscriptions", self.registry.active_count());
        self.sink.message("Event listeners started");
        Ok(())
    }

    /// Block until cancellation is requested. No-op unless `Running`.
    pub fn wait(&mut self) {
        if self.state != LifecycleState::Running {
            return;
        }
        self.signal.wait();
        self.state = LifecycleState::Stopping;
    }

    /// Remove the interrupt hook and tear down every subscription.
    ///
    /// From `Running` this first sets the cancellation signal. Calling it again
    /// once `Stopped`, or before `start`, does nothing.
    pub fn stop(&mut self) {
        match self.state {
            LifecycleState::Idle | LifecycleState::Stopped => return,
            LifecycleState::Running => {
                self.signal.set();
                self.state = LifecycleState::Stopping;
            }
            LifecycleState::Stopping => {}
        }

        if let Err(e) = self.interrupt.remove() {
            log::warn!("Failed to remove interrupt handler: {:#}", e);
        }
        let released = self.registry.teardown_all(&mut self.sources);
        log::info!("Released {} of {} subscriptions", released, self.sources.len());

        self.state = LifecycleState::Stopped;
        self.sink.message("Event listeners stopped");
    }

    /// `start`, `wait`, `stop`
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        self.wait();
        self.stop();
        Ok(())
    }
}
