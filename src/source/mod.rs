//! Event source adapters
//!
//! Each adapter attaches a callback to one native notification channel and
//! translates the native payload into a [`NormalizedEvent`]. The coordinator
//! sees only the [`EventSource`] trait.

use eyre::Result;
use std::fmt;
use std::sync::Arc;

use crate::event::NormalizedEvent;
use crate::native::{HookId, ManagementWatcher, SystemEvents};

pub mod adapters;

pub use adapters::{ManagementEventAdapter, SystemEventAdapter};

/// Callback every adapter delivers normalized events to
pub type Callback = Arc<dyn Fn(NormalizedEvent) + Send + Sync>;

/// The five fixed notification sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    PowerModeChanged,
    EventsThreadShutdown,
    SessionEnded,
    SessionSwitch,
    PowerManagementEvents,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerModeChanged => f.write_str("SystemEvents.PowerModeChanged"),
            Self::EventsThreadShutdown => f.write_str("SystemEvents.EventsThreadShutdown"),
            Self::SessionEnded => f.write_str("SystemEvents.SessionEnded"),
            Self::SessionSwitch => f.write_str("SystemEvents.SessionSwitch"),
            Self::PowerManagementEvents => f.write_str("Win32_PowerManagementEvent"),
        }
    }
}

/// Proof of one successful registration.
///
/// Not `Clone`: `unregister` consumes it, so a handle can be released once.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    source: SourceId,
    hook: HookId,
}

impl SubscriptionHandle {
    pub fn new(source: SourceId, hook: HookId) -> Self {
        Self { source, hook }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn hook(&self) -> HookId {
        self.hook
    }
}

pub trait EventSource: Send {
    fn id(&self) -> SourceId;

    /// Attach `on_event` to the native source. Fails if the subsystem is unavailable.
    fn register(&mut self, on_event: Callback) -> Result<SubscriptionHandle>;

    fn unregister(&mut self, handle: SubscriptionHandle) -> Result<()>;
}

/// All five sources, in registration order
pub fn standard_sources(events: Arc<SystemEvents>, watcher: Arc<dyn ManagementWatcher>) -> Vec<Box<dyn EventSource>> {
    vec![
        Box::new(SystemEventAdapter::power_mode_changed(Arc::clone(&events))),
        Box::new(SystemEventAdapter::events_thread_shutdown(Arc::clone(&events))),
        Box::new(SystemEventAdapter::session_ended(Arc::clone(&events))),
        Box::new(SystemEventAdapter::session_switch(events)),
        Box::new(ManagementEventAdapter::new(watcher)),
    ]
}
