//! Boundary models of the native notification subsystems
//!
//! - [`SystemEvents`] - power and session notifications, delivered synchronously
//!   from a pump thread through [`NotificationHub`]s
//! - [`ManagementWatcher`] - a query-based watcher that delivers property bags
//!   once started
//!
//! Concrete backends live in [`journal`].

use eyre::{Context, Result, eyre};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub mod hub;
pub mod journal;
pub mod rules;

pub use hub::{Hook, HookId, NotificationHub};

use crate::event::{PowerMode, SessionEndReason, SessionSwitchReason};

/// One notification raised by the power/session subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemNotification {
    PowerModeChanged(PowerMode),
    SessionEnded(SessionEndReason),
    SessionSwitch(SessionSwitchReason),
}

/// The callback lists of the power/session subsystem
pub struct SystemHubs {
    pub power_mode_changed: NotificationHub<PowerMode>,
    pub events_thread_shutdown: NotificationHub<()>,
    pub session_ended: NotificationHub<SessionEndReason>,
    pub session_switch: NotificationHub<SessionSwitchReason>,
}

impl SystemHubs {
    fn new() -> Self {
        Self {
            power_mode_changed: NotificationHub::new("PowerModeChanged"),
            events_thread_shutdown: NotificationHub::new("EventsThreadShutdown"),
            session_ended: NotificationHub::new("SessionEnded"),
            session_switch: NotificationHub::new("SessionSwitch"),
        }
    }

    pub fn deliver(&self, notification: SystemNotification) {
        match notification {
            SystemNotification::PowerModeChanged(mode) => self.power_mode_changed.fire(mode),
            SystemNotification::SessionEnded(reason) => self.session_ended.fire(reason),
            SystemNotification::SessionSwitch(reason) => self.session_switch.fire(reason),
        }
    }

    /// Called by the pump when its thread exits
    pub fn pump_exited(&self) {
        self.events_thread_shutdown.fire(());
    }

    pub fn hook_count(&self) -> usize {
        self.power_mode_changed.len()
            + self.events_thread_shutdown.len()
            + self.session_ended.len()
            + self.session_switch.len()
    }
}

/// Source of system notifications feeding a [`SystemHubs`]
pub trait EventPump: Send + Sync {
    /// Start delivering into `hubs`. Fails if the subsystem is unavailable.
    fn start(&self, hubs: Arc<SystemHubs>) -> Result<Box<dyn RunningPump>>;
}

pub trait RunningPump: Send {
    fn stop(self: Box<Self>) -> Result<()>;
}

/// Power and session notification subsystem
///
/// The pump is started lazily by the first attached hook and stopped when the
/// last hook is detached.
pub struct SystemEvents {
    hubs: Arc<SystemHubs>,
    backend: Box<dyn EventPump>,
    running: Mutex<Option<Box<dyn RunningPump>>>,
}

impl SystemEvents {
    pub fn new(backend: Box<dyn EventPump>) -> Self {
        Self {
            hubs: Arc::new(SystemHubs::new()),
            backend,
            running: Mutex::new(None),
        }
    }

    #[allow(dead_code)] // Test and simulation access to the callback lists
    pub fn hubs(&self) -> &Arc<SystemHubs> {
        &self.hubs
    }

    #[allow(dead_code)]
    pub fn is_pumping(&self) -> bool {
        self.running().is_some()
    }

    pub fn attach<T: Clone>(&self, select: fn(&SystemHubs) -> &NotificationHub<T>, hook: Hook<T>) -> Result<HookId> {
        let mut running = self.running();
        if running.is_none() {
            let pump = self
                .backend
                .start(Arc::clone(&self.hubs))
                .context("System event pump could not be started")?;
            log::info!("System event pump started");
            *running = Some(pump);
        }
        Ok(select(&self.hubs).attach(hook))
    }

    pub fn detach<T: Clone>(&self, select: fn(&SystemHubs) -> &NotificationHub<T>, id: HookId) -> Result<()> {
        let mut running = self.running();
        let hub = select(&self.hubs);
        if !hub.detach(id) {
            return Err(eyre!("Hook {} is not attached to {}", id, hub.name()));
        }

        if self.hubs.hook_count() == 0
            && let Some(pump) = running.take()
        {
            pump.stop().context("System event pump did not stop cleanly")?;
            log::info!("System event pump stopped");
        }
        Ok(())
    }

    fn running(&self) -> MutexGuard<'_, Option<Box<dyn RunningPump>>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A management event: a bag of named properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagementEvent {
    properties: Map<String, Value>,
}

impl ManagementEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Read a property as a 32-bit integer.
    ///
    /// Numbers are range-checked (floats rounded), numeric strings parsed,
    /// booleans map to 1/0. Anything else, including a missing property, is 0.
    pub fn int32_property(&self, name: &str) -> i32 {
        let value = match self.property(name) {
            Some(value) => value,
            None => {
                log::warn!("Management event has no {} property", name);
                return 0;
            }
        };

        let converted = match value {
            Value::Null => Some(0),
            Value::Bool(b) => Some(i32::from(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).ok()
                } else if let Some(u) = n.as_u64() {
                    i32::try_from(u).ok()
                } else {
                    n.as_f64()
                        .map(f64::round)
                        .filter(|f| *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX))
                        .map(|f| f as i32)
                }
            }
            Value::String(s) => s.trim().parse::<i32>().ok(),
            Value::Array(_) | Value::Object(_) => None,
        };

        converted.unwrap_or_else(|| {
            log::warn!("Management event property {} is not an integer: {}", name, value);
            0
        })
    }
}

impl fmt::Display for ManagementEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.properties.clone()))
    }
}

/// Query-based management event watcher
pub trait ManagementWatcher: Send + Sync {
    /// Event class this watcher is subscribed to
    fn query(&self) -> &str;

    fn event_arrived(&self) -> &NotificationHub<ManagementEvent>;

    fn start(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;
}
