//! The concrete adapters over [`SystemEvents`] and [`ManagementWatcher`]

use eyre::{Context, Result, eyre};
use std::sync::Arc;

use super::{Callback, EventSource, SourceId, SubscriptionHandle};
use crate::event::{NormalizedEvent, PowerManagementKind, PowerMode, SessionEndReason, SessionSwitchReason};
use crate::native::{Hook, ManagementEvent, ManagementWatcher, NotificationHub, SystemEvents, SystemHubs};

/// Property carrying the power-management event code
pub const EVENT_TYPE_PROPERTY: &str = "EventType";

/// Adapter over one callback list of the power/session subsystem
pub struct SystemEventAdapter<T> {
    id: SourceId,
    events: Arc<SystemEvents>,
    select: fn(&SystemHubs) -> &NotificationHub<T>,
    translate: fn(T) -> NormalizedEvent,
}

impl SystemEventAdapter<PowerMode> {
    pub fn power_mode_changed(events: Arc<SystemEvents>) -> Self {
        Self {
            id: SourceId::PowerModeChanged,
            events,
            select: |hubs| &hubs.power_mode_changed,
            translate: NormalizedEvent::power_mode_changed,
        }
    }
}

impl SystemEventAdapter<()> {
    pub fn events_thread_shutdown(events: Arc<SystemEvents>) -> Self {
        Self {
            id: SourceId::EventsThreadShutdown,
            events,
            select: |hubs| &hubs.events_thread_shutdown,
            translate: |()| NormalizedEvent::events_thread_shutdown(),
        }
    }
}

impl SystemEventAdapter<SessionEndReason> {
    pub fn session_ended(events: Arc<SystemEvents>) -> Self {
        Self {
            id: SourceId::SessionEnded,
            events,
            select: |hubs| &hubs.session_ended,
            translate: NormalizedEvent::session_ended,
        }
    }
}

impl SystemEventAdapter<SessionSwitchReason> {
    pub fn session_switch(events: Arc<SystemEvents>) -> Self {
        Self {
            id: SourceId::SessionSwitch,
            events,
            select: |hubs| &hubs.session_switch,
            translate: NormalizedEvent::session_switch,
        }
    }
}

impl<T: Clone + Send + 'static> EventSource for SystemEventAdapter<T> {
    fn id(&self) -> SourceId {
        self.id
    }

    fn register(&mut self, on_event: Callback) -> Result<SubscriptionHandle> {
        let translate = self.translate;
        let hook: Hook<T> = Arc::new(move |payload: T| on_event(translate(payload)));
        let hook_id = self
            .events
            .attach(self.select, hook)
            .context(format!("Failed to register {}", self.id))?;
        Ok(SubscriptionHandle::new(self.id, hook_id))
    }

    fn unregister(&mut self, handle: SubscriptionHandle) -> Result<()> {
        if handle.source() != self.id {
            return Err(eyre!("{} cannot release a {} subscription", self.id, handle.source()));
        }
        self.events
            .detach(self.select, handle.hook())
            .context(format!("Failed to unregister {}", self.id))
    }
}

/// Translate a power-management event by its `EventType` code
pub fn translate_management(event: &ManagementEvent) -> NormalizedEvent {
    let code = event.int32_property(EVENT_TYPE_PROPERTY);
    NormalizedEvent::power_management(PowerManagementKind::from_code(code))
}

/// Adapter over the management-event watcher
pub struct ManagementEventAdapter {
    watcher: Arc<dyn ManagementWatcher>,
}

impl ManagementEventAdapter {
    pub fn new(watcher: Arc<dyn ManagementWatcher>) -> Self {
        Self { watcher }
    }
}

impl EventSource for ManagementEventAdapter {
    fn id(&self) -> SourceId {
        SourceId::PowerManagementEvents
    }

    fn register(&mut self, on_event: Callback) -> Result<SubscriptionHandle> {
        let hook_id = self
            .watcher
            .event_arrived()
            .attach(Arc::new(move |event: ManagementEvent| on_event(translate_management(&event))));

        if let Err(e) = self.watcher.start() {
            self.watcher.event_arrived().detach(hook_id);
            return Err(e).context(format!("Failed to start watcher for {}", self.watcher.query()));
        }
        Ok(SubscriptionHandle::new(self.id(), hook_id))
    }

    fn unregister(&mut self, handle: SubscriptionHandle) -> Result<()> {
        if handle.source() != self.id() {
            return Err(eyre!("{} cannot release a {} subscription", self.id(), handle.source()));
        }

        // Stop delivery before detaching, and detach even if stopping failed
        let stopped = self.watcher.stop();
        let detached = self.watcher.event_arrived().detach(handle.hook());

        stopped.context(format!("Failed to stop watcher for {}", self.watcher.query()))?;
        if !detached {
            return Err(eyre!("Hook {} is not attached to {}", handle.hook(), self.watcher.query()));
        }
        Ok(())
    }
}
