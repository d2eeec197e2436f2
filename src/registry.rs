//! Subscription registry
//!
//! Records each successful registration in order and unwinds them in reverse.
//! Teardown is best-effort: a failed unregister is logged and the rest still
//! run.

use eyre::Result;

use crate::source::{Callback, EventSource, SourceId, SubscriptionHandle};

/// One registered source
#[derive(Debug)]
pub struct Subscription {
    pub source_id: SourceId,
    pub active: bool,
    index: usize,
    handle: Option<SubscriptionHandle>,
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every source in order.
    ///
    /// On the first failure, everything registered so far is torn down and the
    /// error is returned.
    pub fn register_all(&mut self, sources: &mut [Box<dyn EventSource>], on_event: &Callback) -> Result<()> {
        let mut failure = None;
        for (index, source) in sources.iter_mut().enumerate() {
            let source_id = source.id();
            match source.register(on_event.clone()) {
                Ok(handle) => {
                    log::debug!("Registered {}", source_id);
                    self.subscriptions.push(Subscription {
                        source_id,
                        active: true,
                        index,
                        handle: Some(handle),
                    });
                }
                Err(e) => {
                    log::error!("Failed to register {}: {:#}", source_id, e);
                    failure = Some(e);
                    break;
                }
            }
        }

        match failure {
            Some(e) => {
                self.teardown_all(sources);
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Unregister every active subscription in reverse registration order.
    ///
    /// Returns how many were released without error. Safe to call repeatedly;
    /// a released subscription is never released again.
    pub fn teardown_all(&mut self, sources: &mut [Box<dyn EventSource>]) -> usize {
        let mut released = 0;

        for subscription in self.subscriptions.iter_mut().rev() {
            let Some(handle) = subscription.handle.take() else {
                continue;
            };
            subscription.active = false;

            let Some(source) = sources.get_mut(subscription.index) else {
                log::warn!("No source for {} subscription", subscription.source_id);
                continue;
            };

            match source.unregister(handle) {
                Ok(()) => {
                    log::debug!("Unregistered {}", subscription.source_id);
                    released += 1;
                }
                Err(e) => log::warn!("Failed to unregister {}: {:#}", subscription.source_id, e),
            }
        }

        self.subscriptions.clear();
        released
    }

    #[allow(dead_code)]
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn active_count(&self) -> usize {
        self.subscriptions.iter().filter(|s| s.active).count()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use eyre::eyre;
    use std::sync::{Arc, Mutex};

    /// What happened to a scripted source, in order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Register(SourceId),
        Unregister(SourceId),
    }

    pub(crate) type CallLog = Arc<Mutex<Vec<Call>>>;

    /// Source that records calls and fails on demand
    pub(crate) struct ScriptedSource {
        pub(crate) id: SourceId,
        pub(crate) log: CallLog,
        pub(crate) fail_register: bool,
        pub(crate) fail_unregister: bool,
        pub(crate) callback: Arc<Mutex<Option<Callback>>>,
    }

    impl ScriptedSource {
        pub(crate) fn new(id: SourceId, log: &CallLog) -> Self {
            Self {
                id,
                log: Arc::clone(log),
                fail_register: false,
                fail_unregister: false,
                callback: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl EventSource for ScriptedSource {
        fn id(&self) -> SourceId {
            self.id
        }

        fn register(&mut self, on_event: Callback) -> Result<SubscriptionHandle> {
            if self.fail_register {
                return Err(eyre!("{} is unavailable", self.id));
            }
            self.log.lock().unwrap().push(Call::Register(self.id));
            *self.callback.lock().unwrap() = Some(on_event);
            Ok(SubscriptionHandle::new(self.id, 1))
        }

        fn unregister(&mut self, handle: SubscriptionHandle) -> Result<()> {
            assert_eq!(handle.source(), self.id);
            self.log.lock().unwrap().push(Call::Unregister(self.id));
            *self.callback.lock().unwrap() = None;
            if self.fail_unregister {
                return Err(eyre!("{} refused to detach", self.id));
            }
            Ok(())
        }
    }

    pub(crate) const ALL_SOURCES: [SourceId; 5] = [
        SourceId::PowerModeChanged,
        SourceId::EventsThreadShutdown,
        SourceId::SessionEnded,
        SourceId::SessionSwitch,
        SourceId::PowerManagementEvents,
    ];

    pub(crate) fn scripted_sources(log: &CallLog) -> Vec<ScriptedSource> {
        ALL_SOURCES.iter().map(|id| ScriptedSource::new(*id, log)).collect()
    }

    pub(crate) fn boxed(sources: Vec<ScriptedSource>) -> Vec<Box<dyn EventSource>> {
        sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn EventSource>)
            .collect()
    }

    fn noop_callback() -> Callback {
        Arc::new(|_| {})
    }

    #[test]
    fn test_teardown_reverses_registration_order() {
        let log = CallLog::default();
        let mut sources = boxed(scripted_sources(&log));
        let mut registry = SubscriptionRegistry::new();

        registry.register_all(&mut sources, &noop_callback()).unwrap();
        assert_eq!(registry.active_count(), 5);

        assert_eq!(registry.teardown_all(&mut sources), 5);
        assert_eq!(registry.active_count(), 0);

        let mut expected: Vec<Call> = ALL_SOURCES.iter().map(|id| Call::Register(*id)).collect();
        expected.extend(ALL_SOURCES.iter().rev().map(|id| Call::Unregister(*id)));
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[test]
    fn test_teardown_twice_releases_once() {
        let log = CallLog::default();
        let mut sources = boxed(scripted_sources(&log));
        let mut registry = SubscriptionRegistry::new();

        registry.register_all(&mut sources, &noop_callback()).unwrap();
        registry.teardown_all(&mut sources);
        assert_eq!(registry.teardown_all(&mut sources), 0);

        let unregisters = log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::Unregister(_)))
            .count();
        assert_eq!(unregisters, 5);
    }

    #[test]
    fn test_failed_registration_unwinds_earlier_sources() {
        let log = CallLog::default();
        let mut scripted = scripted_sources(&log);
        scripted[2].fail_register = true;
        let mut sources = boxed(scripted);
        let mut registry = SubscriptionRegistry::new();

        let err = registry.register_all(&mut sources, &noop_callback()).unwrap_err();
        assert!(err.to_string().contains("SystemEvents.SessionEnded"));
        assert_eq!(registry.active_count(), 0);
        assert!(registry.subscriptions().is_empty());

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Call::Register(SourceId::PowerModeChanged),
                Call::Register(SourceId::EventsThreadShutdown),
                Call::Unregister(SourceId::EventsThreadShutdown),
                Call::Unregister(SourceId::PowerModeChanged),
            ]
        );
    }

    #[test]
    fn test_teardown_continues_past_failures() {
        let log = CallLog::default();
        let mut scripted = scripted_sources(&log);
        scripted[3].fail_unregister = true;
        let mut sources = boxed(scripted);
        let mut registry = SubscriptionRegistry::new();

        registry.register_all(&mut sources, &noop_callback()).unwrap();
        assert_eq!(registry.teardown_all(&mut sources), 4);
        assert_eq!(registry.active_count(), 0);

        let unregistered: Vec<Call> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::Unregister(_)))
            .cloned()
            .collect();
        assert_eq!(unregistered.len(), 5);
        assert_eq!(unregistered.last(), Some(&Call::Unregister(SourceId::PowerModeChanged)));
    }
}
