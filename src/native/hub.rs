//! Native callback lists
//!
//! A [`NotificationHub`] is the attach/detach/fire surface a native subsystem
//! exposes for one kind of notification. Hooks run synchronously on whichever
//! thread fires the hub.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type HookId = u64;

pub type Hook<T> = Arc<dyn Fn(T) + Send + Sync>;

pub struct NotificationHub<T> {
    name: &'static str,
    hooks: Mutex<Vec<(HookId, Hook<T>)>>,
    next_id: AtomicU64,
}

impl<T: Clone> NotificationHub<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            hooks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn attach(&self, hook: Hook<T>) -> HookId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, hook));
        log::debug!("Attached hook {} to {}", id, self.name);
        id
    }

    /// Returns false if `id` was not attached
    pub fn detach(&self, id: HookId) -> bool {
        let mut hooks = self.lock();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        let removed = hooks.len() != before;
        if removed {
            log::debug!("Detached hook {} from {}", id, self.name);
        }
        removed
    }

    /// Invoke every attached hook on the calling thread
    pub fn fire(&self, payload: T) {
        // Snapshot so hooks may attach/detach without deadlocking
        let hooks: Vec<Hook<T>> = self.lock().iter().map(|(_, hook)| Arc::clone(hook)).collect();
        for hook in hooks {
            hook(payload.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(HookId, Hook<T>)>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
