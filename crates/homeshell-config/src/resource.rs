//! Reference-counted shared config resources.
//!
//! Each config file is owned by one [`SharedResource`]: the resource data
//! behind a reader/writer lock, plus the [`ListenerRegistry`] for its keys.
//! A [`ResourceSlot`] remembers the live resource weakly and hands out
//! counted [`ResourceHandle`]s. The first handle creates the resource; the
//! last one calls [`Resource::release`] while still holding the slot, so a
//! handle acquired concurrently either shares the old resource or is built
//! after the release finished.

use std::ops::Deref;
use std::sync::{
    Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

use crate::listener::ListenerRegistry;

/// Data that can live in a [`SharedResource`].
pub trait Resource: Send + Sync + 'static {
    /// Called when the last handle is dropped.
    fn release(&mut self) {}
}

/// A resource guarded by a reader/writer lock.
pub struct SharedResource<T: Resource> {
    lock: RwLock<T>,
    listeners: ListenerRegistry,
}

impl<T: Resource> SharedResource<T> {
    pub fn new(resource: T) -> Self {
        Self {
            lock: RwLock::new(resource),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Shared access. A poisoned lock is recovered rather than propagated.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }
}

struct SlotState<T: Resource> {
    current: Weak<SharedResource<T>>,
    handles: usize,
}

type SharedState<T> = Arc<Mutex<SlotState<T>>>;

fn lock_state<T: Resource>(state: &Mutex<SlotState<T>>) -> MutexGuard<'_, SlotState<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Weak home of at most one live [`SharedResource`].
pub struct ResourceSlot<T: Resource> {
    state: OnceLock<SharedState<T>>,
}

impl<T: Resource> Default for ResourceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> ResourceSlot<T> {
    pub const fn new() -> Self {
        Self {
            state: OnceLock::new(),
        }
    }

    fn state(&self) -> &SharedState<T> {
        self.state.get_or_init(|| {
            Arc::new(Mutex::new(SlotState {
                current: Weak::new(),
                handles: 0,
            }))
        })
    }

    /// Return a handle to the live resource, or build a new one with `init`.
    ///
    /// `init` receives a weak handle to the resource being built, which it may
    /// store but not upgrade yet.
    pub fn acquire_with(
        &self,
        init: impl FnOnce(Weak<SharedResource<T>>) -> T,
    ) -> ResourceHandle<T> {
        let state = self.state();
        let mut guard = lock_state(state);
        let resource = match guard.current.upgrade() {
            Some(resource) => resource,
            None => {
                let resource =
                    Arc::new_cyclic(|weak| SharedResource::new(init(Weak::clone(weak))));
                guard.current = Arc::downgrade(&resource);
                log::debug!("Created shared resource {}", std::any::type_name::<T>());
                resource
            },
        };
        guard.handles += 1;
        ResourceHandle {
            resource,
            state: Arc::clone(state),
        }
    }

    /// The live resource, if anything still holds it.
    pub fn current(&self) -> Option<Arc<SharedResource<T>>> {
        lock_state(self.state()).current.upgrade()
    }
}

/// A counted handle to a slot's resource.
pub struct ResourceHandle<T: Resource> {
    resource: Arc<SharedResource<T>>,
    state: SharedState<T>,
}

impl<T: Resource> ResourceHandle<T> {
    pub fn resource(&self) -> &Arc<SharedResource<T>> {
        &self.resource
    }

    /// Number of live handles to this slot's resource.
    pub fn handle_count(&self) -> usize {
        lock_state(&self.state).handles
    }
}

impl<T: Resource> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        lock_state(&self.state).handles += 1;
        Self {
            resource: Arc::clone(&self.resource),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Resource> Deref for ResourceHandle<T> {
    type Target = SharedResource<T>;

    fn deref(&self) -> &SharedResource<T> {
        &self.resource
    }
}

impl<T: Resource> Drop for ResourceHandle<T> {
    fn drop(&mut self) {
        let mut guard = lock_state(&self.state);
        guard.handles = guard.handles.saturating_sub(1);
        if guard.handles == 0 {
            self.resource.write().release();
            log::debug!("Released shared resource {}", std::any::type_name::<T>());
        }
    }
}
