//! Key-based change notification.
//!
//! A [`ListenerRegistry`] belongs to one config resource. Observers call
//! [`ListenerRegistry::subscribe`] and keep the returned [`Subscription`];
//! dropping it unsubscribes. Callbacks run synchronously on the notifying
//! thread with no registry lock held, so they may subscribe, unsubscribe or
//! query the resource again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback invoked with the key that changed.
pub type Callback = Arc<dyn Fn(&str) + Send + Sync>;

struct Entry {
    keys: BTreeSet<String>,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The set of observers of one config resource.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for the given keys.
    pub fn subscribe<I, S>(
        &self,
        keys: I,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = lock(&self.inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.insert(
            id,
            Entry {
                keys: keys.into_iter().map(Into::into).collect(),
                callback: Arc::new(callback),
            },
        );
        Subscription {
            registry: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every callback subscribed to `key`, in subscription order.
    pub fn notify(&self, key: &str) {
        let callbacks: Vec<Callback> = lock(&self.inner)
            .entries
            .values()
            .filter(|entry| entry.keys.contains(key))
            .map(|entry| Arc::clone(&entry.callback))
            .collect();
        log::trace!("Notifying {} listener(s) of \"{key}\"", callbacks.len());
        for callback in callbacks {
            callback(key);
        }
    }

    /// Notify each key in turn.
    pub fn notify_all<'a>(&self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            self.notify(key);
        }
    }
}

/// Handle to one registered callback. Unsubscribes when dropped.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    fn with_entry<R>(&self, f: impl FnOnce(&mut Entry) -> R) -> Option<R> {
        let registry = self.registry.upgrade()?;
        let mut registry = lock(&registry);
        registry.entries.get_mut(&self.id).map(f)
    }

    /// Also receive changes to `key`.
    pub fn subscribe_to_key(&self, key: impl Into<String>) {
        self.with_entry(|entry| entry.keys.insert(key.into()));
    }

    /// Stop receiving changes to `key`.
    pub fn unsubscribe_from_key(&self, key: &str) {
        self.with_entry(|entry| entry.keys.remove(key));
    }

    /// Keys this subscription currently receives, sorted.
    pub fn subscribed_keys(&self) -> Vec<String> {
        self.with_entry(|entry| entry.keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Call this subscription's callback once for every subscribed key, as if
    /// each had just changed.
    pub fn load_all_properties(&self) {
        let Some((keys, callback)) = self.with_entry(|entry| {
            (
                entry.keys.iter().cloned().collect::<Vec<_>>(),
                Arc::clone(&entry.callback),
            )
        }) else {
            return;
        };
        for key in &keys {
            callback(key.as_str());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |key: &str| sink.lock().unwrap().push(key.to_string()))
    }

    #[test]
    fn notify_reaches_matching_keys_only() {
        let registry = ListenerRegistry::new();
        let (seen, callback) = recorder();
        let _sub = registry.subscribe(["folder items"], callback);
        registry.notify("folder items");
        registry.notify("time format");
        assert_eq!(*seen.lock().unwrap(), vec!["folder items"]);
    }

    #[test]
    fn drop_unsubscribes() {
        let registry = ListenerRegistry::new();
        let (seen, callback) = recorder();
        let sub = registry.subscribe(["a"], callback);
        assert_eq!(registry.len(), 1);
        drop(sub);
        assert!(registry.is_empty());
        registry.notify("a");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn key_set_can_change() {
        let registry = ListenerRegistry::new();
        let (seen, callback) = recorder();
        let sub = registry.subscribe(Vec::<String>::new(), callback);
        sub.subscribe_to_key("b");
        sub.subscribe_to_key("a");
        assert_eq!(sub.subscribed_keys(), vec!["a", "b"]);
        sub.unsubscribe_from_key("b");
        registry.notify_all(["a", "b"]);
        assert_eq!(*seen.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn load_all_properties_calls_each_key() {
        let registry = ListenerRegistry::new();
        let (seen, callback) = recorder();
        let sub = registry.subscribe(["y", "x"], callback);
        sub.load_all_properties();
        assert_eq!(*seen.lock().unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn callback_may_subscribe_during_notify() {
        let registry = ListenerRegistry::new();
        let inner = ListenerRegistry::clone(&registry);
        let extra = Arc::new(Mutex::new(Vec::new()));
        let holder = Arc::clone(&extra);
        let _sub = registry.subscribe(["k"], move |_| {
            holder.lock().unwrap().push(inner.subscribe(["k"], |_| {}));
        });
        registry.notify("k");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn subscription_outlives_registry() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = registry.subscribe(["k"], move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(registry);
        sub.subscribe_to_key("other");
        sub.load_all_properties();
        assert!(sub.subscribed_keys().is_empty());
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    mod prop {
        use std::collections::BTreeSet;

        use super::*;
        use proptest::prelude::*;
        use proptest::prelude::prop;

        fn key() -> impl Strategy<Value = String> {
            prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string)
        }

        proptest! {
            #[test]
            fn each_listener_hears_exactly_its_keys(
                key_sets in prop::collection::vec(prop::collection::btree_set(key(), 0..4), 1..6),
                notified in prop::collection::vec(key(), 0..20),
            ) {
                let registry = ListenerRegistry::new();
                let mut counters = Vec::new();
                let mut subs = Vec::new();
                for keys in &key_sets {
                    let calls = Arc::new(AtomicUsize::new(0));
                    let counter = Arc::clone(&calls);
                    subs.push(registry.subscribe(keys.iter().cloned(), move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }));
                    counters.push(calls);
                }
                for key in &notified {
                    registry.notify(key);
                }
                for (keys, calls) in key_sets.iter().zip(&counters) {
                    let expected = notified.iter().filter(|k| keys.contains(*k)).count();
                    prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
                }
                let all: BTreeSet<String> = key_sets.iter().flatten().cloned().collect();
                for sub in &subs {
                    prop_assert!(sub.subscribed_keys().iter().all(|k| all.contains(k)));
                }
            }
        }
    }
}
