//! Callback registry - typed multi-subscriber event dispatch
//!
//! Every loader and the staged selection expose their events through a
//! `CallbackRegistry`. Subscribers are called synchronously, in registration
//! order, with the same payload. Dispatch happens outside the registry lock,
//! so a callback may subscribe, unsubscribe or call back into the handler.
//!
//! A panicking callback interrupts dispatch to the subscribers after it.

use crate::lock;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

/// Opaque tag pairing the start event of an async operation with its outcome.
pub type Correlation = String;

/// Correlation used by the loads a handler fires while initializing.
pub const INIT_CORRELATION: &str = "__INIT__";

/// Generate a fresh correlation.
#[must_use]
pub fn new_correlation() -> Correlation {
    Uuid::new_v4().to_string()
}

/// Payload delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPayload<T> {
    /// Correlation of the operation that fired the event
    pub correlation: Option<Correlation>,
    /// Event data
    pub payload: T,
}

impl<T> CallbackPayload<T> {
    /// Same correlation, payload converted by `f`.
    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> CallbackPayload<U> {
        CallbackPayload {
            correlation: self.correlation.clone(),
            payload: f(&self.payload),
        }
    }
}

type Callback<T> = Arc<dyn Fn(&CallbackPayload<T>) + Send + Sync>;

struct Subscribers<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Registry of subscribers for one event.
pub struct CallbackRegistry<T> {
    inner: Arc<Mutex<Subscribers<T>>>,
}

impl<T> fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("subscribers", &lock(&self.inner).entries.len())
            .finish()
    }
}

impl<T: 'static> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> CallbackRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Subscribers {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a callback. The returned handle removes exactly this callback.
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<T>) + Send + Sync + 'static,
    {
        let id = {
            let mut subscribers = lock(&self.inner);
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.entries.push((id, Arc::new(callback)));
            id
        };

        let registry: Weak<Mutex<Subscribers<T>>> = Arc::downgrade(&self.inner);
        Unsubscribe {
            remove: Arc::new(move || {
                if let Some(registry) = registry.upgrade() {
                    lock(&registry).entries.retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    /// Invoke every current subscriber with the payload.
    pub fn trigger_all(&self, correlation: Option<Correlation>, payload: T) {
        let snapshot: Vec<Callback<T>> = lock(&self.inner)
            .entries
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        let payload = CallbackPayload {
            correlation,
            payload,
        };
        for callback in snapshot {
            callback(&payload);
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).entries.len()
    }
}

/// Handle removing one subscription. Calling it more than once is a no-op.
#[derive(Clone)]
pub struct Unsubscribe {
    remove: Arc<dyn Fn() + Send + Sync>,
}

impl Unsubscribe {
    /// Remove the subscription.
    pub fn unsubscribe(&self) {
        (self.remove)();
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, CallbackRegistry<u32>) {
        (Arc::new(Mutex::new(Vec::new())), CallbackRegistry::new())
    }

    #[test]
    fn test_trigger_in_registration_order() {
        let (log, registry) = recorder();
        for name in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            registry.subscribe(move |p| log.lock().unwrap().push(format!("{}{}", name, p.payload)));
        }

        registry.trigger_all(None, 7);
        assert_eq!(*log.lock().unwrap(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_targeted() {
        let (log, registry) = recorder();
        let first = {
            let log = Arc::clone(&log);
            registry.subscribe(move |_| log.lock().unwrap().push("first".into()))
        };
        {
            let log = Arc::clone(&log);
            registry.subscribe(move |_| log.lock().unwrap().push("second".into()));
        }

        first.unsubscribe();
        first.unsubscribe();
        assert_eq!(registry.subscriber_count(), 1);

        registry.trigger_all(None, 0);
        assert_eq!(*log.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_correlation_is_delivered() {
        let registry = CallbackRegistry::<()>::new();
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            registry.subscribe(move |p| *seen.lock().unwrap() = p.correlation.clone());
        }

        registry.trigger_all(Some("corr-1".into()), ());
        assert_eq!(seen.lock().unwrap().as_deref(), Some("corr-1"));
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let registry = Arc::new(CallbackRegistry::<()>::new());
        let handle: Arc<Mutex<Option<Unsubscribe>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));
        {
            let handle_ref = Arc::clone(&handle);
            let calls = Arc::clone(&calls);
            let unsub = registry.subscribe(move |_| {
                *calls.lock().unwrap() += 1;
                if let Some(h) = handle_ref.lock().unwrap().as_ref() {
                    h.unsubscribe();
                }
            });
            *handle.lock().unwrap() = Some(unsub);
        }

        registry.trigger_all(None, ());
        registry.trigger_all(None, ());
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = CallbackRegistry::<()>::new();
        let unsub = registry.subscribe(|_| {});
        drop(registry);
        unsub.unsubscribe();
    }

    #[test]
    fn test_new_correlation_is_unique() {
        assert_ne!(new_correlation(), new_correlation());
    }
}
