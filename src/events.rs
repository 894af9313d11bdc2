use crate::common::LockExt;
use std::sync::{Arc, Mutex};

/// Subscription token returned by [EventRegistry::subscribe]
///
/// Passing it back to [EventRegistry::unsubscribe] removes the callback.
/// Tokens are consumed on unsubscription, double removal is unrepresentable.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscription(usize);

type Callback<E> = Arc<Mutex<dyn FnMut(&E) + Send>>;

struct RegistryInner<E> {
    next_id: usize,
    callbacks: Vec<(usize, Callback<E>)>,
}

/// Typed event registry
///
/// Listener cleanup is explicit: every subscriber keeps its token and
/// unsubscribes on teardown. Emission runs on a snapshot of the callback
/// list so handlers are free to call back into the emitting object or to
/// (un)subscribe while an event is being delivered.
pub struct EventRegistry<E> {
    inner: Arc<Mutex<RegistryInner<E>>>,
}

impl<E> Clone for EventRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventRegistry<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, callback: impl FnMut(&E) + Send + 'static) -> Subscription {
        self.inner.with_mut(|inner| {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.callbacks.push((id, Arc::new(Mutex::new(callback))));
            Subscription(id)
        })
    }

    /// Remove a previously registered callback, returns `false` when the
    /// registry no longer holds it
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.inner.with_mut(|inner| {
            let before = inner.callbacks.len();
            inner.callbacks.retain(|(id, _)| *id != subscription.0);
            inner.callbacks.len() != before
        })
    }

    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .inner
            .with(|inner| inner.callbacks.iter().map(|(_, cb)| cb.clone()).collect());
        for callback in snapshot {
            callback.with_mut(|callback| callback(event));
        }
    }

    pub fn len(&self) -> usize {
        self.inner.with(|inner| inner.callbacks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let registry: EventRegistry<u32> = EventRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscription = registry.subscribe({
            let seen = seen.clone();
            move |event| seen.with_mut(|seen| seen.push(*event))
        });

        registry.emit(&1);
        registry.emit(&2);
        assert!(registry.unsubscribe(subscription));
        registry.emit(&3);

        assert_eq!(seen.with(|seen| seen.clone()), vec![1, 2]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reentrant_subscribe_during_emit() {
        let registry: EventRegistry<u32> = EventRegistry::new();
        let registry_inner = registry.clone();
        let fired = Arc::new(Mutex::new(0usize));
        let fired_inner = fired.clone();
        let _outer = registry.subscribe(move |_| {
            let fired = fired_inner.clone();
            // must not deadlock even though the registry is mid-emit
            let sub = registry_inner.subscribe(move |_| fired.with_mut(|n| *n += 1));
            registry_inner.unsubscribe(sub);
        });
        registry.emit(&0);
        assert_eq!(fired.with(|n| *n), 0);
        assert_eq!(registry.len(), 1);
    }
}
