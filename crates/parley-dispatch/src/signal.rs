//! A synchronous broadcast signal.
//!
//! [`Signal`] keeps an ordered list of observer callbacks. [`emit`]
//! invokes every observer with a reference to the value, in
//! registration order, before returning — no queue, no task, no
//! implicit threading. Registration hands back a [`Subscription`]
//! disposer; dropping it (or calling `unsubscribe`) removes the
//! observer.
//!
//! Observers may register or unsubscribe from within a callback; such
//! changes take effect when the current emit finishes. A re-entrant
//! `emit` on the same signal delivers to no one.
//!
//! [`emit`]: Signal::emit

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;

/// Observer callback. Returns `false` to detach itself.
type Callback<T> = Box<dyn FnMut(&T) -> bool + Send>;

struct Entry<T> {
    id: u64,
    callback: Callback<T>,
}

struct SignalInner<T> {
    next_id: u64,
    observers: Vec<Entry<T>>,
    /// Observers registered while an emit is in progress; appended when
    /// the outermost emit finishes.
    pending: Vec<Entry<T>>,
    /// Ids unsubscribed while an emit is in progress.
    removed: Vec<u64>,
    emit_depth: u32,
}

impl<T> Default for SignalInner<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            observers: Vec::new(),
            pending: Vec::new(),
            removed: Vec::new(),
            emit_depth: 0,
        }
    }
}

/// An ordered, synchronous fan-out channel.
pub struct Signal<T> {
    inner: Arc<Mutex<SignalInner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Signal<T> {
    /// Creates a signal with no observers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SignalInner::default())),
        }
    }

    /// Registers an observer. Observers fire in registration order.
    ///
    /// The returned [`Subscription`] removes the observer when dropped.
    pub fn connect<F>(&self, mut f: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.attach(Box::new(move |value| {
            f(value);
            true
        }))
    }

    fn attach(&self, callback: Callback<T>) -> Subscription {
        let id = {
            let mut inner = self.inner.lock().expect("signal lock");
            let id = inner.next_id;
            inner.next_id += 1;
            let entry = Entry { id, callback };
            if inner.emit_depth > 0 {
                inner.pending.push(entry);
            } else {
                inner.observers.push(entry);
            }
            id
        };

        let weak: Weak<Mutex<SignalInner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut inner = inner.lock().expect("signal lock");
                    if inner.emit_depth > 0 {
                        inner.removed.push(id);
                    } else {
                        inner.observers.retain(|e| e.id != id);
                        inner.pending.retain(|e| e.id != id);
                    }
                }
            })),
        }
    }

    /// Invokes every registered observer with `value`, synchronously
    /// and in registration order.
    pub fn emit(&self, value: &T) {
        let mut active = {
            let mut inner = self.inner.lock().expect("signal lock");
            inner.emit_depth += 1;
            std::mem::take(&mut inner.observers)
        };

        active.retain_mut(|entry| {
            let gone = {
                let inner = self.inner.lock().expect("signal lock");
                inner.removed.contains(&entry.id)
            };
            if gone {
                return false;
            }
            (entry.callback)(value)
        });

        let mut inner = self.inner.lock().expect("signal lock");
        inner.emit_depth -= 1;
        // A nested emit may have stored observers back; keep them.
        let restored = std::mem::take(&mut inner.observers);
        active.extend(restored);
        if inner.emit_depth == 0 {
            let removed = std::mem::take(&mut inner.removed);
            active.retain(|e| !removed.contains(&e.id));
            let mut pending = std::mem::take(&mut inner.pending);
            active.append(&mut pending);
        }
        inner.observers = active;
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        let inner = self.inner.lock().expect("signal lock");
        inner.observers.len() + inner.pending.len()
    }
}

impl<T: Clone + Send + 'static> Signal<T> {
    /// Registers an observer that forwards every emitted value into an
    /// unbounded channel and returns the receiving end.
    ///
    /// Dropping the stream detaches the observer.
    pub fn subscribe(&self) -> EventStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription =
            self.attach(Box::new(move |value: &T| tx.send(value.clone()).is_ok()));
        EventStream {
            rx,
            _subscription: subscription,
        }
    }

    /// Like [`subscribe`](Self::subscribe), but only values for which
    /// `filter` returns `true` reach the stream.
    pub fn subscribe_filtered<F>(&self, filter: F) -> EventStream<T>
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.attach(Box::new(move |value: &T| {
            if filter(value) {
                tx.send(value.clone()).is_ok()
            } else {
                true
            }
        }));
        EventStream {
            rx,
            _subscription: subscription,
        }
    }
}

/// Disposer for a registered observer.
///
/// Unsubscribes on drop; [`unsubscribe`](Self::unsubscribe) does the
/// same explicitly.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Removes the observer now.
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Receiving end of [`Signal::subscribe`].
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _subscription: Subscription,
}

impl<T> EventStream<T> {
    /// Waits for the next emitted value.
    ///
    /// Returns `None` once the signal side is gone and the buffer is
    /// drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns the next buffered value without waiting, if any.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Builds a callback that appends `label:value` to a shared log,
    /// for asserting delivery order.
    fn record(
        log: &Arc<Mutex<Vec<String>>>,
        label: &'static str,
    ) -> impl FnMut(&u32) + Send + 'static {
        let log = Arc::clone(log);
        move |value| log.lock().unwrap().push(format!("{label}:{value}"))
    }

    #[test]
    fn test_emit_invokes_observers_in_registration_order() {
        let signal = Signal::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let _a = signal.connect(record(&events, "a"));
        let _b = signal.connect(record(&events, "b"));
        let _c = signal.connect(record(&events, "c"));

        signal.emit(&7);

        assert_eq!(*events.lock().unwrap(), vec!["a:7", "b:7", "c:7"]);
    }

    #[test]
    fn test_emit_with_no_observers_is_a_no_op() {
        let signal: Signal<u32> = Signal::new();
        signal.emit(&1);
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn test_dropping_subscription_removes_observer() {
        let signal = Signal::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let a = signal.connect(record(&events, "a"));
        let _b = signal.connect(record(&events, "b"));
        drop(a);

        signal.emit(&1);

        assert_eq!(*events.lock().unwrap(), vec!["b:1"]);
        assert_eq!(signal.observer_count(), 1);
    }

    #[test]
    fn test_unsubscribe_removes_observer() {
        let signal = Signal::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let a = signal.connect(record(&events, "a"));
        a.unsubscribe();
        signal.emit(&1);

        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_connect_during_emit_takes_effect_next_emit() {
        let signal: Signal<u32> = Signal::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let inner_signal = signal.clone();
        let inner_events = Arc::clone(&events);
        let late: Arc<Mutex<Option<Subscription>>> =
            Arc::new(Mutex::new(None));
        let late_slot = Arc::clone(&late);
        let _a = signal.connect(move |_| {
            let sub = inner_signal.connect(record(&inner_events, "late"));
            *late_slot.lock().unwrap() = Some(sub);
        });

        signal.emit(&1);
        // The observer added while emitting did not see the first emit.
        assert!(events.lock().unwrap().is_empty());

        signal.emit(&2);
        assert_eq!(*events.lock().unwrap(), vec!["late:2"]);
    }

    #[test]
    fn test_unsubscribe_during_emit_takes_effect_within_emit() {
        let signal: Signal<u32> = Signal::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        // The first observer unsubscribes the second before it fires.
        let victim: Arc<Mutex<Option<Subscription>>> =
            Arc::new(Mutex::new(None));
        let victim_slot = Arc::clone(&victim);
        let _a = signal.connect(move |_: &u32| {
            if let Some(sub) = victim_slot.lock().unwrap().take() {
                sub.unsubscribe();
            }
        });
        let b = signal.connect(record(&events, "b"));
        *victim.lock().unwrap() = Some(b);

        signal.emit(&1);

        assert!(
            events.lock().unwrap().is_empty(),
            "observer removed mid-emit must not fire"
        );
        assert_eq!(signal.observer_count(), 1);
    }

    #[test]
    fn test_subscribe_stream_receives_emitted_values() {
        let signal = Signal::new();
        let mut stream = signal.subscribe();

        signal.emit(&1u32);
        signal.emit(&2u32);

        assert_eq!(stream.try_recv(), Some(1));
        assert_eq!(stream.try_recv(), Some(2));
        assert_eq!(stream.try_recv(), None);
    }

    #[test]
    fn test_dropped_stream_detaches_observer() {
        let signal: Signal<u32> = Signal::new();
        let stream = signal.subscribe();
        assert_eq!(signal.observer_count(), 1);

        drop(stream);
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn test_multiple_streams_each_receive_every_value() {
        let signal = Signal::new();
        let mut a = signal.subscribe();
        let mut b = signal.subscribe();

        signal.emit(&5u32);

        // Broadcast, not competing-consumer.
        assert_eq!(a.try_recv(), Some(5));
        assert_eq!(b.try_recv(), Some(5));
    }

    #[test]
    fn test_subscribe_filtered_drops_non_matching_values() {
        let signal = Signal::new();
        let mut evens = signal.subscribe_filtered(|n: &u32| n % 2 == 0);

        signal.emit(&1);
        signal.emit(&2);
        signal.emit(&3);
        signal.emit(&4);

        assert_eq!(evens.try_recv(), Some(2));
        assert_eq!(evens.try_recv(), Some(4));
        assert_eq!(evens.try_recv(), None);
    }
}
