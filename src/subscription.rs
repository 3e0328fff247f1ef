use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Assigned monotonically, so ordered-map iteration over ids is registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SubscriptionId(usize);

/// Subscriber callback invoked with a borrow of each new value
pub type SubscriberFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Trait for types that can be registered as binding subscribers via
/// [`Binding::next`](crate::Binding::next): closures, and channel senders for handing
/// values off to another task.
pub trait IntoSubscriber<T> {
    fn into_subscriber(self) -> SubscriberFn<T>;
}

impl<F, T> IntoSubscriber<T> for F
where F: Fn(&T) + Send + Sync + 'static
{
    fn into_subscriber(self) -> SubscriberFn<T> { Arc::new(self) }
}

impl<T: Clone + Send + 'static> IntoSubscriber<T> for std::sync::mpsc::Sender<T> {
    fn into_subscriber(self) -> SubscriberFn<T> {
        Arc::new(move |value| {
            let _ = self.send(value.clone()); // Ignore send errors
        })
    }
}

#[cfg(feature = "tokio")]
impl<T: Clone + Send + 'static> IntoSubscriber<T> for tokio::sync::mpsc::UnboundedSender<T> {
    fn into_subscriber(self) -> SubscriberFn<T> {
        Arc::new(move |value| {
            let _ = self.send(value.clone()); // Ignore send errors
        })
    }
}

/// Ordered registry of a binding's subscribers.
#[derive(Default)]
pub(crate) struct SubscriberSet<T> {
    subscribers: RwLock<BTreeMap<SubscriptionId, SubscriberFn<T>>>,
    next_id: AtomicUsize,
}

impl<T> SubscriberSet<T> {
    pub fn new() -> Self { Self { subscribers: RwLock::new(BTreeMap::new()), next_id: AtomicUsize::new(0) } }

    pub fn subscribe<S: IntoSubscriber<T>>(&self, subscriber: S) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().expect("subscribers lock is poisoned").insert(id, subscriber.into_subscriber());
    }

    /// Invokes every subscriber with `value`, in registration order.
    ///
    /// The set is snapshotted first and no lock is held during the callbacks, so a
    /// subscriber may register further subscribers or tear the binding down.
    pub fn notify(&self, value: &T) {
        let snapshot = {
            let subscribers = self.subscribers.read().expect("subscribers lock is poisoned");
            subscribers.values().cloned().collect::<Vec<_>>()
        };
        for subscriber in snapshot {
            subscriber(value);
        }
    }

    pub fn clear(&self) { self.subscribers.write().expect("subscribers lock is poisoned").clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn notifies_in_registration_order() {
        let set = SubscriberSet::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            set.subscribe(move |value: &u32| order.lock().unwrap().push(format!("{label}:{value}")));
        }

        set.notify(&7);
        assert_eq!(*order.lock().unwrap(), ["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn cleared_set_notifies_nobody() {
        let set = SubscriberSet::new();
        let counter = Arc::new(Mutex::new(0));
        let counter_clone = counter.clone();
        set.subscribe(move |_: &u32| *counter_clone.lock().unwrap() += 1);

        set.clear();
        set.notify(&1);
        assert_eq!(*counter.lock().unwrap(), 0);
    }
}
