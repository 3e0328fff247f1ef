use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

type ObserverFn = Arc<dyn Fn() + Send + Sync>;

/// A shared, observable slot holding one host object.
///
/// `Subject` is this crate's change-notification boundary: every mutation made through
/// [`Subject::update`] synchronously notifies the registered observers, in registration
/// order, after the write lock is released. Observers are notify-only and re-read
/// whatever state they care about through their own handle; passing a borrow of the
/// object into the callbacks would hold the object lock across arbitrary user code and
/// deadlock any observer that writes back into the same subject.
///
/// Host code elsewhere in the application mutates the object through a clone of the same
/// handle, so external mutation is observed identically to binding-driven writes.
pub struct Subject<O>(Arc<Inner<O>>);

struct Inner<O> {
    object: RwLock<O>,
    observers: RwLock<BTreeMap<usize, ObserverFn>>,
    next_id: AtomicUsize,
}

impl<O> Clone for Subject<O> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<O> std::fmt::Debug for Subject<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject").field("observers", &self.0.observers.read().expect("observers lock is poisoned").len()).finish()
    }
}

/// A non-owning handle to a [`Subject`].
pub struct WeakSubject<O>(Weak<Inner<O>>);

impl<O> Clone for WeakSubject<O> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<O> WeakSubject<O> {
    /// Recovers the strong handle if the subject is still alive
    pub fn upgrade(&self) -> Option<Subject<O>> { self.0.upgrade().map(Subject) }
}

/// Deregistration guard returned by [`Subject::observe`].
///
/// Dropping the guard stops delivery to its observer. The guard holds only a weak
/// reference, so it never keeps the subject alive, and dropping it after the subject is
/// gone is a no-op.
pub struct ObserveGuard<O> {
    inner: Weak<Inner<O>>,
    id: usize,
}

impl<O> Drop for ObserveGuard<O> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.observers.write().expect("observers lock is poisoned").remove(&self.id);
        }
    }
}

impl<O> Subject<O> {
    /// Creates a new subject owning `object`
    pub fn new(object: O) -> Self {
        Self(Arc::new(Inner { object: RwLock::new(object), observers: RwLock::new(BTreeMap::new()), next_id: AtomicUsize::new(0) }))
    }

    /// Calls a closure with a borrow of the current object
    pub fn with<R>(&self, f: impl FnOnce(&O) -> R) -> R {
        let object = self.0.object.read().expect("object lock is poisoned");
        f(&object)
    }

    /// Mutates the object, then notifies every observer.
    ///
    /// The observer list is snapshotted before any callback runs and no lock is held
    /// while the callbacks execute, so an observer may register, deregister, or mutate
    /// the subject again from inside its callback.
    pub fn update(&self, f: impl FnOnce(&mut O)) {
        {
            let mut object = self.0.object.write().expect("object lock is poisoned");
            f(&mut object);
        }
        self.notify();
    }

    /// Registers an observer to be notified after each mutation
    pub fn observe(&self, f: impl Fn() + Send + Sync + 'static) -> ObserveGuard<O> {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0.observers.write().expect("observers lock is poisoned").insert(id, Arc::new(f));
        ObserveGuard { inner: Arc::downgrade(&self.0), id }
    }

    /// Non-owning handle for binding against without extending the subject's lifetime
    pub fn downgrade(&self) -> WeakSubject<O> { WeakSubject(Arc::downgrade(&self.0)) }

    fn notify(&self) {
        let observers = {
            let observers = self.0.observers.read().expect("observers lock is poisoned");
            observers.values().cloned().collect::<Vec<_>>()
        };
        for observer in observers {
            observer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn multiple_observers() {
        let subject = Subject::new(0u32);
        let counter = Arc::new(Mutex::new(0));

        let _first = {
            let counter = counter.clone();
            subject.observe(move || *counter.lock().unwrap() += 1)
        };
        let second = {
            let counter = counter.clone();
            subject.observe(move || *counter.lock().unwrap() += 10)
        };

        subject.update(|n| *n = 1);
        assert_eq!(*counter.lock().unwrap(), 11);

        // Drop one guard - only the first observer remains
        drop(second);
        subject.update(|n| *n = 2);
        assert_eq!(*counter.lock().unwrap(), 12);
    }

    #[test]
    fn guard_outliving_subject_is_harmless() {
        let subject = Subject::new(());
        let guard = subject.observe(|| {});
        drop(subject);
        drop(guard);
    }

    #[test]
    fn reentrant_observe_during_notify() {
        let subject = Subject::new(0u32);
        let counter = Arc::new(Mutex::new(0));

        // An observer that registers (and immediately drops) another observer from inside
        // its callback must not deadlock against the snapshot-then-call dispatch.
        let subject_clone = subject.clone();
        let counter_clone = counter.clone();
        let _guard = subject.observe(move || {
            *counter_clone.lock().unwrap() += 1;
            let _temp = subject_clone.observe(|| {});
        });

        subject.update(|n| *n = 1);
        assert_eq!(*counter.lock().unwrap(), 1);
        subject.update(|n| *n = 2);
        assert_eq!(*counter.lock().unwrap(), 2);
    }

    #[test]
    fn reentrant_update_during_notify() {
        let subject = Subject::new(0u32);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let subject_clone = subject.clone();
        let seen_clone = seen.clone();
        let _guard = subject.observe(move || {
            let n = subject_clone.with(|n| *n);
            seen_clone.lock().unwrap().push(n);
            if n == 1 {
                subject_clone.update(|n| *n = 2);
            }
        });

        subject.update(|n| *n = 1);
        assert_eq!(*seen.lock().unwrap(), [1, 2]);
    }
}
