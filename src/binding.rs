use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use crate::accessor::Accessor;
use crate::error::{BindError, PropagationError};
use crate::subject::{Subject, WeakSubject};
use crate::subscription::{IntoSubscriber, SubscriberSet};

/// Write-back into a binding's own subject, with the subject and accessor erased
type WriteBack<T> = Arc<dyn Fn(T) -> Result<(), PropagationError> + Send + Sync>;

/// One observation point over a subject and an accessor.
///
/// A binding observes its accessor's value on its subject, dispatches each new value to
/// the subscribers registered via [`Binding::next`] in registration order, and pushes it
/// into every binding it was linked to via [`Binding::relate`]. The handle is a cheap
/// clone over shared state; the binding never keeps its subject alive.
///
/// ```
/// use tether::{Accessor, Binding, Subject};
///
/// struct Counter { count: u32 }
///
/// let counter = Subject::new(Counter { count: 0 });
/// let binding = Binding::bind(&counter, Accessor::key_path("count", |c: &Counter| c.count, |c, v| c.count = v));
/// binding.next(|count: &u32| println!("count is now {count}"));
/// counter.update(|c| c.count += 1);
/// ```
pub struct Binding<T>(Arc<Inner<T>>);

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding").field("accessor", &self.0.accessor_name).field("active", &self.0.active.load(Ordering::Acquire)).finish()
    }
}

struct Inner<T> {
    subscribers: SubscriberSet<T>,
    /// Bindings this one pushes new values into. Weak, so a link never extends the
    /// destination's lifetime; dead links are skipped at dispatch.
    links: Mutex<Vec<Weak<Inner<T>>>>,
    /// Last value seen through the accessor. Subject notifications are per-object, so
    /// this is what narrows them down to per-accessor changes.
    last: Mutex<Option<T>>,
    /// Set while this binding's dispatch for one change is in flight. A notification
    /// that re-enters the same binding during that window is an echo of its own
    /// propagation and is suppressed, which bounds self-links and mutual links.
    dispatching: AtomicBool,
    active: AtomicBool,
    accessor_name: &'static str,
    /// None for selector (read-only) accessors
    write: Option<WriteBack<T>>,
    /// Held so the subject observation is deregistered exactly once, at completion or
    /// when the last handle drops. Type-erased over the subject's object type.
    observation: Mutex<Option<Box<dyn std::any::Any + Send + Sync>>>,
}

impl<T> Binding<T>
where T: Clone + PartialEq + Send + Sync + 'static
{
    /// Creates a binding observing `accessor` on `subject`.
    ///
    /// The subject handle proves the target is alive and the typed accessor proves it
    /// resolves, so unlike [`Binding::bind_weak`] this cannot fail.
    pub fn bind<O: Send + Sync + 'static>(subject: &Subject<O>, accessor: Accessor<O, T>) -> Self {
        let weak = subject.downgrade();
        let get = accessor.getter();
        let initial = subject.with(|object| get(object));

        let write = accessor.setter().map(|set| {
            let weak = weak.clone();
            Arc::new(move |value: T| match weak.upgrade() {
                Some(subject) => {
                    subject.update(|object| set(object, value));
                    Ok(())
                }
                None => Err(PropagationError::TargetGone),
            }) as WriteBack<T>
        });

        let inner = Arc::new(Inner {
            subscribers: SubscriberSet::new(),
            links: Mutex::new(Vec::new()),
            last: Mutex::new(Some(initial)),
            dispatching: AtomicBool::new(false),
            active: AtomicBool::new(true),
            accessor_name: accessor.name(),
            write,
            observation: Mutex::new(None),
        });

        let observation = subject.observe({
            let inner = Arc::downgrade(&inner);
            move || {
                let (Some(inner), Some(subject)) = (inner.upgrade(), weak.upgrade()) else { return };
                let value = subject.with(|object| get(object));
                inner.handle_change(value);
            }
        });
        *inner.observation.lock().expect("observation lock is poisoned") = Some(Box::new(observation));

        Self(inner)
    }

    /// Creates a binding from a non-owning subject handle.
    ///
    /// Fails with [`BindError::TargetGone`] when the target has already been dropped;
    /// no partially-constructed binding is returned.
    pub fn bind_weak<O: Send + Sync + 'static>(subject: &WeakSubject<O>, accessor: Accessor<O, T>) -> Result<Self, BindError> {
        match subject.upgrade() {
            Some(subject) => Ok(Self::bind(&subject, accessor)),
            None => Err(BindError::TargetGone),
        }
    }

    /// Registers `subscriber` to receive each new value, and returns the binding so
    /// registrations can be chained.
    ///
    /// Subscribers fire once per observed change, with the new value, in registration
    /// order. On a completed binding this is a no-op and the subscriber will never fire.
    pub fn next<S: IntoSubscriber<T>>(&self, subscriber: S) -> &Self {
        if !self.is_active() {
            debug!(accessor = self.0.accessor_name, "subscriber on completed binding ignored");
            return self;
        }
        self.0.subscribers.subscribe(subscriber);
        self
    }

    /// Links the receiver as a propagation source feeding `other`, and returns the
    /// receiver so further relations can be chained.
    ///
    /// The relation is one-directional: whenever the receiver observes a new value, that
    /// value is written onto `other`'s subject through `other`'s accessor. `other`'s own
    /// observation then fires its subscribers exactly once. For a two-way connection,
    /// relate each binding to the other; the echo suppression on both sides keeps the
    /// exchange bounded.
    ///
    /// A link whose write-back fails is reported through `tracing::warn!` and skipped;
    /// remaining links and subscribers still receive the value. On a completed binding
    /// this is a no-op.
    pub fn relate(&self, other: &Binding<T>) -> &Self {
        if !self.is_active() {
            debug!(accessor = self.0.accessor_name, "relation on completed binding ignored");
            return self;
        }
        self.0.links.lock().expect("links lock is poisoned").push(Arc::downgrade(&other.0));
        self
    }

    /// Signals the binding to stop sending updates.
    ///
    /// Deregisters from the subject, clears all subscribers and links, and deactivates.
    /// Idempotent, and safe to call from inside a subscriber: dispatch runs off a
    /// snapshot, so the in-flight change finishes delivery and nothing fires after it.
    pub fn complete(&self) { self.0.complete() }

    /// Whether the binding is still delivering notifications
    pub fn is_active(&self) -> bool { self.0.active.load(Ordering::Acquire) }

    /// The most recently observed value, or `None` once completed
    pub fn value(&self) -> Option<T> { self.0.last.lock().expect("last value lock is poisoned").clone() }
}

impl<T> Inner<T>
where T: Clone + PartialEq + Send + Sync + 'static
{
    fn handle_change(&self, value: T) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        if self.dispatching.swap(true, Ordering::AcqRel) {
            debug!(accessor = self.accessor_name, "suppressed re-entrant notification");
            return;
        }

        let changed = {
            let mut last = self.last.lock().expect("last value lock is poisoned");
            if last.as_ref() == Some(&value) {
                false
            } else {
                *last = Some(value.clone());
                true
            }
        };
        if changed {
            self.subscribers.notify(&value);
            self.relay(&value);
        }

        self.dispatching.store(false, Ordering::Release);
    }

    /// Pushes `value` into every live link, isolating per-link failures
    fn relay(&self, value: &T) {
        let links = {
            let links = self.links.lock().expect("links lock is poisoned");
            links.iter().filter_map(Weak::upgrade).collect::<Vec<_>>()
        };
        for link in links {
            if let Err(error) = link.apply(value.clone()) {
                warn!(from = self.accessor_name, to = link.accessor_name, %error, "relay propagation failed");
            }
        }
    }

    /// Applies a relayed value to this binding's own subject through its accessor
    fn apply(&self, value: T) -> Result<(), PropagationError> {
        if !self.active.load(Ordering::Acquire) {
            debug!(accessor = self.accessor_name, "relay into completed binding ignored");
            return Ok(());
        }
        let Some(write) = &self.write else {
            return Err(PropagationError::ReadOnly(self.accessor_name));
        };
        // A push of the value this binding already observes is an echo (typically the
        // back half of a mutual link); writing it again would only re-notify the subject.
        if self.last.lock().expect("last value lock is poisoned").as_ref() == Some(&value) {
            return Ok(());
        }
        match write(value) {
            Err(PropagationError::TargetGone) => {
                // The subject is gone; operating on this binding again would only fail
                // the same way, so it transitions itself to completed.
                self.complete();
                Err(PropagationError::TargetGone)
            }
            result => result,
        }
    }

    fn complete(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        debug!(accessor = self.accessor_name, "binding completed");
        // Deregister from the subject first so no further notifications arrive
        *self.observation.lock().expect("observation lock is poisoned") = None;
        self.subscribers.clear();
        self.links.lock().expect("links lock is poisoned").clear();
        *self.last.lock().expect("last value lock is poisoned") = None;
    }
}
