use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listener<T> {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback<T>,
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Listener {
            id: self.id,
            active: Arc::clone(&self.active),
            callback: Arc::clone(&self.callback),
        }
    }
}

struct Registry<T> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener<T>>>,
}

impl<T> Registry<T> {
    fn listeners(&self) -> MutexGuard<'_, Vec<Listener<T>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Synchronous fan-out of values to subscribed callbacks.
///
/// Callbacks run on the publishing thread, in subscription order, with no
/// lock held, so a callback may read the store, subscribe, or unsubscribe
/// (itself or others) while a publish is in progress.
///
/// Clone-friendly (cloning shares the same subscriber list).
pub struct Notifier<T> {
    registry: Arc<Registry<T>>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Notifier {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Notifier<T> {
    pub fn new() -> Self {
        Notifier {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a callback. It stays registered until the returned
    /// [`Subscription`] is unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
        T: 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.registry.listeners().push(Listener {
            id,
            active: Arc::clone(&active),
            callback: Arc::new(callback),
        });

        let registry = Arc::downgrade(&self.registry);
        Subscription {
            active,
            detach: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.listeners().retain(|listener| listener.id != id);
                }
            })),
        }
    }

    /// Invoke every currently subscribed callback with `value`.
    pub fn publish(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self.registry.listeners().clone();
        for listener in listeners {
            // Unsubscribed by an earlier callback in this same publish.
            if !listener.active.load(Ordering::Acquire) {
                continue;
            }
            (listener.callback)(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.listeners().len()
    }
}

struct Current<T> {
    value: T,
    version: u64,
    delivered: u64,
    flushing: bool,
}

/// A current value whose changes are delivered to a [`Notifier`] in order.
///
/// Writers install values with [`set`](Published::set) or
/// [`update`](Published::update), usually while holding their own lock, and
/// call [`flush`](Published::flush) once that lock is released. Only one
/// thread delivers at a time and it always delivers the newest installed
/// value, so the last value observers see is the current one. Values installed
/// while another thread is delivering are picked up by that thread; values
/// installed by a callback are delivered after it returns.
pub(crate) struct Published<T> {
    current: Mutex<Current<T>>,
    notifier: Notifier<T>,
}

impl<T: Clone> Published<T> {
    pub(crate) fn new(value: T) -> Self {
        Published {
            current: Mutex::new(Current {
                value,
                version: 0,
                delivered: 0,
                flushing: false,
            }),
            notifier: Notifier::new(),
        }
    }

    pub(crate) fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Install `value` without delivering it.
    pub(crate) fn set(&self, value: T) {
        let mut current = self.lock();
        current.value = value;
        current.version += 1;
    }

    /// Install the value returned by `f`, if any. `f` runs under the lock.
    pub(crate) fn update<U>(&self, f: impl FnOnce(&T) -> (Option<T>, U)) -> U {
        let mut current = self.lock();
        let (next, result) = f(&current.value);
        if let Some(next) = next {
            current.value = next;
            current.version += 1;
        }
        result
    }

    /// Deliver the newest value if observers have not seen it yet.
    pub(crate) fn flush(&self) {
        {
            let mut current = self.lock();
            if current.flushing {
                return;
            }
            current.flushing = true;
        }
        let _unwind = FlushUnwind(self);
        loop {
            let value = {
                let mut current = self.lock();
                if current.delivered == current.version {
                    // Cleared under the same lock that saw nothing left.
                    current.flushing = false;
                    return;
                }
                current.delivered = current.version;
                current.value.clone()
            };
            self.notifier.publish(&value);
        }
    }

    pub(crate) fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
        T: 'static,
    {
        self.notifier.subscribe(callback)
    }

    fn lock(&self) -> MutexGuard<'_, Current<T>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lets the next `flush` deliver again after a callback panicked.
struct FlushUnwind<'a, T: Clone>(&'a Published<T>);

impl<T: Clone> Drop for FlushUnwind<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().flushing = false;
        }
    }
}

/// Handle returned by [`Notifier::subscribe`].
///
/// Dropping the handle keeps the callback registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to detach it.
pub struct Subscription {
    active: Arc<AtomicBool>,
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Detach the callback. Safe to call from inside a publish; the callback
    /// is never invoked again afterwards.
    pub fn unsubscribe(mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
