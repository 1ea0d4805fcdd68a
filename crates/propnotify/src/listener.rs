//! Listener capability and registration bookkeeping.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ListenerError;
use crate::event::ChangeEvent;
use crate::value::PropertyValue;

/// An observer of property changes.
///
/// Listeners are invoked synchronously on the thread that fires the event.
/// Returning an error does not stop delivery to other listeners unless the
/// registry is configured with [`FailurePolicy::FailFast`](crate::FailurePolicy::FailFast).
pub trait ChangeListener<S, V = PropertyValue>: Send + Sync {
    /// Handle one change event.
    fn property_change(&self, event: &ChangeEvent<S, V>) -> Result<(), ListenerError>;

    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// A reference-counted listener as stored by the registry.
///
/// Two `SharedListener`s are the same listener only if they point at the same
/// allocation; see [`same_listener`].
pub type SharedListener<S, V = PropertyValue> = Arc<dyn ChangeListener<S, V>>;

/// Whether two handles refer to the same listener allocation.
pub fn same_listener<S, V>(a: &SharedListener<S, V>, b: &SharedListener<S, V>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Wrap a closure as a named listener.
pub fn listener_fn<S, V, F>(name: impl Into<String>, f: F) -> SharedListener<S, V>
where
    S: 'static,
    V: 'static,
    F: Fn(&ChangeEvent<S, V>) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Arc::new(FnListener {
        name: name.into(),
        f,
    })
}

struct FnListener<F> {
    name: String,
    f: F,
}

impl<S, V, F> ChangeListener<S, V> for FnListener<F>
where
    F: Fn(&ChangeEvent<S, V>) -> Result<(), ListenerError> + Send + Sync,
{
    fn property_change(&self, event: &ChangeEvent<S, V>) -> Result<(), ListenerError> {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one registration entry.
///
/// Ids are unique within the process, so an id from one registry never
/// matches an entry in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub(crate) fn next() -> Self {
        Self(NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The numeric value of this id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registration #{}", self.0)
    }
}

/// A listener together with the id of the registration that added it.
pub(crate) struct ListenerEntry<S, V> {
    pub(crate) id: RegistrationId,
    pub(crate) listener: SharedListener<S, V>,
}

impl<S, V> ListenerEntry<S, V> {
    pub(crate) fn new(listener: SharedListener<S, V>) -> Self {
        Self {
            id: RegistrationId::next(),
            listener,
        }
    }
}

// Manual impl: deriving would require `S: Clone, V: Clone`.
impl<S, V> Clone for ListenerEntry<S, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: Arc::clone(&self.listener),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> SharedListener<()> {
        listener_fn(name, |_event: &ChangeEvent<()>| Ok(()))
    }

    #[test]
    fn test_identity_is_allocation() {
        let a = noop("a");
        let a2 = Arc::clone(&a);
        let b = noop("a");

        assert!(same_listener(&a, &a2));
        assert!(!same_listener(&a, &b));
    }

    #[test]
    fn test_fn_listener_name_and_call() {
        let listener: SharedListener<(), PropertyValue> =
            listener_fn("rejecting", |_event: &ChangeEvent<()>| {
                Err(ListenerError::failed("nope"))
            });

        assert_eq!(listener.name(), "rejecting");
        let result = listener.property_change(&ChangeEvent::unnamed((), None, None));
        assert!(matches!(result, Err(ListenerError::Failed(ref m)) if m == "nope"));
    }

    #[test]
    fn test_registration_ids_increase() {
        let first = RegistrationId::next();
        let second = RegistrationId::next();
        assert!(second > first);
        assert_eq!(first.to_string(), format!("registration #{}", first.as_u64()));
    }
}
