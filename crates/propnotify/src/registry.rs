//! Change notification registry.
//!
//! The registry keeps two listener pools: a global pool notified for every
//! event, and per-attribute pools notified only for events naming that
//! attribute. Dispatch delivers to the global pool first, then to the pool of
//! the event's attribute, each in registration order.
//!
//! ## Concurrency
//!
//! ```text
//! add / remove:  write lock → Arc::make_mut(table) → mutate → unlock
//! fire_event:    read lock → clone Arc (snapshot) → unlock → deliver
//! ```
//!
//! A dispatch iterates the table as it was when the event was fired. No lock
//! is held while listeners run, so listeners may register, remove, or fire
//! re-entrantly; those changes apply to later dispatches.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{Environment, RegistryConfig};
use crate::error::{DispatchFailure, Error, ListenerError, ListenerFailure, Pool, Result};
use crate::event::ChangeEvent;
use crate::listener::{same_listener, ListenerEntry, RegistrationId, SharedListener};
use crate::value::PropertyValue;

/// Both listener pools, swapped as a unit.
struct ListenerTable<S, V> {
    /// Listeners notified for every event.
    global: Vec<ListenerEntry<S, V>>,
    /// Listeners keyed by attribute name. Never holds an empty vector.
    by_attribute: HashMap<String, Vec<ListenerEntry<S, V>>>,
}

impl<S, V> ListenerTable<S, V> {
    fn new() -> Self {
        Self {
            global: Vec::new(),
            by_attribute: HashMap::new(),
        }
    }

    fn attribute_total(&self) -> usize {
        self.by_attribute.values().map(Vec::len).sum()
    }
}

impl<S, V> Clone for ListenerTable<S, V> {
    fn clone(&self) -> Self {
        Self {
            global: self.global.clone(),
            by_attribute: self.by_attribute.clone(),
        }
    }
}

/// Registry of property-change listeners for one subject.
///
/// The registry is bound to a subject value that it uses as the event source
/// in [`fire_change`](Self::fire_change). It never inspects the subject; use
/// `S = Weak<T>` or an identifier when the registry must not keep the subject
/// alive.
///
/// Adding the same listener `n` times creates `n` entries, each notified once
/// per matching event. Removal deletes one entry per call.
pub struct ChangeRegistry<S, V = PropertyValue> {
    subject: S,
    config: RegistryConfig,
    table: RwLock<Arc<ListenerTable<S, V>>>,
}

impl<S, V> ChangeRegistry<S, V> {
    /// Create a registry bound to `subject` with default configuration.
    pub fn new(subject: S) -> Self {
        Self::with_config(subject, RegistryConfig::default())
    }

    /// Create a registry bound to `subject` with the given configuration.
    pub fn with_config(subject: S, config: RegistryConfig) -> Self {
        Self {
            subject,
            config,
            table: RwLock::new(Arc::new(ListenerTable::new())),
        }
    }

    /// The subject this registry is bound to.
    pub fn subject(&self) -> &S {
        &self.subject
    }

    /// The registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The environment flags from the configuration.
    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// Add a listener notified for every event.
    ///
    /// Returns the id of the new registration. Passing `None` fails with
    /// [`Error::InvalidListener`].
    pub fn add_listener(
        &self,
        listener: impl Into<Option<SharedListener<S, V>>>,
    ) -> Result<RegistrationId> {
        let listener = listener.into().ok_or(Error::InvalidListener)?;
        let entry = ListenerEntry::new(listener);
        let id = entry.id;

        tracing::debug!(
            registration = id.as_u64(),
            listener = entry.listener.name(),
            "global listener added"
        );

        let mut table = self.table.write();
        Arc::make_mut(&mut *table).global.push(entry);

        Ok(id)
    }

    /// Add a listener notified only for events naming `attribute`.
    ///
    /// This is cumulative with the global pool: a listener registered both
    /// globally and on `attribute` is notified twice for a matching event.
    pub fn add_attribute_listener(
        &self,
        attribute: impl Into<String>,
        listener: impl Into<Option<SharedListener<S, V>>>,
    ) -> Result<RegistrationId> {
        let listener = listener.into().ok_or(Error::InvalidListener)?;
        let attribute = attribute.into();
        if attribute.is_empty() {
            return Err(Error::InvalidAttribute(attribute));
        }

        let entry = ListenerEntry::new(listener);
        let id = entry.id;

        tracing::debug!(
            registration = id.as_u64(),
            listener = entry.listener.name(),
            attribute = %attribute,
            "attribute listener added"
        );

        let mut table = self.table.write();
        Arc::make_mut(&mut *table)
            .by_attribute
            .entry(attribute)
            .or_default()
            .push(entry);

        Ok(id)
    }

    /// Remove the first global registration of `listener`.
    ///
    /// Attribute registrations are not touched. Returns `false` if the
    /// listener is not in the global pool.
    pub fn remove_listener(&self, listener: &SharedListener<S, V>) -> bool {
        let removed = {
            let mut table = self.table.write();
            let index = table
                .global
                .iter()
                .position(|entry| same_listener(&entry.listener, listener));
            index.map(|index| Arc::make_mut(&mut *table).global.remove(index))
        };

        match removed {
            Some(entry) => {
                tracing::debug!(
                    registration = entry.id.as_u64(),
                    listener = entry.listener.name(),
                    "global listener removed"
                );
                true
            }
            None => false,
        }
    }

    /// Remove the first registration of `listener` on `attribute`.
    ///
    /// The attribute is dropped from the registry once its last listener is
    /// removed. Returns `false` if nothing matched.
    pub fn remove_attribute_listener(
        &self,
        attribute: &str,
        listener: &SharedListener<S, V>,
    ) -> bool {
        let removed = {
            let mut table = self.table.write();
            let index = table.by_attribute.get(attribute).and_then(|entries| {
                entries
                    .iter()
                    .position(|entry| same_listener(&entry.listener, listener))
            });

            match index {
                Some(index) => {
                    let table = Arc::make_mut(&mut *table);
                    remove_from_attribute(&mut table.by_attribute, attribute, index)
                }
                None => None,
            }
        };

        match removed {
            Some(entry) => {
                tracing::debug!(
                    registration = entry.id.as_u64(),
                    listener = entry.listener.name(),
                    attribute,
                    "attribute listener removed"
                );
                true
            }
            None => false,
        }
    }

    /// Remove the registration with the given id from whichever pool holds it.
    pub fn remove_registration(&self, id: RegistrationId) -> bool {
        let removed = {
            let mut table = self.table.write();
            let global_index = table.global.iter().position(|entry| entry.id == id);
            let attribute_index = table.by_attribute.iter().find_map(|(attribute, entries)| {
                entries
                    .iter()
                    .position(|entry| entry.id == id)
                    .map(|index| (attribute.clone(), index))
            });

            match (global_index, attribute_index) {
                (Some(index), _) => {
                    let entry = Arc::make_mut(&mut *table).global.remove(index);
                    Some((entry, Pool::Global))
                }
                (None, Some((attribute, index))) => {
                    let table = Arc::make_mut(&mut *table);
                    remove_from_attribute(&mut table.by_attribute, &attribute, index)
                        .map(|entry| (entry, Pool::Attribute(attribute)))
                }
                (None, None) => None,
            }
        };

        match removed {
            Some((entry, pool)) => {
                tracing::debug!(
                    registration = id.as_u64(),
                    listener = entry.listener.name(),
                    pool = %pool,
                    "registration removed"
                );
                true
            }
            None => false,
        }
    }

    /// Remove every registration from both pools.
    pub fn clear(&self) {
        let previous =
            std::mem::replace(&mut *self.table.write(), Arc::new(ListenerTable::new()));
        tracing::debug!(
            global = previous.global.len(),
            attribute = previous.attribute_total(),
            "registry cleared"
        );
    }

    /// Deliver `event` to the global pool, then to the pool of its attribute.
    ///
    /// Listeners run synchronously on the calling thread against a snapshot
    /// of the pools taken on entry. Failures are handled according to the
    /// configured [`FailurePolicy`](crate::FailurePolicy) and reported as
    /// [`Error::ListenerFailure`].
    pub fn fire_event(&self, event: &ChangeEvent<S, V>) -> Result<()> {
        let snapshot = self.snapshot();
        let property = event.property_name();

        let global = snapshot.global.iter().map(|entry| (entry, None));
        let scoped = property
            .and_then(|name| snapshot.by_attribute.get(name).map(|entries| (name, entries)))
            .into_iter()
            .flat_map(|(name, entries)| entries.iter().map(move |entry| (entry, Some(name))));

        let mut attempted = 0usize;
        let mut failures = Vec::new();

        for (entry, attribute) in global.chain(scoped) {
            attempted += 1;

            let Err(error) = self.invoke(entry, event) else {
                continue;
            };

            let pool = match attribute {
                Some(name) => Pool::Attribute(name.to_string()),
                None => Pool::Global,
            };

            tracing::warn!(
                registration = entry.id.as_u64(),
                listener = entry.listener.name(),
                pool = %pool,
                error = %error,
                "listener failed"
            );

            failures.push(ListenerFailure {
                registration: entry.id,
                listener_name: entry.listener.name().to_string(),
                pool,
                error,
            });

            if !self.config.aggregates_failures() {
                break;
            }
        }

        tracing::trace!(
            property = property.unwrap_or("<unnamed>"),
            attempted,
            failed = failures.len(),
            "change event dispatched"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::ListenerFailure(DispatchFailure {
                property_name: property.map(str::to_string),
                attempted,
                failures,
            }))
        }
    }

    /// Fire a change of `property_name` with an explicit event source.
    pub fn fire_change_from(
        &self,
        source: S,
        property_name: &str,
        old_value: Option<V>,
        new_value: Option<V>,
    ) -> Result<()> {
        if !self.has_listeners(property_name) {
            return Ok(());
        }

        let event = ChangeEvent::new(source, Some(property_name), old_value, new_value);
        self.fire_event(&event)
    }

    /// Check whether an event for `attribute` would reach any listener.
    ///
    /// True if the global pool is non-empty or `attribute` has listeners.
    pub fn has_listeners(&self, attribute: &str) -> bool {
        let table = self.table.read();
        !table.global.is_empty() || table.by_attribute.contains_key(attribute)
    }

    /// Snapshot of the global pool, in registration order.
    pub fn listeners(&self) -> Vec<SharedListener<S, V>> {
        let snapshot = self.snapshot();
        snapshot
            .global
            .iter()
            .map(|entry| Arc::clone(&entry.listener))
            .collect()
    }

    /// Snapshot of the pool for `attribute`, in registration order.
    pub fn attribute_listeners(&self, attribute: &str) -> Vec<SharedListener<S, V>> {
        let snapshot = self.snapshot();
        snapshot
            .by_attribute
            .get(attribute)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| Arc::clone(&entry.listener))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Attributes that currently have at least one listener, sorted.
    pub fn attribute_names(&self) -> Vec<String> {
        let snapshot = self.snapshot();
        let mut names: Vec<String> = snapshot.by_attribute.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of global registrations.
    pub fn listener_count(&self) -> usize {
        self.table.read().global.len()
    }

    /// Number of registrations on `attribute`.
    pub fn attribute_listener_count(&self, attribute: &str) -> usize {
        self.table
            .read()
            .by_attribute
            .get(attribute)
            .map_or(0, Vec::len)
    }

    /// Number of registrations across both pools.
    pub fn total_listener_count(&self) -> usize {
        let table = self.table.read();
        table.global.len() + table.attribute_total()
    }

    fn snapshot(&self) -> Arc<ListenerTable<S, V>> {
        Arc::clone(&self.table.read())
    }

    fn invoke(
        &self,
        entry: &ListenerEntry<S, V>,
        event: &ChangeEvent<S, V>,
    ) -> std::result::Result<(), ListenerError> {
        if self.config.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| entry.listener.property_change(event)))
                .unwrap_or_else(|payload| Err(ListenerError::from_panic(payload)))
        } else {
            entry.listener.property_change(event)
        }
    }
}

impl<S: Clone, V> ChangeRegistry<S, V> {
    /// Fire a change of `property_name` with the bound subject as source.
    pub fn fire_change(
        &self,
        property_name: &str,
        old_value: Option<V>,
        new_value: Option<V>,
    ) -> Result<()> {
        self.fire_change_from(self.subject.clone(), property_name, old_value, new_value)
    }

    /// Fire a change where both values are present.
    ///
    /// Accepts anything convertible into `V`, e.g. `bool`, `i64` or `&str`
    /// for [`PropertyValue`].
    pub fn fire_value_change(
        &self,
        property_name: &str,
        old_value: impl Into<V>,
        new_value: impl Into<V>,
    ) -> Result<()> {
        self.fire_change(property_name, Some(old_value.into()), Some(new_value.into()))
    }
}

impl<S: fmt::Debug, V> fmt::Debug for ChangeRegistry<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.snapshot();
        f.debug_struct("ChangeRegistry")
            .field("subject", &self.subject)
            .field("config", &self.config)
            .field("global_listeners", &table.global.len())
            .field("attribute_listeners", &table.attribute_total())
            .finish()
    }
}

/// Shared change registry handle.
pub type SharedChangeRegistry<S, V = PropertyValue> = Arc<ChangeRegistry<S, V>>;

/// Remove one entry from an attribute pool, dropping the pool once empty.
fn remove_from_attribute<S, V>(
    by_attribute: &mut HashMap<String, Vec<ListenerEntry<S, V>>>,
    attribute: &str,
    index: usize,
) -> Option<ListenerEntry<S, V>> {
    let entries = by_attribute.get_mut(attribute)?;
    let entry = entries.remove(index);
    if entries.is_empty() {
        by_attribute.remove(attribute);
    }
    Some(entry)
}
