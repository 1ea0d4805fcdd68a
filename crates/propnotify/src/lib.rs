//! Property-change notification registry.
//!
//! A [`ChangeRegistry`] lets observers subscribe to changes of a subject's
//! attributes, either to every change (the global pool) or to one named
//! attribute, and delivers each [`ChangeEvent`] to the matching listeners in
//! a fixed order: global listeners first, then the attribute's listeners,
//! each in registration order.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use propnotify::{listener_fn, ChangeEvent, ChangeRegistry, SharedListener};
//!
//! let registry = ChangeRegistry::new("widget".to_string());
//!
//! let painter: SharedListener<String> = listener_fn("painter", |event: &ChangeEvent<String>| {
//!     assert_eq!(event.source(), "widget");
//!     assert_eq!(event.property_name(), Some("color"));
//!     Ok(())
//! });
//! registry.add_attribute_listener("color", Arc::clone(&painter))?;
//!
//! registry.fire_value_change("color", "red", "blue")?;
//! assert!(registry.remove_attribute_listener("color", &painter));
//! assert!(!registry.has_listeners("color"));
//! # Ok::<(), propnotify::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod listener;
pub mod registry;
pub mod value;

pub use config::{Environment, FailurePolicy, RegistryConfig};
pub use error::{DispatchFailure, Error, ListenerError, ListenerFailure, Pool, Result};
pub use event::ChangeEvent;
pub use listener::{listener_fn, same_listener, ChangeListener, RegistrationId, SharedListener};
pub use registry::{ChangeRegistry, SharedChangeRegistry};
pub use value::PropertyValue;
