//! Registry error types.

use std::fmt;

use thiserror::Error;

use crate::listener::RegistrationId;

/// Result alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Registry errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Registration attempted without a listener.
    #[error("invalid listener: no listener supplied")]
    InvalidListener,

    /// Attribute registration attempted with an empty attribute name.
    #[error("invalid attribute name: {0:?}")]
    InvalidAttribute(String),

    /// One or more listeners failed while an event was being delivered.
    #[error("{0}")]
    ListenerFailure(DispatchFailure),
}

/// Error raised by a listener while handling a change event.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listener rejected or failed to process the event.
    #[error("{0}")]
    Failed(String),

    /// The listener panicked; the payload message is preserved when it is a string.
    #[error("listener panicked: {0}")]
    Panicked(String),

    /// Any other error returned by the listener.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ListenerError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// The listener pool a registration belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pool {
    /// Notified for every event.
    Global,
    /// Notified only for events naming this attribute.
    Attribute(String),
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pool::Global => write!(f, "global"),
            Pool::Attribute(name) => write!(f, "attribute {name:?}"),
        }
    }
}

/// A single listener failure observed during dispatch.
#[derive(Debug)]
pub struct ListenerFailure {
    /// Registration that failed.
    pub registration: RegistrationId,
    /// Name reported by the listener.
    pub listener_name: String,
    /// Pool the registration belongs to.
    pub pool: Pool,
    /// The error raised by the listener.
    pub error: ListenerError,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listener '{}' ({}, {}) failed: {}",
            self.listener_name, self.registration, self.pool, self.error
        )
    }
}

/// Failures collected from one call to `fire_event`.
#[derive(Debug)]
pub struct DispatchFailure {
    /// Property named by the event, if any.
    pub property_name: Option<String>,
    /// Number of listener invocations attempted.
    pub attempted: usize,
    /// Failures in delivery order. Never empty.
    pub failures: Vec<ListenerFailure>,
}

impl DispatchFailure {
    /// Registration ids of every failing entry, in delivery order.
    pub fn failed_registrations(&self) -> Vec<RegistrationId> {
        self.failures.iter().map(|f| f.registration).collect()
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let property = self.property_name.as_deref().unwrap_or("<unnamed>");
        write!(
            f,
            "{} of {} listener(s) failed for property {}",
            self.failures.len(),
            self.attempted,
            property
        )?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_messages() {
        let err = ListenerError::from_panic(Box::new("boom"));
        assert!(matches!(err, ListenerError::Panicked(ref m) if m == "boom"));

        let err = ListenerError::from_panic(Box::new(String::from("owned boom")));
        assert!(matches!(err, ListenerError::Panicked(ref m) if m == "owned boom"));

        let err = ListenerError::from_panic(Box::new(42u32));
        assert!(matches!(err, ListenerError::Panicked(ref m) if m == "non-string panic payload"));
    }

    #[test]
    fn test_dispatch_failure_display() {
        let failure = DispatchFailure {
            property_name: Some("color".to_string()),
            attempted: 3,
            failures: vec![ListenerFailure {
                registration: RegistrationId::from_raw(7),
                listener_name: "painter".to_string(),
                pool: Pool::Attribute("color".to_string()),
                error: ListenerError::failed("out of paint"),
            }],
        };

        let text = Error::ListenerFailure(failure).to_string();
        assert!(text.starts_with("1 of 3 listener(s) failed for property color"));
        assert!(text.contains("listener 'painter' (registration #7, attribute \"color\") failed: out of paint"));
    }
}
