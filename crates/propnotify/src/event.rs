//! Change events delivered to listeners.

use crate::value::PropertyValue;

/// An immutable record describing a change to one attribute of a subject.
///
/// The registry forwards events unchanged; it never inspects the source or
/// compares the old and new values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent<S, V = PropertyValue> {
    source: S,
    property_name: Option<String>,
    old_value: Option<V>,
    new_value: Option<V>,
}

impl<S, V> ChangeEvent<S, V> {
    /// Create a change event.
    ///
    /// An empty property name is stored as `None`; both denote an event that
    /// is not specific to one attribute.
    pub fn new(
        source: S,
        property_name: Option<&str>,
        old_value: Option<V>,
        new_value: Option<V>,
    ) -> Self {
        Self {
            source,
            property_name: property_name
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            old_value,
            new_value,
        }
    }

    /// Create an event that does not name a specific attribute.
    pub fn unnamed(source: S, old_value: Option<V>, new_value: Option<V>) -> Self {
        Self::new(source, None, old_value, new_value)
    }

    /// The subject the change pertains to.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The attribute that changed, if the event names one.
    pub fn property_name(&self) -> Option<&str> {
        self.property_name.as_deref()
    }

    /// The previous value.
    pub fn old_value(&self) -> Option<&V> {
        self.old_value.as_ref()
    }

    /// The new value.
    pub fn new_value(&self) -> Option<&V> {
        self.new_value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_is_unnamed() {
        let event: ChangeEvent<&str> = ChangeEvent::new("bean", Some(""), None, None);
        assert!(event.property_name().is_none());
        assert_eq!(event, ChangeEvent::unnamed("bean", None, None));
    }

    #[test]
    fn test_accessors() {
        let event = ChangeEvent::new(
            1u32,
            Some("color"),
            Some(PropertyValue::from("red")),
            Some(PropertyValue::from("blue")),
        );
        assert_eq!(*event.source(), 1);
        assert_eq!(event.property_name(), Some("color"));
        assert_eq!(event.old_value().and_then(|v| v.as_str()), Some("red"));
        assert_eq!(event.new_value().and_then(|v| v.as_str()), Some("blue"));
    }
}
