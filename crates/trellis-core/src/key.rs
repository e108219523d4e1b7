//! Binding keys
//!
//! A [`BindingKey`] identifies what a dependent asks for and what a producer
//! or published service offers: a type name plus an optional qualifier.
//! Keys are name-based so that declarative descriptors can carry them as
//! plain data; the typed [`BindingKey::of`] constructor derives the name
//! from a concrete Rust type.

use std::fmt;

/// Key under which values are requested, produced, and published
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey {
    type_name: String,
    qualifier: Option<String>,
}

impl BindingKey {
    /// Create a key from an explicit type name
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            qualifier: None,
        }
    }

    /// Create a key from a concrete Rust type
    pub fn of<T: 'static>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    /// Attach a qualifier, distinguishing multiple bindings of one type
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// The type-name component
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The qualifier component, if any
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}@{}", self.type_name, q),
            None => write!(f, "{}", self.type_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    #[test]
    fn test_typed_key_uses_type_name() {
        let key = BindingKey::of::<Widget>();
        assert!(key.type_name().ends_with("Widget"));
        assert_eq!(key.qualifier(), None);
    }

    #[test]
    fn test_qualified_keys_are_distinct() {
        let plain = BindingKey::named("db.Pool");
        let replica = BindingKey::named("db.Pool").with_qualifier("replica");
        assert_ne!(plain, replica);
        assert_eq!(format!("{}", replica), "db.Pool@replica");
    }
}
