//! Element-type identity.
//!
//! Pipelines only need to know whether two stages agree on the element type
//! flowing between them, so an element type is a `TypeId` plus a readable
//! name for violation evidence.

use serde::{Serialize, Serializer};
use std::any::{TypeId, type_name};
use std::fmt;

#[derive(Debug, Clone, Copy)]
pub struct ElementType {
    id: TypeId,
    name: &'static str,
}

impl ElementType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The name without its module path, e.g. `String` for
    /// `alloc::string::String`.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ElementType {}

impl std::hash::Hash for ElementType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Serialize for ElementType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_follows_the_rust_type() {
        assert_eq!(ElementType::of::<i64>(), ElementType::of::<i64>());
        assert_ne!(ElementType::of::<i64>(), ElementType::of::<String>());
        assert_eq!(ElementType::of::<String>().short_name(), "String");
        assert_eq!(ElementType::of::<i64>().to_string(), "i64");
    }
}
