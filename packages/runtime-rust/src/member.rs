//! Declared members and their classification tags.

use jolt_core::{Callable, Fault, Value};

/// How a declared member behaves when read on a migrated instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberTag {
    /// Untagged: reads return the function bound to the instance.
    Method,
    /// Reads call the function with the instance and return the result.
    Property,
    /// Reads return a wrapper that calls the function with the owning type
    /// as receiver and first argument.
    ClassMethod,
    /// Any other declared tag. Rejected when the type is bootstrapped.
    Unsupported(String),
}

impl MemberTag {
    pub const PROPERTY: &'static str = "property";
    pub const CLASS_METHOD: &'static str = "classMethod";

    /// Reads the tag from a callable's declared name. Anonymous callables
    /// (and empty names) are plain methods.
    #[must_use]
    pub fn from_declared_name(name: Option<&str>) -> Self {
        match name {
            None | Some("") => Self::Method,
            Some(Self::PROPERTY) => Self::Property,
            Some(Self::CLASS_METHOD) => Self::ClassMethod,
            Some(other) => Self::Unsupported(other.to_string()),
        }
    }

    /// The declared name that produces this tag.
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Self::Method => None,
            Self::Property => Some(Self::PROPERTY),
            Self::ClassMethod => Some(Self::CLASS_METHOD),
            Self::Unsupported(name) => Some(name),
        }
    }
}

/// A callable declared on a type, with its tag.
#[derive(Debug, Clone)]
pub struct Member {
    tag: MemberTag,
    callable: Callable,
}

impl Member {
    /// Tag taken from the callable's declared name.
    #[must_use]
    pub fn declared(callable: Callable) -> Self {
        Self {
            tag: MemberTag::from_declared_name(callable.name()),
            callable,
        }
    }

    /// Explicit tag; the callable's name is not consulted.
    #[must_use]
    pub fn tagged(tag: MemberTag, callable: Callable) -> Self {
        Self { tag, callable }
    }

    pub fn method<F>(body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::declared(Callable::new(body))
    }

    pub fn property<F>(body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::declared(Callable::new(body).renamed(MemberTag::PROPERTY))
    }

    pub fn class_method<F>(body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::declared(Callable::new(body).renamed(MemberTag::CLASS_METHOD))
    }

    #[must_use]
    pub fn tag(&self) -> &MemberTag {
        &self.tag
    }

    #[must_use]
    pub fn callable(&self) -> &Callable {
        &self.callable
    }
}
