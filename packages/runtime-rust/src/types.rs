//! Type declarations.
//!
//! A [`TypeDef`] owns an immutable, tagged member table and an optional
//! parent. The only runtime-owned state on a type is the set of members
//! converted by the [`MethodBinder`](crate::binder::MethodBinder).

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use jolt_core::{Callable, CoreError, Fault, Object, Value};
use parking_lot::RwLock;

use crate::config::TriggerSharing;
use crate::member::{Member, MemberTag};

static NEXT_TYPE_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u64);

impl TypeKey {
    fn next() -> Self {
        Self(NEXT_TYPE_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

pub type TypeRef = Arc<TypeDef>;

#[derive(Debug)]
pub struct TypeDef {
    key: TypeKey,
    name: String,
    parent: Option<TypeRef>,
    members: BTreeMap<String, Member>,
    bindings: RwLock<HashMap<String, TriggerSharing>>,
}

impl TypeDef {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder {
            name: name.into(),
            parent: None,
            members: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&TypeRef> {
        self.parent.as_ref()
    }

    /// Members declared directly on this type, in key order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(key, member)| (key.as_str(), member))
    }

    #[must_use]
    pub fn own_member(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    /// Finds `key` on this type or the nearest ancestor declaring it.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<(&TypeDef, &Member)> {
        match self.members.get(key) {
            Some(member) => Some((self, member)),
            None => self.parent.as_deref()?.lookup(key),
        }
    }

    /// Sharing mode recorded for a class-wide bound member, if converted.
    #[must_use]
    pub fn binding(&self, key: &str) -> Option<TriggerSharing> {
        self.bindings.read().get(key).copied()
    }

    /// Records a class-wide binding. Returns `false` if already bound.
    pub(crate) fn bind_member(&self, key: &str, sharing: TriggerSharing) -> bool {
        let mut bindings = self.bindings.write();
        if bindings.contains_key(key) {
            return false;
        }
        bindings.insert(key.to_string(), sharing);
        true
    }
}

/// A type exposes its raw declared members; it cannot be assigned to.
impl Object for TypeDef {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Value, Fault> {
        Ok(self
            .lookup(key)
            .map_or(Value::Undefined, |(_, member)| Value::Callable(member.callable().clone())))
    }

    fn set(&self, key: &str, _value: Value) -> Result<(), Fault> {
        Err(CoreError::Immutable {
            owner: format!("type {}", self.name),
            key: key.to_string(),
        }
        .into())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builder for [`TypeDef`].
///
/// Later declarations under the same key replace earlier ones.
#[derive(Debug)]
#[must_use]
pub struct TypeBuilder {
    name: String,
    parent: Option<TypeRef>,
    members: BTreeMap<String, Member>,
}

impl TypeBuilder {
    pub fn extends(mut self, parent: &TypeRef) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Declares `callable`, tagged by its declared name.
    pub fn member(self, key: impl Into<String>, callable: Callable) -> Self {
        self.insert(key, Member::declared(callable))
    }

    pub fn tagged(self, key: impl Into<String>, tag: MemberTag, callable: Callable) -> Self {
        self.insert(key, Member::tagged(tag, callable))
    }

    pub fn method<F>(self, key: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.insert(key, Member::method(body))
    }

    pub fn property<F>(self, key: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.insert(key, Member::property(body))
    }

    pub fn class_method<F>(self, key: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.insert(key, Member::class_method(body))
    }

    fn insert(mut self, key: impl Into<String>, member: Member) -> Self {
        self.members.insert(key.into(), member);
        self
    }

    #[must_use]
    pub fn build(self) -> TypeRef {
        Arc::new(TypeDef {
            key: TypeKey::next(),
            name: self.name,
            parent: self.parent,
            members: self.members,
            bindings: RwLock::new(HashMap::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animal() -> TypeRef {
        TypeDef::builder("Animal")
            .method("breathe", |_, _| Ok(Value::from("in, out")))
            .property("legs", |_, _| Ok(Value::Int(4)))
            .build()
    }

    #[test]
    fn every_type_gets_a_distinct_key() {
        assert_ne!(animal().key(), animal().key());
    }

    #[test]
    fn members_are_listed_in_key_order() {
        let ty = TypeDef::builder("T")
            .method("zeta", |_, _| Ok(Value::Null))
            .method("alpha", |_, _| Ok(Value::Null))
            .build();
        let keys: Vec<&str> = ty.members().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn lookup_walks_the_parent_chain() {
        let base = animal();
        let dog = TypeDef::builder("Dog")
            .extends(&base)
            .method("bark", |_, _| Ok(Value::from("woof")))
            .build();

        let (owner, _) = dog.lookup("bark").unwrap();
        assert_eq!(owner.name(), "Dog");
        let (owner, member) = dog.lookup("legs").unwrap();
        assert_eq!(owner.name(), "Animal");
        assert_eq!(member.tag(), &MemberTag::Property);
        assert!(dog.own_member("legs").is_none());
        assert!(dog.lookup("fly").is_none());
    }

    #[test]
    fn type_object_exposes_raw_members_and_rejects_assignment() {
        let ty = animal();
        let breathe = ty.get("breathe").unwrap();
        assert_eq!(breathe.expect_callable().unwrap().call(&[]).unwrap(), Value::from("in, out"));
        assert!(ty.get("missing").unwrap().is_undefined());

        let err = ty.set("legs", Value::Int(3)).unwrap_err();
        assert_eq!(
            err.into_value(),
            Value::from("cannot assign `legs` on immutable type Animal")
        );
    }

    #[test]
    fn bind_member_is_recorded_once() {
        let ty = animal();
        assert!(ty.binding("breathe").is_none());
        assert!(ty.bind_member("breathe", TriggerSharing::PerInstance));
        assert!(!ty.bind_member("breathe", TriggerSharing::Shared));
        assert_eq!(ty.binding("breathe"), Some(TriggerSharing::PerInstance));
    }
}
