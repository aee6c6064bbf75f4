//! Derived member-resolution layer.
//!
//! Built once per type by classifying the type's own members (see
//! [`MemberTag`]). Migrated instances resolve members through their type's
//! layer instead of the raw member table.

use std::collections::BTreeMap;
use std::sync::Arc;

use jolt_core::{Callable, Fault, Object, Value};

use crate::error::BootstrapError;
use crate::instance::Instance;
use crate::member::{Member, MemberTag};
use crate::types::TypeRef;

/// Identity accessor: resolves to the owning type.
pub const CLASS_ACCESSOR: &str = "$class";
/// Reinitialize accessor: resolves to a no-op callable.
pub const REINIT_ACCESSOR: &str = "$jolt";

/// Classified read behavior for one member.
#[derive(Debug, Clone)]
pub enum Accessor {
    Method(Callable),
    Property(Callable),
    ClassMethod(Callable),
}

#[derive(Debug)]
pub struct DerivedLayer {
    owner: TypeRef,
    accessors: BTreeMap<String, Accessor>,
    reinit: Callable,
}

impl DerivedLayer {
    /// Classifies every own member of `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidTag`] for a member with an unsupported
    /// tag and [`BootstrapError::ReservedKey`] for a member declared under a
    /// reserved accessor name.
    pub fn build(owner: &TypeRef) -> Result<Self, BootstrapError> {
        let mut accessors = BTreeMap::new();
        for (key, member) in owner.members() {
            if key == CLASS_ACCESSOR || key == REINIT_ACCESSOR {
                return Err(BootstrapError::ReservedKey {
                    type_name: owner.name().to_string(),
                    key: key.to_string(),
                });
            }
            accessors.insert(key.to_string(), classify(owner, key, member)?);
        }
        tracing::debug!(
            type_name = owner.name(),
            members = accessors.len(),
            "derived layer built"
        );
        Ok(Self {
            owner: Arc::clone(owner),
            accessors,
            reinit: Callable::named(REINIT_ACCESSOR, |_, _| Ok(Value::Undefined)),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &TypeRef {
        &self.owner
    }

    #[must_use]
    pub fn accessor(&self, key: &str) -> Option<&Accessor> {
        self.accessors.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    /// The no-op reinitializer returned by repeated bootstrap requests.
    #[must_use]
    pub fn reinitializer(&self) -> Callable {
        self.reinit.clone()
    }

    /// Resolves `key` for `instance`. `None` means the layer has no entry and
    /// the caller should fall back to inherited members.
    pub(crate) fn resolve(&self, instance: &Instance, key: &str) -> Result<Option<Value>, Fault> {
        match key {
            CLASS_ACCESSOR => {
                let owner: Arc<dyn Object> = self.owner.clone();
                return Ok(Some(Value::Object(owner)));
            }
            REINIT_ACCESSOR => return Ok(Some(Value::Callable(self.reinitializer()))),
            _ => {}
        }
        let Some(accessor) = self.accessors.get(key) else {
            return Ok(None);
        };
        let value = match accessor {
            Accessor::Method(f) => instance.method_value(&self.owner, key, f)?,
            Accessor::Property(f) => f.call_with(&instance.value()?, &[])?,
            Accessor::ClassMethod(f) => Value::Callable(class_method(&self.owner, f)),
        };
        Ok(Some(value))
    }
}

fn classify(owner: &TypeRef, key: &str, member: &Member) -> Result<Accessor, BootstrapError> {
    let callable = member.callable().clone();
    match member.tag() {
        MemberTag::Method => Ok(Accessor::Method(callable)),
        MemberTag::Property => Ok(Accessor::Property(callable)),
        MemberTag::ClassMethod => Ok(Accessor::ClassMethod(callable)),
        MemberTag::Unsupported(tag) => Err(BootstrapError::InvalidTag {
            type_name: owner.name().to_string(),
            key: key.to_string(),
            tag: tag.clone(),
        }),
    }
}

/// Wrapper calling `f` with `owner` as receiver and as first argument.
fn class_method(owner: &TypeRef, f: &Callable) -> Callable {
    let class: Arc<dyn Object> = owner.clone();
    let target = f.clone();
    Callable::named(MemberTag::CLASS_METHOD, move |_, args| {
        let class = Value::Object(Arc::clone(&class));
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(class.clone());
        full.extend_from_slice(args);
        target.call_with(&class, &full)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDef;

    #[test]
    fn classifies_each_tag() {
        let ty = TypeDef::builder("Shape")
            .method("grow", |_, _| Ok(Value::Null))
            .property("area", |_, _| Ok(Value::Int(0)))
            .class_method("unit", |_, _| Ok(Value::Null))
            .build();

        let layer = DerivedLayer::build(&ty).unwrap();

        assert_eq!(layer.len(), 3);
        assert!(matches!(layer.accessor("grow"), Some(Accessor::Method(_))));
        assert!(matches!(layer.accessor("area"), Some(Accessor::Property(_))));
        assert!(matches!(layer.accessor("unit"), Some(Accessor::ClassMethod(_))));
        assert!(layer.accessor("missing").is_none());
        assert!(Arc::ptr_eq(layer.owner(), &ty));
    }

    #[test]
    fn unsupported_tag_names_type_member_and_tag() {
        let ty = TypeDef::builder("Person")
            .member("greet", Callable::named("unsupportedTag", |_, _| Ok(Value::Null)))
            .build();

        let err = DerivedLayer::build(&ty).unwrap_err();

        assert_eq!(
            err,
            BootstrapError::InvalidTag {
                type_name: "Person".to_string(),
                key: "greet".to_string(),
                tag: "unsupportedTag".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "Function Person.greet has invalid name: unsupportedTag"
        );
    }

    #[test]
    fn reserved_keys_are_rejected() {
        for key in [CLASS_ACCESSOR, REINIT_ACCESSOR] {
            let ty = TypeDef::builder("Sneaky")
                .method(key, |_, _| Ok(Value::Null))
                .build();
            assert!(matches!(
                DerivedLayer::build(&ty),
                Err(BootstrapError::ReservedKey { .. })
            ));
        }
    }

    #[test]
    fn inherited_members_are_not_classified() {
        let base = TypeDef::builder("Base")
            .property("id", |_, _| Ok(Value::Int(1)))
            .build();
        let derived = TypeDef::builder("Derived").extends(&base).build();

        let layer = DerivedLayer::build(&derived).unwrap();

        assert!(layer.is_empty());
    }

    #[test]
    fn reinitializer_is_a_stable_no_op() {
        let layer = DerivedLayer::build(&TypeDef::builder("Empty").build()).unwrap();
        let reinit = layer.reinitializer();
        assert!(reinit.ptr_eq(&layer.reinitializer()));
        assert_eq!(reinit.call(&[]).unwrap(), Value::Undefined);
    }

    #[test]
    fn class_method_receives_owner_first() {
        let ty = TypeDef::builder("Greeter")
            .class_method("describe", |this, args| {
                let receiver = this.expect_object()?.type_name().to_string();
                let first = args[0].expect_object()?.type_name().to_string();
                Ok(Value::from(format!("{receiver}/{first}/{}", args[1])))
            })
            .build();
        let layer = DerivedLayer::build(&ty).unwrap();
        let Some(Accessor::ClassMethod(f)) = layer.accessor("describe") else {
            panic!("expected class method");
        };

        let wrapper = class_method(&ty, f);

        assert_eq!(wrapper.name(), Some("classMethod"));
        assert_eq!(
            wrapper.call(&["x".into()]).unwrap(),
            Value::from("Greeter/Greeter/x")
        );
    }
}
