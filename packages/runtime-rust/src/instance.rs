//! Instances and their member resolution.
//!
//! An instance resolves a member in this order:
//!
//! 1. Own fields (assigned through [`Object::set`])
//! 2. Its type's [`DerivedLayer`], once bootstrapped
//! 3. The raw member table of its type and ancestors
//!
//! Bootstrapping repoints the instance's delegation link from the raw table
//! to the layer. The repoint happens once and is never undone.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use jolt_core::{Callable, CoreError, Fault, Object, Value};
use parking_lot::{Mutex, RwLock};

use crate::config::TriggerSharing;
use crate::error::BootstrapError;
use crate::layer::DerivedLayer;
use crate::member::Member;
use crate::registry::LayerRegistry;
use crate::types::{TypeDef, TypeRef};

pub struct Instance {
    me: Weak<Instance>,
    ty: TypeRef,
    fields: RwLock<BTreeMap<String, Value>>,
    link: ArcSwapOption<DerivedLayer>,
    /// Memoized class-wide bound triggers, by member key.
    triggers: Mutex<HashMap<String, Callable>>,
}

impl Instance {
    /// Creates an instance resolving through its type's raw member table.
    #[must_use]
    pub fn new(ty: &TypeRef) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ty: Arc::clone(ty),
            fields: RwLock::new(BTreeMap::new()),
            link: ArcSwapOption::empty(),
            triggers: Mutex::new(HashMap::new()),
        })
    }

    /// Creates an instance and bootstraps it against the process-wide
    /// registry, the way a constructor would.
    ///
    /// # Errors
    ///
    /// Returns the type's classification error, if any.
    pub fn construct(ty: &TypeRef) -> Result<Arc<Self>, BootstrapError> {
        let instance = Self::new(ty);
        instance.bootstrap()?;
        Ok(instance)
    }

    #[must_use]
    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    /// The layer this instance resolves through, once bootstrapped.
    #[must_use]
    pub fn layer(&self) -> Option<Arc<DerivedLayer>> {
        self.link.load_full()
    }

    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.link.load().is_some()
    }

    /// Bootstraps against [`LayerRegistry::global`]. Returns the type's no-op
    /// reinitializer; repeated calls are harmless.
    ///
    /// # Errors
    ///
    /// Returns the type's classification error, if any.
    pub fn bootstrap(&self) -> Result<Callable, BootstrapError> {
        LayerRegistry::global().bootstrap(self)
    }

    /// Points the delegation link at `layer` unless it already points at one.
    pub(crate) fn repoint(&self, layer: &Arc<DerivedLayer>) {
        self.link
            .rcu(|current| current.clone().or_else(|| Some(Arc::clone(layer))));
    }

    /// This instance as a [`Value`].
    ///
    /// # Errors
    ///
    /// Fails only while the instance is being dropped.
    pub fn value(&self) -> Result<Value, Fault> {
        self.me.upgrade().map(|me| Value::Object(me)).ok_or_else(|| {
            CoreError::ReceiverDropped {
                callable: self.ty.name().to_string(),
            }
            .into()
        })
    }

    /// Own field, without consulting the type.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<Value> {
        self.fields.read().get(key).cloned()
    }

    fn resolve(&self, key: &str) -> Result<Value, Fault> {
        if let Some(own) = self.field(key) {
            return Ok(own);
        }
        if let Some(layer) = self.layer() {
            if let Some(value) = layer.resolve(self, key)? {
                return Ok(value);
            }
        }
        match self.ty.lookup(key) {
            Some((owner, member)) => Ok(self.raw_member(owner, key, member)),
            None => Ok(Value::Undefined),
        }
    }

    /// Raw table read: the declared callable itself, or its trigger if the
    /// declaring type has been class-wide bound.
    fn raw_member(&self, owner: &TypeDef, key: &str, member: &Member) -> Value {
        let callable = match owner.binding(key) {
            Some(sharing) => self.trigger(key, member.callable(), sharing),
            None => member.callable().clone(),
        };
        Value::Callable(callable)
    }

    /// Layer read of a plain method: bound to this instance, or its trigger
    /// if the declaring type has been class-wide bound.
    pub(crate) fn method_value(
        &self,
        owner: &TypeDef,
        key: &str,
        f: &Callable,
    ) -> Result<Value, Fault> {
        let callable = match owner.binding(key) {
            Some(sharing) => self.trigger(key, f, sharing),
            None => f.bind(self.value()?),
        };
        Ok(Value::Callable(callable))
    }

    fn trigger(&self, key: &str, f: &Callable, sharing: TriggerSharing) -> Callable {
        self.triggers
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| {
                let receiver: Weak<dyn Object> = self.me.clone();
                f.bind_scoped(receiver, sharing == TriggerSharing::Shared)
            })
            .clone()
    }
}

impl Object for Instance {
    fn type_name(&self) -> &str {
        self.ty.name()
    }

    fn get(&self, key: &str) -> Result<Value, Fault> {
        self.resolve(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Fault> {
        self.fields.write().insert(key.to_string(), value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.ty.name())
            .field("bootstrapped", &self.is_bootstrapped())
            .field("fields", &self.fields.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{CLASS_ACCESSOR, REINIT_ACCESSOR};

    /// `count` field helpers shared by the test types.
    fn read_count(this: &Value) -> Result<i64, Fault> {
        Ok(this.expect_object()?.get("count")?.as_int().unwrap_or(0))
    }

    fn counter_type() -> TypeRef {
        TypeDef::builder("Counter")
            .method("increment", |this, _| {
                let next = read_count(this)? + 1;
                this.expect_object()?.set("count", Value::Int(next))?;
                Ok(Value::Int(next))
            })
            .property("value", |this, _| Ok(Value::Int(read_count(this)?)))
            .class_method("describe", |this, args| {
                let class = this.expect_object()?.type_name().to_string();
                Ok(Value::from(format!("{class}:{}", args.len())))
            })
            .build()
    }

    #[test]
    fn raw_link_returns_declared_callables_unbound() {
        let counter = Instance::new(&counter_type());

        let value = counter.get("value").unwrap();

        assert!(!counter.is_bootstrapped());
        let raw = value.expect_callable().unwrap();
        assert_eq!(raw.name(), Some("property"));
        assert!(counter.get(CLASS_ACCESSOR).unwrap().is_undefined());
    }

    #[test]
    fn bootstrap_repoints_to_the_derived_layer() {
        let registry = LayerRegistry::new();
        let counter = Instance::new(&counter_type());

        registry.bootstrap(&counter).unwrap();

        assert!(counter.is_bootstrapped());
        counter.call_member("increment", &[]).unwrap();
        assert_eq!(counter.get("value").unwrap(), Value::Int(1));
    }

    #[test]
    fn property_is_recomputed_on_every_read() {
        let registry = LayerRegistry::new();
        let counter = Instance::new(&counter_type());
        registry.bootstrap(&counter).unwrap();

        assert_eq!(counter.get("value").unwrap(), Value::Int(0));
        counter.set("count", Value::Int(41)).unwrap();
        counter.call_member("increment", &[]).unwrap();
        assert_eq!(counter.get("value").unwrap(), Value::Int(42));
    }

    #[test]
    fn plain_method_is_bound_to_the_reading_instance() {
        let registry = LayerRegistry::new();
        let ty = counter_type();
        let a = Instance::new(&ty);
        let b = Instance::new(&ty);
        registry.bootstrap(&a).unwrap();
        registry.bootstrap(&b).unwrap();

        let increment_a = a.get("increment").unwrap();
        increment_a.expect_callable().unwrap().call(&[]).unwrap();
        increment_a.expect_callable().unwrap().call(&[]).unwrap();

        assert_eq!(a.field("count"), Some(Value::Int(2)));
        assert_eq!(b.field("count"), None);
    }

    #[test]
    fn class_method_gets_the_type_as_receiver_and_first_argument() {
        let registry = LayerRegistry::new();
        let counter = Instance::new(&counter_type());
        registry.bootstrap(&counter).unwrap();

        let described = counter.call_member("describe", &["x".into()]).unwrap();

        assert_eq!(described, Value::from("Counter:2"));
    }

    #[test]
    fn reserved_accessors_after_bootstrap() {
        let registry = LayerRegistry::new();
        let ty = counter_type();
        let counter = Instance::new(&ty);
        let reinit = registry.bootstrap(&counter).unwrap();

        let class = counter.get(CLASS_ACCESSOR).unwrap();
        let class_def = class.downcast::<TypeDef>().unwrap();
        assert_eq!(class_def.key(), ty.key());

        let again = counter.get(REINIT_ACCESSOR).unwrap();
        assert!(again.expect_callable().unwrap().ptr_eq(&reinit));
        assert_eq!(reinit.call(&[]).unwrap(), Value::Undefined);
    }

    #[test]
    fn repeated_bootstrap_is_harmless_and_link_never_reverts() {
        let registry = LayerRegistry::new();
        let counter = Instance::new(&counter_type());
        registry.bootstrap(&counter).unwrap();
        let layer = counter.layer().unwrap();

        registry.bootstrap(&counter).unwrap();
        LayerRegistry::new().bootstrap(&counter).unwrap();

        assert!(Arc::ptr_eq(&counter.layer().unwrap(), &layer));
    }

    #[test]
    fn own_fields_shadow_layer_members() {
        let registry = LayerRegistry::new();
        let counter = Instance::new(&counter_type());
        registry.bootstrap(&counter).unwrap();

        counter.set("value", Value::from("shadowed")).unwrap();

        assert_eq!(counter.get("value").unwrap(), Value::from("shadowed"));
    }

    #[test]
    fn inherited_members_fall_back_to_raw_values() {
        let registry = LayerRegistry::new();
        let base = counter_type();
        let child = TypeDef::builder("LoudCounter")
            .extends(&base)
            .property("shout", |_, _| Ok(Value::from("HEY")))
            .build();
        let loud = Instance::new(&child);
        registry.bootstrap(&loud).unwrap();

        assert_eq!(loud.get("shout").unwrap(), Value::from("HEY"));
        let inherited = loud.get("value").unwrap();
        assert_eq!(inherited.expect_callable().unwrap().name(), Some("property"));
        assert!(loud.get("nothing").unwrap().is_undefined());
    }

    #[test]
    fn failing_property_surfaces_to_the_reader() {
        let registry = LayerRegistry::new();
        let ty = TypeDef::builder("Flaky")
            .property("broken", |_, _| Err(Fault::new("no value")))
            .build();
        let flaky = Instance::new(&ty);
        registry.bootstrap(&flaky).unwrap();

        assert_eq!(flaky.get("broken").unwrap_err(), Fault::new("no value"));
    }

    #[test]
    fn construct_bootstraps_through_the_global_registry() {
        let counter = Instance::construct(&counter_type()).unwrap();
        assert!(counter.is_bootstrapped());
        assert!(LayerRegistry::global().is_built(counter.type_ref()));
    }

    #[test]
    fn debug_lists_field_keys_without_rendering_values() {
        let counter = Instance::new(&counter_type());
        counter.set("me", counter.value().unwrap()).unwrap();
        counter.set("count", Value::Int(3)).unwrap();

        let rendered = format!("{counter:?}");

        assert!(rendered.contains(r#"fields: ["count", "me"]"#));
        assert!(rendered.contains(r#"type: "Counter""#));
        counter.fields.write().clear();
    }

    #[test]
    fn value_round_trips_to_the_same_instance() {
        let counter = Instance::new(&counter_type());
        let value = counter.value().unwrap();
        let back = value.downcast::<Instance>().unwrap();
        assert!(std::ptr::eq(back, Arc::as_ptr(&counter)));
    }
}
