//! Class-wide method binding.
//!
//! Converting a type's plain methods into per-instance triggers lets code
//! hand a method around by value (to a scheduler, an event subscription)
//! while keeping it attached to the instance it was read from. Every read of
//! a converted member returns the same trigger for a given instance, so
//! `on`/`then`/`after` issued through one read are observed through the next.

use crate::config::{RuntimeConfig, TriggerSharing};
use crate::member::MemberTag;
use crate::types::TypeDef;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodBinder {
    sharing: TriggerSharing,
}

impl MethodBinder {
    #[must_use]
    pub fn new(sharing: TriggerSharing) -> Self {
        Self { sharing }
    }

    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.trigger_sharing)
    }

    #[must_use]
    pub fn sharing(&self) -> TriggerSharing {
        self.sharing
    }

    /// Converts every plain method declared directly on `ty`.
    ///
    /// Properties, class methods and inherited members are left alone.
    /// Members already converted keep their original sharing mode. Returns
    /// how many members this call converted.
    pub fn bind(&self, ty: &TypeDef) -> usize {
        let converted = ty
            .members()
            .filter(|(_, member)| *member.tag() == MemberTag::Method)
            .filter(|(key, _)| ty.bind_member(key, self.sharing))
            .count();
        tracing::debug!(
            type_name = ty.name(),
            converted,
            sharing = ?self.sharing,
            "class-wide method binding applied"
        );
        converted
    }
}
