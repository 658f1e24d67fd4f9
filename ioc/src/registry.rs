//! The declaration table: one binding per key.

use crate::binding::Binding;
use crate::core::InjectionKey;
use crate::error::GraphError;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub(crate) struct Registry {
  bindings: HashMap<InjectionKey, Binding>,
  allow_overrides: bool,
}

impl Registry {
  pub(crate) fn set_allow_overrides(&mut self, allow: bool) {
    self.allow_overrides = allow;
  }

  pub(crate) fn register(&mut self, binding: Binding) -> Result<(), GraphError> {
    match self.bindings.entry(binding.key().clone()) {
      Entry::Vacant(slot) => {
        slot.insert(binding);
        Ok(())
      }
      Entry::Occupied(mut slot) if self.allow_overrides => {
        tracing::debug!(
          key = %binding.key(),
          previous = %slot.get().lifetime(),
          lifetime = %binding.lifetime(),
          "overriding existing binding"
        );
        slot.insert(binding);
        Ok(())
      }
      Entry::Occupied(slot) => Err(GraphError::DuplicateBinding {
        key: slot.key().clone(),
        existing: slot.get().lifetime().clone(),
      }),
    }
  }

  pub(crate) fn get(&self, key: &InjectionKey) -> Option<&Binding> {
    self.bindings.get(key)
  }

  pub(crate) fn contains(&self, key: &InjectionKey) -> bool {
    self.bindings.contains_key(key)
  }

  pub(crate) fn len(&self) -> usize {
    self.bindings.len()
  }

  /// Keys in a stable order so assembly visits bindings deterministically.
  pub(crate) fn sorted_keys(&self) -> Vec<&InjectionKey> {
    let mut keys: Vec<&InjectionKey> = self.bindings.keys().collect();
    keys.sort();
    keys
  }
}
