//! Core data structures shared by the registry, the assembler and the providers.

use crate::error::ResolveError;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The error type construction functions may fail with.
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A type-erased, shareable instance.
///
/// The payload is always an `Arc<T>` for the bound `T`, which lets unsized
/// targets such as `dyn Trait` be stored and downcast like any other value.
pub type Instance = Arc<dyn Any + Send + Sync>;

thread_local! {
  // Keys currently being resolved on this thread, outermost first.
  static RESOLVING_STACK: RefCell<Vec<InjectionKey>> = const { RefCell::new(Vec::new()) };
}

/// An RAII guard tracking the keys under resolution on the current thread.
///
/// The assembled graph is acyclic, so the only way to revisit a key is a
/// construction function that resolves through a captured container. That
/// would deadlock on the singleton cell, so it is reported as an error.
pub(crate) struct ResolutionGuard {
  _private: (),
}

impl ResolutionGuard {
  pub(crate) fn enter(key: &InjectionKey) -> Result<Self, ResolveError> {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(pos) = stack.iter().position(|k| k == key) {
        let mut chain: Vec<InjectionKey> = stack[pos..].to_vec();
        chain.push(key.clone());
        return Err(ResolveError::Reentrant { chain });
      }
      stack.push(key.clone());
      Ok(Self { _private: () })
    })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      stack.borrow_mut().pop();
    });
  }
}

/// Identifies a binding: the bound type plus an optional qualifier name.
#[derive(Clone)]
pub struct InjectionKey {
  type_id: TypeId,
  type_name: &'static str,
  name: Option<Cow<'static, str>>,
}

impl InjectionKey {
  /// The unqualified key for `T`.
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      name: None,
    }
  }

  /// The key for `T` qualified by `name`.
  pub fn named<T: ?Sized + Any>(name: impl Into<Cow<'static, str>>) -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      name: Some(name.into()),
    }
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub(crate) fn is_for<T: ?Sized + Any>(&self) -> bool {
    self.type_id == TypeId::of::<T>()
  }
}

impl PartialEq for InjectionKey {
  fn eq(&self, other: &Self) -> bool {
    self.type_id == other.type_id && self.name == other.name
  }
}

impl Eq for InjectionKey {}

impl Hash for InjectionKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.type_id.hash(state);
    self.name.hash(state);
  }
}

impl Ord for InjectionKey {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .type_name
      .cmp(other.type_name)
      .then_with(|| self.name.cmp(&other.name))
      .then_with(|| self.type_id.cmp(&other.type_id))
  }
}

impl PartialOrd for InjectionKey {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Debug for InjectionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "Key({}, Name({}))", self.type_name, name),
      None => write!(f, "Key({})", self.type_name),
    }
  }
}

impl fmt::Display for InjectionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "{}[{}]", self.type_name, name),
      None => f.write_str(self.type_name),
    }
  }
}

/// Borrows the `Arc<T>` stored in a type-erased instance.
pub(crate) fn downcast<T: ?Sized + Any + Send + Sync>(instance: &Instance) -> Option<Arc<T>> {
  instance.downcast_ref::<Arc<T>>().cloned()
}

/// Erases an `Arc<T>` into an [`Instance`].
pub(crate) fn erase<T: ?Sized + Any + Send + Sync>(value: Arc<T>) -> Instance {
  Arc::new(value)
}

#[cfg(test)]
mod tests {
  use super::*;

  trait Marker: Send + Sync {}

  #[test]
  fn keys_compare_by_type_and_name() {
    assert_eq!(InjectionKey::of::<String>(), InjectionKey::of::<String>());
    assert_ne!(InjectionKey::of::<String>(), InjectionKey::named::<String>("a"));
    assert_ne!(InjectionKey::named::<String>("a"), InjectionKey::named::<String>("b"));
    assert_ne!(InjectionKey::of::<String>(), InjectionKey::of::<u32>());
    assert_eq!(InjectionKey::of::<dyn Marker>(), InjectionKey::of::<dyn Marker>());
  }

  #[test]
  fn display_includes_qualifier() {
    let key = InjectionKey::named::<u32>("port");
    assert_eq!(key.to_string(), "u32[port]");
    assert_eq!(InjectionKey::of::<u32>().to_string(), "u32");
  }

  #[test]
  fn guard_rejects_reentry_and_unwinds() {
    let a = InjectionKey::of::<u8>();
    let b = InjectionKey::of::<u16>();

    let outer = ResolutionGuard::enter(&a).unwrap();
    let inner = ResolutionGuard::enter(&b).unwrap();
    match ResolutionGuard::enter(&a) {
      Err(ResolveError::Reentrant { chain }) => assert_eq!(chain, vec![a.clone(), b.clone(), a.clone()]),
      other => panic!("expected re-entrant error, got {:?}", other.map(|_| ())),
    }
    drop(inner);
    drop(outer);

    // The stack is empty again, so the same key can be entered afresh.
    assert!(ResolutionGuard::enter(&a).is_ok());
  }

  #[test]
  fn erase_and_downcast_unsized_targets() {
    struct Impl;
    impl Marker for Impl {}

    let value: Arc<dyn Marker> = Arc::new(Impl);
    let erased = erase(value.clone());
    let back = downcast::<dyn Marker>(&erased).unwrap();
    assert!(Arc::ptr_eq(&value, &back));
    assert!(downcast::<Impl>(&erased).is_none());
  }
}
