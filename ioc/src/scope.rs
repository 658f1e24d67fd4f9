//! Named scopes: their declared hierarchy, their live instances and the
//! handles that keep those instances open.

use crate::container::Context;
use crate::core::{InjectionKey, Instance};
use crate::error::{GraphError, ResolveError, ScopeError};
use crate::graph::Graph;
use crate::provider::DynProvider;
use crate::Resolver;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The name of a scope.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ScopeName(Cow<'static, str>);

impl ScopeName {
  /// The root scope every singleton lives in. It is always active.
  pub const SINGLETON: ScopeName = ScopeName(Cow::Borrowed("singleton"));
  /// Survives configuration changes of a screen; parent of view-model and activity scopes.
  pub const ACTIVITY_RETAINED: ScopeName = ScopeName(Cow::Borrowed("activity_retained"));
  pub const VIEW_MODEL: ScopeName = ScopeName(Cow::Borrowed("view_model"));
  pub const ACTIVITY: ScopeName = ScopeName(Cow::Borrowed("activity"));

  pub const fn new_static(name: &'static str) -> Self {
    ScopeName(Cow::Borrowed(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_root(&self) -> bool {
    *self == Self::SINGLETON
  }
}

impl From<&'static str> for ScopeName {
  fn from(name: &'static str) -> Self {
    ScopeName(Cow::Borrowed(name))
  }
}

impl From<String> for ScopeName {
  fn from(name: String) -> Self {
    ScopeName(Cow::Owned(name))
  }
}

impl From<ScopeName> for String {
  fn from(name: ScopeName) -> Self {
    name.0.into_owned()
  }
}

impl fmt::Debug for ScopeName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Scope({})", self.0)
  }
}

impl fmt::Display for ScopeName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

pub(crate) static ROOT_SCOPE: ScopeName = ScopeName::SINGLETON;

/// Declares a scope below the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeSpec {
  pub name: ScopeName,
  /// Defaults to the root singleton scope.
  #[serde(default)]
  pub parent: Option<ScopeName>,
  /// At most one live instance of an exclusive scope may exist at a time.
  #[serde(default)]
  pub exclusive: bool,
}

impl ScopeSpec {
  pub fn new(name: impl Into<ScopeName>) -> Self {
    Self {
      name: name.into(),
      parent: None,
      exclusive: false,
    }
  }

  pub fn parent(mut self, parent: impl Into<ScopeName>) -> Self {
    self.parent = Some(parent.into());
    self
  }

  pub fn exclusive(mut self, exclusive: bool) -> Self {
    self.exclusive = exclusive;
    self
  }

  pub(crate) fn parent_name(&self) -> &ScopeName {
    self.parent.as_ref().unwrap_or(&ROOT_SCOPE)
  }
}

/// The declared scope hierarchy.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScopeTree {
  specs: HashMap<ScopeName, ScopeSpec>,
}

impl ScopeTree {
  pub(crate) fn declare(&mut self, spec: ScopeSpec) -> Result<(), GraphError> {
    if spec.name.is_root() || self.specs.contains_key(&spec.name) {
      return Err(GraphError::DuplicateScope(spec.name));
    }
    self.specs.insert(spec.name.clone(), spec);
    Ok(())
  }

  pub(crate) fn get(&self, name: &ScopeName) -> Option<&ScopeSpec> {
    self.specs.get(name)
  }

  pub(crate) fn contains(&self, name: &ScopeName) -> bool {
    name.is_root() || self.specs.contains_key(name)
  }

  pub(crate) fn len(&self) -> usize {
    self.specs.len()
  }

  /// Checks every parent exists and the hierarchy is a tree.
  pub(crate) fn validate(&self) -> Vec<GraphError> {
    let mut errors = Vec::new();
    let mut names: Vec<&ScopeName> = self.specs.keys().collect();
    names.sort();

    for name in names {
      let spec = &self.specs[name];
      if !self.contains(spec.parent_name()) {
        errors.push(GraphError::UnknownScope {
          scope: spec.parent_name().clone(),
          referenced_by: format!("scope '{}'", name),
        });
        continue;
      }

      let mut current = spec.parent_name();
      let mut steps = 0;
      while !current.is_root() {
        if current == name || steps > self.specs.len() {
          errors.push(GraphError::CyclicScope(name.clone()));
          break;
        }
        match self.specs.get(current) {
          Some(parent) => current = parent.parent_name(),
          None => break,
        }
        steps += 1;
      }
    }
    errors
  }

  /// Whether `ancestor` is `scope` itself or one of its parents.
  pub(crate) fn is_ancestor_or_self(&self, ancestor: &ScopeName, scope: &ScopeName) -> bool {
    let mut current = scope;
    for _ in 0..=self.specs.len() {
      if current == ancestor {
        return true;
      }
      if current.is_root() {
        return false;
      }
      match self.specs.get(current) {
        Some(spec) => current = spec.parent_name(),
        None => return false,
      }
    }
    false
  }
}

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// One live instance of a scope, owning a cache cell per binding slot.
pub(crate) struct ScopeInstance {
  id: u64,
  name: ScopeName,
  // `None` once released. Constructions hold a read lock so release waits
  // for them to finish.
  slots: RwLock<Option<Box<[OnceCell<Instance>]>>>,
  // Slots in the order their cells were populated.
  constructed: Mutex<Vec<usize>>,
}

impl ScopeInstance {
  pub(crate) fn new(name: ScopeName, slot_count: usize) -> Self {
    let slots: Box<[OnceCell<Instance>]> = (0..slot_count).map(|_| OnceCell::new()).collect();
    Self {
      id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
      name,
      slots: RwLock::new(Some(slots)),
      constructed: Mutex::new(Vec::new()),
    }
  }

  pub(crate) fn id(&self) -> u64 {
    self.id
  }

  pub(crate) fn name(&self) -> &ScopeName {
    &self.name
  }

  /// Runs `f` over the cache cells while holding them open, or returns `None`
  /// if the scope has been released.
  ///
  /// The read lock is recursive: a construction running inside `f` may
  /// resolve further bindings cached in this same scope.
  pub(crate) fn with_slots<R>(&self, f: impl FnOnce(&[OnceCell<Instance>]) -> R) -> Option<R> {
    let slots = self.slots.read_recursive();
    slots.as_deref().map(f)
  }

  pub(crate) fn is_open(&self) -> bool {
    self.slots.read_recursive().is_some()
  }

  pub(crate) fn record_constructed(&self, slot: usize) {
    self.constructed.lock().push(slot);
  }

  /// Closes the scope, running release hooks newest first.
  ///
  /// Waits for constructions in flight, so every instance that made it into
  /// the cache is released. Returns the number of released instances.
  pub(crate) fn release(&self, graph: &Graph) -> usize {
    let Some(slots) = self.slots.write().take() else {
      return 0;
    };
    let order = std::mem::take(&mut *self.constructed.lock());

    let mut released = 0;
    for slot in order.into_iter().rev() {
      let Some(instance) = slots[slot].get() else {
        continue;
      };
      if let Some(node) = graph.node_at(slot) {
        if let Some(hook) = node.binding().release_hook() {
          hook(instance);
        }
      }
      released += 1;
    }
    released
  }
}

impl fmt::Debug for ScopeInstance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ScopeInstance")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("open", &self.is_open())
      .finish()
  }
}

/// Keeps a scope instance alive. Resolves bindings of that scope and of
/// every enclosing scope.
///
/// Dropping the handle exits the scope, like calling [`ScopeHandle::exit`].
pub struct ScopeHandle {
  ctx: Context,
  exited: bool,
}

impl ScopeHandle {
  pub(crate) fn new(ctx: Context) -> Self {
    Self { ctx, exited: false }
  }

  pub fn name(&self) -> &ScopeName {
    self.ctx.leaf().name()
  }

  /// A process-unique id for this scope instance.
  pub fn id(&self) -> u64 {
    self.ctx.leaf().id()
  }

  /// Enters a child scope. Its declared parent must be this scope or one of
  /// its ancestors.
  pub fn enter_scope(&self, name: impl Into<ScopeName>) -> Result<ScopeHandle, ScopeError> {
    self.ctx.enter(name.into())
  }

  /// Exits the scope, releasing every instance cached in it.
  ///
  /// Returns the number of released instances.
  pub fn exit(mut self) -> usize {
    self.exited = true;
    self.ctx.exit_leaf()
  }
}

impl Resolver for ScopeHandle {
  fn provider_for_key(&self, key: &InjectionKey) -> Result<DynProvider, ResolveError> {
    self.ctx.provider_for_key(key)
  }
}

impl Drop for ScopeHandle {
  fn drop(&mut self) {
    if !self.exited {
      self.ctx.exit_leaf();
    }
  }
}

impl fmt::Debug for ScopeHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ScopeHandle")
      .field("scope", self.ctx.leaf())
      .finish_non_exhaustive()
  }
}
