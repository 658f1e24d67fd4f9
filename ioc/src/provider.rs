//! Providers: deferred, scope-aware suppliers of instances.

use crate::binding::{Args, Binding, Lifetime};
use crate::core::{downcast, InjectionKey, Instance, ResolutionGuard};
use crate::error::ResolveError;
use crate::scope::ScopeInstance;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A binding joined with the nodes of its parameters.
///
/// `slot` addresses the node's cache cell inside every scope instance.
pub(crate) struct ProviderNode {
  slot: usize,
  binding: Binding,
  params: Vec<Arc<ProviderNode>>,
}

impl ProviderNode {
  pub(crate) fn new(slot: usize, binding: Binding, params: Vec<Arc<ProviderNode>>) -> Self {
    Self {
      slot,
      binding,
      params,
    }
  }

  pub(crate) fn binding(&self) -> &Binding {
    &self.binding
  }

  #[cfg(test)]
  pub(crate) fn params(&self) -> &[Arc<ProviderNode>] {
    &self.params
  }

  /// Resolves an instance against `chain`, the open scope instances from the
  /// root outwards.
  pub(crate) fn get(&self, chain: &[Arc<ScopeInstance>]) -> Result<Instance, ResolveError> {
    let _guard = ResolutionGuard::enter(self.binding.key())?;

    match self.binding.lifetime() {
      Lifetime::Unscoped => self.construct(chain),
      Lifetime::Singleton => self.get_cached(chain, 0),
      Lifetime::Scoped(scope) => {
        let depth = chain
          .iter()
          .rposition(|instance| instance.name() == scope)
          .ok_or_else(|| ResolveError::ScopeViolation {
            key: self.binding.key().clone(),
            scope: scope.clone(),
          })?;
        self.get_cached(chain, depth)
      }
    }
  }

  fn get_cached(&self, chain: &[Arc<ScopeInstance>], depth: usize) -> Result<Instance, ResolveError> {
    // A cached instance may hold instances from any enclosing scope, so it is
    // only served while all of them are open.
    if let Some(closed) = chain[..depth].iter().find(|instance| !instance.is_open()) {
      return Err(self.violation(closed));
    }

    let owner = &chain[depth];
    owner
      .with_slots(|slots| {
        // `get_or_try_init` blocks concurrent callers until the first finishes
        // and leaves the cell empty if construction fails.
        slots[self.slot]
          .get_or_try_init(|| {
            // Parameters resolve against the owning scope so a cached instance
            // never captures anything from a shorter-lived scope.
            let instance = self.construct(&chain[..=depth])?;
            owner.record_constructed(self.slot);
            Ok(instance)
          })
          .cloned()
      })
      .ok_or_else(|| self.violation(owner))?
  }

  fn violation(&self, scope: &ScopeInstance) -> ResolveError {
    ResolveError::ScopeViolation {
      key: self.binding.key().clone(),
      scope: scope.name().clone(),
    }
  }

  fn construct(&self, chain: &[Arc<ScopeInstance>]) -> Result<Instance, ResolveError> {
    let values = self
      .params
      .iter()
      .map(|param| param.get(chain))
      .collect::<Result<Vec<_>, _>>()?;

    tracing::trace!(key = %self.binding.key(), lifetime = %self.binding.lifetime(), "constructing instance");
    let mut args = Args::new(&self.binding, values);
    self
      .binding
      .construct(&mut args)
      .map_err(|source| ResolveError::Construction {
        key: self.binding.key().clone(),
        source: Arc::from(source),
      })
  }
}

impl fmt::Debug for ProviderNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProviderNode")
      .field("slot", &self.slot)
      .field("key", self.binding.key())
      .field("lifetime", self.binding.lifetime())
      .finish_non_exhaustive()
  }
}

/// A type-erased provider bound to the scope chain it was obtained from.
#[derive(Clone)]
pub struct DynProvider {
  node: Arc<ProviderNode>,
  chain: Vec<Arc<ScopeInstance>>,
}

impl DynProvider {
  pub(crate) fn new(node: Arc<ProviderNode>, chain: Vec<Arc<ScopeInstance>>) -> Self {
    Self { node, chain }
  }

  pub fn key(&self) -> &InjectionKey {
    self.node.binding().key()
  }

  pub fn lifetime(&self) -> &Lifetime {
    self.node.binding().lifetime()
  }

  pub fn get(&self) -> Result<Instance, ResolveError> {
    self.node.get(&self.chain)
  }

  /// Narrows the provider to `T`, checking the bound type.
  pub fn typed<T: ?Sized + Any + Send + Sync>(self) -> Result<Provider<T>, ResolveError> {
    if !self.key().is_for::<T>() {
      return Err(ResolveError::TypeMismatch {
        key: self.key().clone(),
        requested: std::any::type_name::<T>(),
      });
    }
    Ok(Provider {
      inner: self,
      _target: PhantomData,
    })
  }
}

impl fmt::Debug for DynProvider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DynProvider")
      .field("node", &self.node)
      .field("scopes", &self.chain.len())
      .finish()
  }
}

/// A deferred supplier of `T` that respects its binding's lifetime: cached
/// bindings yield the same instance on every call, unscoped ones a fresh one.
pub struct Provider<T: ?Sized> {
  inner: DynProvider,
  _target: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Any + Send + Sync> Provider<T> {
  pub fn get(&self) -> Result<Arc<T>, ResolveError> {
    let instance = self.inner.get()?;
    downcast::<T>(&instance).ok_or_else(|| ResolveError::TypeMismatch {
      key: self.inner.key().clone(),
      requested: std::any::type_name::<T>(),
    })
  }

  pub fn key(&self) -> &InjectionKey {
    self.inner.key()
  }

  pub fn lifetime(&self) -> &Lifetime {
    self.inner.lifetime()
  }
}

impl<T: ?Sized> Clone for Provider<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      _target: PhantomData,
    }
  }
}

impl<T: ?Sized> fmt::Debug for Provider<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Provider").field(&self.inner).finish()
  }
}
