//! The `Container`, its `GraphBuilder` and the `Resolver` trait.

use crate::binding::{Binding, BindingBuilder, Lifetime};
use crate::config::ContainerConfig;
use crate::core::{downcast, DynError, InjectionKey, Instance};
use crate::error::{GraphError, GraphErrors, ResolveError, ScopeError};
use crate::graph::{assemble, Graph};
use crate::inject::{typed_binding, Dependencies, Inject};
use crate::provider::{DynProvider, Provider};
use crate::registry::Registry;
use crate::scope::{ScopeHandle, ScopeInstance, ScopeName, ScopeSpec, ScopeTree};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Resolution shared by the [`Container`] and every [`ScopeHandle`].
pub trait Resolver {
  /// Looks up the provider bound to `key` in this resolution context.
  fn provider_for_key(&self, key: &InjectionKey) -> Result<DynProvider, ResolveError>;

  /// Resolves the instance bound to `key`.
  fn resolve_key(&self, key: &InjectionKey) -> Result<Instance, ResolveError> {
    self.provider_for_key(key)?.get()
  }

  /// Resolves the unqualified binding of `T`.
  fn resolve<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError>
  where
    Self: Sized,
  {
    self.resolve_as(&InjectionKey::of::<T>())
  }

  /// Resolves the binding of `T` qualified by `name`.
  fn resolve_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ResolveError>
  where
    Self: Sized,
  {
    self.resolve_as(&InjectionKey::named::<T>(name.to_owned()))
  }

  /// Resolves `key` and downcasts the instance to `T`.
  fn resolve_as<T: ?Sized + Any + Send + Sync>(&self, key: &InjectionKey) -> Result<Arc<T>, ResolveError>
  where
    Self: Sized,
  {
    let instance = self.resolve_key(key)?;
    downcast::<T>(&instance).ok_or_else(|| ResolveError::TypeMismatch {
      key: key.clone(),
      requested: std::any::type_name::<T>(),
    })
  }

  /// A reusable provider for the unqualified binding of `T`.
  fn provider<T: ?Sized + Any + Send + Sync>(&self) -> Result<Provider<T>, ResolveError>
  where
    Self: Sized,
  {
    self.provider_for_key(&InjectionKey::of::<T>())?.typed()
  }
}

/// State shared by a container and every scope entered from it.
pub(crate) struct Shared {
  graph: Graph,
  scopes: ScopeTree,
  // Live instance count per exclusive scope.
  active: DashMap<ScopeName, usize>,
}

/// A resolution context: the shared graph plus the open scope instances from
/// the root outwards.
#[derive(Clone)]
pub(crate) struct Context {
  shared: Arc<Shared>,
  chain: Vec<Arc<ScopeInstance>>,
}

impl Context {
  pub(crate) fn leaf(&self) -> &Arc<ScopeInstance> {
    // The root instance is always present.
    &self.chain[self.chain.len() - 1]
  }

  pub(crate) fn provider_for_key(&self, key: &InjectionKey) -> Result<DynProvider, ResolveError> {
    let node = self
      .shared
      .graph
      .node(key)
      .ok_or_else(|| ResolveError::UnresolvedDependency { key: key.clone() })?;
    Ok(DynProvider::new(node.clone(), self.chain.clone()))
  }

  pub(crate) fn enter(&self, name: ScopeName) -> Result<ScopeHandle, ScopeError> {
    let spec = self
      .shared
      .scopes
      .get(&name)
      .ok_or_else(|| ScopeError::UnknownScope(name.clone()))?;

    let parent = spec.parent_name();
    let depth = self
      .chain
      .iter()
      .rposition(|instance| instance.name() == parent)
      .ok_or_else(|| ScopeError::ParentNotActive {
        scope: name.clone(),
        parent: parent.clone(),
      })?;
    if !self.chain[depth].is_open() {
      return Err(ScopeError::Closed(parent.clone()));
    }

    if spec.exclusive {
      match self.shared.active.entry(name.clone()) {
        Entry::Occupied(mut live) => {
          if *live.get() > 0 {
            return Err(ScopeError::AlreadyActive(name));
          }
          *live.get_mut() = 1;
        }
        Entry::Vacant(slot) => {
          slot.insert(1);
        }
      }
    }

    let instance = Arc::new(ScopeInstance::new(name, self.shared.graph.slot_count()));
    tracing::debug!(scope = %instance.name(), id = instance.id(), "entered scope");

    let mut chain = self.chain[..=depth].to_vec();
    chain.push(instance);
    Ok(ScopeHandle::new(Context {
      shared: self.shared.clone(),
      chain,
    }))
  }

  /// Releases the innermost scope instance.
  pub(crate) fn exit_leaf(&self) -> usize {
    let leaf = self.leaf();
    if !leaf.is_open() {
      return 0;
    }
    let released = leaf.release(&self.shared.graph);

    let exclusive = self
      .shared
      .scopes
      .get(leaf.name())
      .is_some_and(|spec| spec.exclusive);
    if exclusive {
      if let Some(mut live) = self.shared.active.get_mut(leaf.name()) {
        *live = live.saturating_sub(1);
      }
    }

    tracing::debug!(scope = %leaf.name(), id = leaf.id(), released, "exited scope");
    released
  }
}

/// A group of bindings installed together.
pub trait Module {
  fn configure(&self, builder: &mut GraphBuilder) -> Result<(), GraphError>;
}

/// Collects bindings and scope declarations, then assembles them into a
/// [`Container`].
#[derive(Default)]
pub struct GraphBuilder {
  registry: Registry,
  scopes: ScopeTree,
}

impl GraphBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// A builder with the scopes and override policy of `config`.
  pub fn from_config(config: &ContainerConfig) -> Result<Self, GraphError> {
    let mut builder = Self::new();
    builder.registry.set_allow_overrides(config.allow_overrides);
    for spec in &config.scopes {
      builder.declare_scope(spec.clone())?;
    }
    Ok(builder)
  }

  pub fn declare_scope(&mut self, spec: ScopeSpec) -> Result<&mut Self, GraphError> {
    self.scopes.declare(spec)?;
    Ok(self)
  }

  /// Registers a binding. Fails if its key is already bound, unless
  /// overrides were allowed.
  pub fn register(&mut self, binding: Binding) -> Result<&mut Self, GraphError> {
    self.registry.register(binding)?;
    Ok(self)
  }

  // --- Instance Registration ---
  pub fn add_instance<T: Any + Send + Sync>(&mut self, instance: T) -> Result<&mut Self, GraphError> {
    self.register(Binding::instance(instance))
  }

  pub fn add_instance_with_name<T: Any + Send + Sync>(
    &mut self,
    name: impl Into<Cow<'static, str>>,
    instance: T,
  ) -> Result<&mut Self, GraphError> {
    self.register(Binding::named_instance(name, instance))
  }

  // --- Factory Registration ---
  pub fn add_singleton<T, D>(
    &mut self,
    factory: impl Fn(D) -> Result<T, DynError> + Send + Sync + 'static,
  ) -> Result<&mut Self, GraphError>
  where
    T: Any + Send + Sync,
    D: Dependencies,
  {
    self.add_typed(Lifetime::Singleton, factory)
  }

  pub fn add_transient<T, D>(
    &mut self,
    factory: impl Fn(D) -> Result<T, DynError> + Send + Sync + 'static,
  ) -> Result<&mut Self, GraphError>
  where
    T: Any + Send + Sync,
    D: Dependencies,
  {
    self.add_typed(Lifetime::Unscoped, factory)
  }

  pub fn add_scoped<T, D>(
    &mut self,
    scope: impl Into<ScopeName>,
    factory: impl Fn(D) -> Result<T, DynError> + Send + Sync + 'static,
  ) -> Result<&mut Self, GraphError>
  where
    T: Any + Send + Sync,
    D: Dependencies,
  {
    self.add_typed(Lifetime::Scoped(scope.into()), factory)
  }

  // --- Trait Registration ---
  pub fn add_singleton_trait<I, D>(
    &mut self,
    factory: impl Fn(D) -> Result<Arc<I>, DynError> + Send + Sync + 'static,
  ) -> Result<&mut Self, GraphError>
  where
    I: ?Sized + Any + Send + Sync,
    D: Dependencies,
  {
    self.register(typed_binding(BindingBuilder::<I>::new(Lifetime::Singleton), factory))
  }

  /// Registers an [`Inject`] type with the given lifetime.
  pub fn add_injectable<T: Inject>(&mut self, lifetime: Lifetime) -> Result<&mut Self, GraphError> {
    self.register(Binding::injectable::<T>(lifetime))
  }

  pub fn install<M: Module + ?Sized>(&mut self, module: &M) -> Result<&mut Self, GraphError> {
    module.configure(self)?;
    Ok(self)
  }

  fn add_typed<T, D>(
    &mut self,
    lifetime: Lifetime,
    factory: impl Fn(D) -> Result<T, DynError> + Send + Sync + 'static,
  ) -> Result<&mut Self, GraphError>
  where
    T: Any + Send + Sync,
    D: Dependencies,
  {
    let binding = typed_binding(BindingBuilder::<T>::new(lifetime), move |deps| {
      factory(deps).map(Arc::new)
    });
    self.register(binding)
  }

  /// Validates the declarations and assembles the container.
  ///
  /// Every missing binding, cycle and scope mismatch is reported together.
  pub fn build(self) -> Result<Container, GraphErrors> {
    let graph = assemble(&self.registry, &self.scopes)?;
    let root = Arc::new(ScopeInstance::new(ScopeName::SINGLETON, graph.slot_count()));
    tracing::debug!(bindings = graph.slot_count(), "container assembled");

    Ok(Container {
      ctx: Context {
        shared: Arc::new(Shared {
          graph,
          scopes: self.scopes,
          active: DashMap::new(),
        }),
        chain: vec![root],
      },
    })
  }
}

impl fmt::Debug for GraphBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("GraphBuilder")
      .field("bindings", &self.registry.len())
      .field("scopes", &self.scopes.len())
      .finish()
  }
}

/// The assembled dependency-injection container.
///
/// It owns the singleton scope. Cloning is cheap and clones share the
/// same singletons.
#[derive(Clone)]
pub struct Container {
  ctx: Context,
}

impl Container {
  pub fn builder() -> GraphBuilder {
    GraphBuilder::new()
  }

  /// Enters a scope whose parent is the root singleton scope.
  pub fn enter_scope(&self, name: impl Into<ScopeName>) -> Result<ScopeHandle, ScopeError> {
    self.ctx.enter(name.into())
  }

  pub fn binding_count(&self) -> usize {
    self.ctx.shared.graph.slot_count()
  }

  /// Every bound key, dependencies before their dependents.
  pub fn keys(&self) -> impl Iterator<Item = &InjectionKey> {
    self.ctx.shared.graph.nodes().map(|node| node.binding().key())
  }

  /// The qualifier names bound for `T`, sorted.
  pub fn names_for<T: ?Sized + Any>(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self
      .keys()
      .filter(|key| key.is_for::<T>())
      .filter_map(InjectionKey::name)
      .collect();
    names.sort_unstable();
    names
  }

  /// Eagerly constructs every singleton, stopping at the first failure.
  ///
  /// Returns the number of singletons now cached.
  pub fn warm_up(&self) -> Result<usize, ResolveError> {
    let mut warmed = 0;
    for node in self.ctx.shared.graph.nodes() {
      if *node.binding().lifetime() == Lifetime::Singleton {
        node.get(&self.ctx.chain)?;
        warmed += 1;
      }
    }
    tracing::debug!(singletons = warmed, "container warmed up");
    Ok(warmed)
  }

  /// Releases every cached singleton, running release hooks newest first.
  ///
  /// Resolving a singleton afterwards fails with a scope violation.
  pub fn shutdown(&self) -> usize {
    self.ctx.exit_leaf()
  }
}

impl Resolver for Container {
  fn provider_for_key(&self, key: &InjectionKey) -> Result<DynProvider, ResolveError> {
    self.ctx.provider_for_key(key)
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("bindings", &self.binding_count())
      .field("scopes", &self.ctx.shared.scopes.len())
      .finish()
  }
}
