//! Binding declarations: what to build, how long it lives, and what it needs.

use crate::core::{downcast, erase, DynError, InjectionKey, Instance};
use crate::error::ResolveError;
use crate::scope::{ScopeName, ROOT_SCOPE};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// How long a constructed instance is reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lifetime {
  /// A fresh instance on every resolution.
  Unscoped,
  /// One instance for the lifetime of the container.
  Singleton,
  /// One instance per live instance of the named scope.
  Scoped(ScopeName),
}

impl Lifetime {
  pub fn scoped(name: impl Into<ScopeName>) -> Self {
    Lifetime::Scoped(name.into())
  }

  /// The scope whose instance owns the cache cell, if the binding is cached.
  pub fn cache_scope(&self) -> Option<&ScopeName> {
    match self {
      Lifetime::Unscoped => None,
      Lifetime::Singleton => Some(&ROOT_SCOPE),
      Lifetime::Scoped(name) => Some(name),
    }
  }
}

impl fmt::Display for Lifetime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Lifetime::Unscoped => f.write_str("unscoped"),
      Lifetime::Singleton => f.write_str("singleton"),
      Lifetime::Scoped(name) => write!(f, "scoped to '{}'", name),
    }
  }
}

pub(crate) type ConstructFn = Arc<dyn Fn(&mut Args<'_>) -> Result<Instance, DynError> + Send + Sync>;
pub(crate) type ReleaseFn = Arc<dyn Fn(&Instance) + Send + Sync>;

// Gives closures an expected signature so they are inferred as higher-ranked.
pub(crate) fn construct_fn<F>(f: F) -> ConstructFn
where
  F: Fn(&mut Args<'_>) -> Result<Instance, DynError> + Send + Sync + 'static,
{
  Arc::new(f)
}

fn release_fn<F>(f: F) -> ReleaseFn
where
  F: Fn(&Instance) + Send + Sync + 'static,
{
  Arc::new(f)
}

/// A declared rule mapping a key to how its instances are built and cached.
#[derive(Clone)]
pub struct Binding {
  key: InjectionKey,
  lifetime: Lifetime,
  dependencies: Vec<InjectionKey>,
  construct: ConstructFn,
  release: Option<ReleaseFn>,
}

impl Binding {
  /// Starts declaring a binding for `T`.
  pub fn builder<T: ?Sized + Any + Send + Sync>(lifetime: Lifetime) -> BindingBuilder<T> {
    BindingBuilder::new(lifetime)
  }

  /// A singleton binding that always yields `value`.
  pub fn instance<T: Any + Send + Sync>(value: T) -> Binding {
    Self::shared(InjectionKey::of::<T>(), Arc::new(value))
  }

  /// A qualified singleton binding that always yields `value`.
  pub fn named_instance<T: Any + Send + Sync>(name: impl Into<Cow<'static, str>>, value: T) -> Binding {
    Self::shared(InjectionKey::named::<T>(name), Arc::new(value))
  }

  fn shared<T: ?Sized + Any + Send + Sync>(key: InjectionKey, value: Arc<T>) -> Binding {
    Binding {
      key,
      lifetime: Lifetime::Singleton,
      dependencies: Vec::new(),
      construct: construct_fn(move |_| Ok(erase(value.clone()))),
      release: None,
    }
  }

  pub fn key(&self) -> &InjectionKey {
    &self.key
  }

  pub fn lifetime(&self) -> &Lifetime {
    &self.lifetime
  }

  pub fn dependencies(&self) -> &[InjectionKey] {
    &self.dependencies
  }

  pub(crate) fn construct(&self, args: &mut Args<'_>) -> Result<Instance, DynError> {
    (self.construct)(args)
  }

  pub(crate) fn release_hook(&self) -> Option<&ReleaseFn> {
    self.release.as_ref()
  }
}

impl fmt::Debug for Binding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Binding")
      .field("key", &self.key)
      .field("lifetime", &self.lifetime)
      .field("dependencies", &self.dependencies)
      .field("has_release_hook", &self.release.is_some())
      .finish_non_exhaustive()
  }
}

/// Builds a [`Binding`] for `T` from an explicit dependency list and factory.
///
/// ```
/// use std::sync::Arc;
/// use vita_ioc::{Binding, Lifetime};
///
/// struct Port(u16);
/// struct Endpoint(String);
///
/// let binding = Binding::builder::<Endpoint>(Lifetime::Unscoped)
///   .depends_on::<Port>()
///   .to(|args| {
///     let port: Arc<Port> = args.next()?;
///     Ok(Endpoint(format!("localhost:{}", port.0)))
///   });
/// assert_eq!(binding.dependencies().len(), 1);
/// ```
pub struct BindingBuilder<T: ?Sized> {
  key: InjectionKey,
  lifetime: Lifetime,
  dependencies: Vec<InjectionKey>,
  release: Option<ReleaseFn>,
  _target: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Any + Send + Sync> BindingBuilder<T> {
  pub fn new(lifetime: Lifetime) -> Self {
    Self {
      key: InjectionKey::of::<T>(),
      lifetime,
      dependencies: Vec::new(),
      release: None,
      _target: PhantomData,
    }
  }

  /// Qualifies the bound key with `name`.
  pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
    self.key = InjectionKey::named::<T>(name);
    self
  }

  pub fn depends_on<D: ?Sized + Any>(self) -> Self {
    self.depends_on_key(InjectionKey::of::<D>())
  }

  pub fn depends_on_named<D: ?Sized + Any>(self, name: impl Into<Cow<'static, str>>) -> Self {
    self.depends_on_key(InjectionKey::named::<D>(name))
  }

  pub fn depends_on_key(mut self, key: InjectionKey) -> Self {
    self.dependencies.push(key);
    self
  }

  /// Runs `hook` on the cached instance when its scope is released.
  pub fn on_release(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
    self.release = Some(release_fn(move |instance| {
      if let Some(value) = downcast::<T>(instance) {
        hook(&value);
      }
    }));
    self
  }

  /// Finishes the binding with a factory producing an `Arc<T>`, which is
  /// how unsized targets such as `dyn Trait` are bound.
  pub fn to_arc(
    self,
    factory: impl Fn(&mut Args<'_>) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
  ) -> Binding {
    Binding {
      key: self.key,
      lifetime: self.lifetime,
      dependencies: self.dependencies,
      construct: construct_fn(move |args| factory(args).map(erase)),
      release: self.release,
    }
  }
}

impl<T: Any + Send + Sync> BindingBuilder<T> {
  /// Finishes the binding with a factory producing a `T`.
  pub fn to(
    self,
    factory: impl Fn(&mut Args<'_>) -> Result<T, DynError> + Send + Sync + 'static,
  ) -> Binding {
    self.to_arc(move |args| factory(args).map(Arc::new))
  }
}

/// The resolved parameters handed to a construction function, in declaration order.
pub struct Args<'a> {
  binding: &'a InjectionKey,
  declared: &'a [InjectionKey],
  values: std::vec::IntoIter<Instance>,
  position: usize,
}

impl<'a> Args<'a> {
  pub(crate) fn new(binding: &'a Binding, values: Vec<Instance>) -> Self {
    Self {
      binding: &binding.key,
      declared: &binding.dependencies,
      values: values.into_iter(),
      position: 0,
    }
  }

  /// Takes the next parameter, which must have been declared as a `D`.
  pub fn next<D: ?Sized + Any + Send + Sync>(&mut self) -> Result<Arc<D>, ResolveError> {
    let position = self.position;
    let mismatch = || ResolveError::ArgumentMismatch {
      binding: self.binding.clone(),
      position,
      requested: std::any::type_name::<D>(),
    };

    match self.declared.get(position) {
      Some(key) if key.is_for::<D>() => {}
      _ => return Err(mismatch()),
    }
    let value = self.values.next().ok_or_else(mismatch)?;
    self.position += 1;
    downcast::<D>(&value).ok_or_else(mismatch)
  }

  /// The key of the next parameter, if any remain.
  pub fn peek_key(&self) -> Option<&InjectionKey> {
    self.declared.get(self.position)
  }

  pub fn remaining(&self) -> usize {
    self.declared.len().saturating_sub(self.position)
  }
}
