//! Typed constructor injection.
//!
//! A type implementing [`Inject`] names its constructor parameters as a tuple
//! of [`Dependency`] values. The container derives the binding's dependency
//! keys from that tuple, so the declaration and the construction function can
//! never disagree.

use crate::binding::{Args, Binding, BindingBuilder, Lifetime};
use crate::core::{DynError, InjectionKey};
use crate::error::ResolveError;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// A type the container can build from its declared dependencies.
pub trait Inject: Any + Send + Sync + Sized {
  type Deps: Dependencies;

  /// Builds a new instance from already-resolved dependencies.
  fn inject(deps: Self::Deps) -> Result<Self, DynError>;
}

/// A single constructor parameter.
pub trait Dependency: Sized {
  fn key() -> InjectionKey;
  fn take(args: &mut Args<'_>) -> Result<Self, ResolveError>;
}

impl<T: ?Sized + Any + Send + Sync> Dependency for Arc<T> {
  fn key() -> InjectionKey {
    InjectionKey::of::<T>()
  }

  fn take(args: &mut Args<'_>) -> Result<Self, ResolveError> {
    args.next::<T>()
  }
}

/// Marks a qualifier, the name that distinguishes two bindings of the same type.
///
/// ```
/// use vita_ioc::Qualifier;
///
/// struct ApplicationContext;
/// impl Qualifier for ApplicationContext {
///   const NAME: &'static str = "application_context";
/// }
/// ```
pub trait Qualifier: 'static {
  const NAME: &'static str;
}

/// A dependency on the binding of `T` qualified by `Q`.
pub struct Named<T: ?Sized, Q: Qualifier> {
  inner: Arc<T>,
  _qualifier: PhantomData<fn() -> Q>,
}

impl<T: ?Sized, Q: Qualifier> Named<T, Q> {
  pub fn into_inner(self) -> Arc<T> {
    self.inner
  }
}

impl<T: ?Sized, Q: Qualifier> Clone for Named<T, Q> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      _qualifier: PhantomData,
    }
  }
}

impl<T: ?Sized, Q: Qualifier> Deref for Named<T, Q> {
  type Target = T;

  fn deref(&self) -> &T {
    &self.inner
  }
}

impl<T: ?Sized + fmt::Debug, Q: Qualifier> fmt::Debug for Named<T, Q> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Named").field(&Q::NAME).field(&&*self.inner).finish()
  }
}

impl<T: ?Sized + Any + Send + Sync, Q: Qualifier> Dependency for Named<T, Q> {
  fn key() -> InjectionKey {
    InjectionKey::named::<T>(Q::NAME)
  }

  fn take(args: &mut Args<'_>) -> Result<Self, ResolveError> {
    Ok(Self {
      inner: args.next::<T>()?,
      _qualifier: PhantomData,
    })
  }
}

/// An ordered list of constructor parameters.
pub trait Dependencies: Sized {
  fn keys() -> Vec<InjectionKey>;
  fn take(args: &mut Args<'_>) -> Result<Self, ResolveError>;
}

macro_rules! impl_dependencies {
  ($($dep:ident),*) => {
    impl<$($dep: Dependency),*> Dependencies for ($($dep,)*) {
      fn keys() -> Vec<InjectionKey> {
        vec![$($dep::key()),*]
      }

      #[allow(unused_variables)]
      fn take(args: &mut Args<'_>) -> Result<Self, ResolveError> {
        Ok(($($dep::take(args)?,)*))
      }
    }
  };
}

impl_dependencies!();
impl_dependencies!(A);
impl_dependencies!(A, B);
impl_dependencies!(A, B, C);
impl_dependencies!(A, B, C, D);
impl_dependencies!(A, B, C, D, E);
impl_dependencies!(A, B, C, D, E, F);
impl_dependencies!(A, B, C, D, E, F, G);
impl_dependencies!(A, B, C, D, E, F, G, H);

/// Declares a binding for `T` whose dependencies come from the tuple `D`.
pub(crate) fn typed_binding<T, D>(
  builder: BindingBuilder<T>,
  factory: impl Fn(D) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
) -> Binding
where
  T: ?Sized + Any + Send + Sync,
  D: Dependencies,
{
  let builder = D::keys()
    .into_iter()
    .fold(builder, |builder, key| builder.depends_on_key(key));
  builder.to_arc(move |args| factory(D::take(args)?))
}

impl Binding {
  /// The binding for an [`Inject`] type.
  pub fn injectable<T: Inject>(lifetime: Lifetime) -> Binding {
    typed_binding(BindingBuilder::<T>::new(lifetime), |deps: T::Deps| {
      T::inject(deps).map(Arc::new)
    })
  }
}
