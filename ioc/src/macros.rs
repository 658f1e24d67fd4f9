//! Public macros for declaring injectable types and resolving services.

/// Implements [`Inject`](crate::Inject) for a type from its constructor.
///
/// Parameters follow the constructor path after a `;`, each written as
/// `name: Type`; the constructor receives an `Arc<Type>` per parameter in the
/// same order. Prefix the target with `fallible` when the constructor returns
/// a `Result`.
///
/// ```
/// use std::sync::Arc;
/// use vita_ioc::{injectable, Container, Lifetime, Resolver};
///
/// struct Clock;
/// struct Scheduler {
///   clock: Arc<Clock>,
/// }
///
/// impl Scheduler {
///   fn new(clock: Arc<Clock>) -> Self {
///     Scheduler { clock }
///   }
/// }
///
/// injectable!(Scheduler => Scheduler::new; clock: Clock);
///
/// let mut builder = Container::builder();
/// builder.add_instance(Clock).unwrap();
/// builder.add_injectable::<Scheduler>(Lifetime::Singleton).unwrap();
/// let container = builder.build().unwrap();
///
/// let scheduler = container.resolve::<Scheduler>().unwrap();
/// assert!(Arc::ptr_eq(&scheduler.clock, &container.resolve::<Clock>().unwrap()));
/// ```
#[macro_export]
macro_rules! injectable {
    // Fallible constructor: injectable!(fallible Target => Target::open; a: A)
    (fallible $target:ty => $ctor:path $(; $( $name:ident : $dep:ty ),+ )? $(,)?) => {
        impl $crate::Inject for $target {
            type Deps = ( $( $( ::std::sync::Arc<$dep>, )+ )? );

            #[allow(unused_variables)]
            fn inject(deps: Self::Deps) -> ::std::result::Result<Self, $crate::DynError> {
                let ( $( $( $name, )+ )? ) = deps;
                $ctor( $( $( $name ),+ )? ).map_err(::std::convert::Into::into)
            }
        }
    };

    // Infallible constructor: injectable!(Target => Target::new; a: A, b: dyn B)
    ($target:ty => $ctor:path $(; $( $name:ident : $dep:ty ),+ )? $(,)?) => {
        impl $crate::Inject for $target {
            type Deps = ( $( $( ::std::sync::Arc<$dep>, )+ )? );

            #[allow(unused_variables)]
            fn inject(deps: Self::Deps) -> ::std::result::Result<Self, $crate::DynError> {
                let ( $( $( $name, )+ )? ) = deps;
                ::std::result::Result::Ok($ctor( $( $( $name ),+ )? ))
            }
        }
    };
}

/// Resolves a service from a [`Resolver`](crate::Resolver), returning a
/// `Result`.
///
/// ```
/// use std::sync::Arc;
/// use vita_ioc::{resolve, Container};
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// let mut builder = Container::builder();
/// builder.add_singleton_trait::<dyn Greeter, _>(|()| Ok(Arc::new(EnglishGreeter))).unwrap();
/// builder.add_instance_with_name("motd", String::from("hi")).unwrap();
/// let container = builder.build().unwrap();
///
/// assert_eq!(resolve!(container, trait Greeter).unwrap().greet(), "Hello!");
/// assert_eq!(*resolve!(container, String, "motd").unwrap(), "hi");
/// ```
#[macro_export]
macro_rules! resolve {
    // Arm for resolving a trait object: resolve!(container, trait MyTrait)
    // `:ident` captures the trait's name so `dyn` can be prepended here.
    ($resolver:expr, trait $trait_ident:ident) => {
        $crate::Resolver::resolve::<dyn $trait_ident>(&$resolver)
    };

    // Arm for resolving a named trait object: resolve!(container, trait MyTrait, "name")
    ($resolver:expr, trait $trait_ident:ident, $name:expr) => {
        $crate::Resolver::resolve_named::<dyn $trait_ident>(&$resolver, $name)
    };

    // Arm for resolving a concrete type: resolve!(container, MyService)
    ($resolver:expr, $type:ty) => {
        $crate::Resolver::resolve::<$type>(&$resolver)
    };

    // Arm for resolving a named concrete type: resolve!(container, MyService, "name")
    ($resolver:expr, $type:ty, $name:expr) => {
        $crate::Resolver::resolve_named::<$type>(&$resolver, $name)
    };
}
