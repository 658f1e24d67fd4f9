//! # Vita IoC
//!
//! A scoped, thread-safe dependency-injection container with an explicitly
//! declared binding graph.
//!
//! Every binding names its type, its lifetime, the keys of its constructor
//! parameters and a construction function. The graph is validated when it is
//! assembled, so missing bindings, dependency cycles and scope mismatches are
//! reported before anything is constructed.
//!
//! ## Core Concepts
//!
//! - **Binding**: a key plus how to build it and how long the result lives.
//! - **Lifetime**: `Singleton` (one per container), `Scoped` (one per live
//!   scope instance) or `Unscoped` (fresh on every resolution).
//! - **Container**: the assembled graph. It owns the singleton scope and
//!   resolves instances through the [`Resolver`] trait.
//! - **Scopes**: named lifetimes below the root, entered through a
//!   [`ScopeHandle`] and released when the handle exits or drops.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use vita_ioc::{Container, Resolver};
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! struct EnglishGreeter {
//!   message: Arc<String>,
//! }
//!
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     (*self.message).clone()
//!   }
//! }
//!
//! let mut builder = Container::builder();
//! builder.add_instance(String::from("Hello, World!")).unwrap();
//! builder
//!   .add_singleton_trait::<dyn Greeter, _>(|(message,): (Arc<String>,)| {
//!     Ok(Arc::new(EnglishGreeter { message }))
//!   })
//!   .unwrap();
//!
//! let container = builder.build().unwrap();
//! let greeter = container.resolve::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "Hello, World!");
//! ```

mod binding;
mod config;
mod container;
mod core;
mod error;
mod graph;
mod inject;
mod macros;
mod provider;
mod registry;
mod scope;

pub use crate::binding::{Args, Binding, BindingBuilder, Lifetime};
pub use crate::config::ContainerConfig;
pub use crate::container::{Container, GraphBuilder, Module, Resolver};
pub use crate::core::{DynError, InjectionKey, Instance};
pub use crate::error::{ConfigError, Error, GraphError, GraphErrors, ResolveError, Result, ScopeError};
pub use crate::inject::{Dependencies, Dependency, Inject, Named, Qualifier};
pub use crate::provider::{DynProvider, Provider};
pub use crate::scope::{ScopeHandle, ScopeName, ScopeSpec};
