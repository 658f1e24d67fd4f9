//! Error types for graph assembly, resolution, scopes and configuration.

use crate::binding::Lifetime;
use crate::core::InjectionKey;
use crate::scope::ScopeName;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Problems found while declaring or assembling the dependency graph.
#[derive(Error, Debug, Clone)]
pub enum GraphError {
  #[error("'{key}' is already bound as {existing}")]
  DuplicateBinding {
    key: InjectionKey,
    existing: Lifetime,
  },

  #[error("'{required_by}' needs '{dependency}' but it is not bound")]
  UnresolvedDependency {
    dependency: InjectionKey,
    required_by: InjectionKey,
  },

  #[error("circular dependency: {}", format_chain(.chain))]
  CyclicDependency { chain: Vec<InjectionKey> },

  #[error("'{key}' is bound as {lifetime} but depends on '{dependency}' which lives in scope '{required}'")]
  ScopeMismatch {
    key: InjectionKey,
    lifetime: Lifetime,
    dependency: InjectionKey,
    required: ScopeName,
  },

  #[error("{referenced_by} refers to undeclared scope '{scope}'")]
  UnknownScope {
    scope: ScopeName,
    referenced_by: String,
  },

  #[error("scope '{0}' is declared more than once")]
  DuplicateScope(ScopeName),

  #[error("scope '{0}' is its own ancestor")]
  CyclicScope(ScopeName),
}

/// Every problem found while assembling a graph.
#[derive(Error, Debug, Clone)]
pub struct GraphErrors {
  pub errors: Vec<GraphError>,
}

impl GraphErrors {
  pub fn iter(&self) -> std::slice::Iter<'_, GraphError> {
    self.errors.iter()
  }

  pub fn len(&self) -> usize {
    self.errors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }
}

impl fmt::Display for GraphErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut display = Vec::with_capacity(self.errors.len() + 1);
    display.push("The dependency graph had one or more errors:".to_string());
    for error in &self.errors {
      display.push(format!("- {}", error));
    }
    f.write_str(&display.join("\n"))
  }
}

impl From<GraphError> for GraphErrors {
  fn from(error: GraphError) -> Self {
    Self {
      errors: vec![error],
    }
  }
}

impl<'a> IntoIterator for &'a GraphErrors {
  type Item = &'a GraphError;
  type IntoIter = std::slice::Iter<'a, GraphError>;

  fn into_iter(self) -> Self::IntoIter {
    self.errors.iter()
  }
}

/// Failures while resolving an instance from an assembled graph.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
  #[error("no binding for '{key}'")]
  UnresolvedDependency { key: InjectionKey },

  #[error("'{key}' lives in scope '{scope}' but no open instance of that scope is active")]
  ScopeViolation { key: InjectionKey, scope: ScopeName },

  #[error("constructing '{key}' failed: {source}")]
  Construction {
    key: InjectionKey,
    #[source]
    source: Arc<dyn std::error::Error + Send + Sync + 'static>,
  },

  #[error("re-entrant resolution: {}", format_chain(.chain))]
  Reentrant { chain: Vec<InjectionKey> },

  #[error("argument {position} of '{binding}' was requested as '{requested}' which does not match its declaration")]
  ArgumentMismatch {
    binding: InjectionKey,
    position: usize,
    requested: &'static str,
  },

  #[error("'{key}' cannot be resolved as '{requested}'")]
  TypeMismatch {
    key: InjectionKey,
    requested: &'static str,
  },
}

/// Failures while entering a scope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
  #[error("scope '{0}' was never declared")]
  UnknownScope(ScopeName),

  #[error("scope '{0}' is exclusive and an instance of it is already active")]
  AlreadyActive(ScopeName),

  #[error("scope '{scope}' must be entered from an active '{parent}' scope")]
  ParentNotActive { scope: ScopeName, parent: ScopeName },

  #[error("scope '{0}' has already exited")]
  Closed(ScopeName),
}

/// Failures while loading a [`ContainerConfig`](crate::ContainerConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read configuration file: {0}")]
  Read(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  Parse(#[from] serde_yaml::Error),
}

/// The umbrella error for applications that mix assembly, scope and
/// resolution calls behind a single `?`.
#[derive(Error, Debug)]
pub enum Error {
  #[error(transparent)]
  Graph(#[from] GraphErrors),
  #[error(transparent)]
  Resolve(#[from] ResolveError),
  #[error(transparent)]
  Scope(#[from] ScopeError),
  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl From<GraphError> for Error {
  fn from(error: GraphError) -> Self {
    Error::Graph(error.into())
  }
}

/// A specialized `Result` type for `vita_ioc` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

fn format_chain(chain: &[InjectionKey]) -> String {
  chain
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(" -> ")
}
