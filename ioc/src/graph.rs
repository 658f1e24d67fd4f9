//! Assembles declared bindings into a validated graph of provider nodes.

use crate::binding::Lifetime;
use crate::core::InjectionKey;
use crate::error::{GraphError, GraphErrors};
use crate::provider::ProviderNode;
use crate::registry::Registry;
use crate::scope::{ScopeName, ScopeTree};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// The assembled, acyclic dependency graph.
pub(crate) struct Graph {
  nodes: HashMap<InjectionKey, Arc<ProviderNode>>,
  by_slot: Vec<Arc<ProviderNode>>,
}

impl Graph {
  pub(crate) fn node(&self, key: &InjectionKey) -> Option<&Arc<ProviderNode>> {
    self.nodes.get(key)
  }

  pub(crate) fn node_at(&self, slot: usize) -> Option<&Arc<ProviderNode>> {
    self.by_slot.get(slot)
  }

  pub(crate) fn slot_count(&self) -> usize {
    self.by_slot.len()
  }

  /// Nodes in construction-safe order: every node follows its dependencies.
  pub(crate) fn nodes(&self) -> impl Iterator<Item = &Arc<ProviderNode>> {
    self.by_slot.iter()
  }
}

// The scopes a binding needs open to be resolved, each mapped to the
// scoped binding that introduced the requirement.
type Requirements = BTreeMap<ScopeName, InjectionKey>;

#[derive(Clone)]
struct Assembled {
  node: Arc<ProviderNode>,
  requires: Requirements,
}

struct Assembler<'a> {
  registry: &'a Registry,
  scopes: &'a ScopeTree,
  done: HashMap<InjectionKey, Assembled>,
  failed: HashSet<InjectionKey>,
  // Keys whose dependencies are being resolved, outermost first.
  path: Vec<InjectionKey>,
  by_slot: Vec<Arc<ProviderNode>>,
  errors: Vec<GraphError>,
}

/// Validates every binding and builds one provider node per key.
///
/// All problems are collected before failing. No construction function runs.
pub(crate) fn assemble(registry: &Registry, scopes: &ScopeTree) -> Result<Graph, GraphErrors> {
  tracing::debug!(
    bindings = registry.len(),
    scopes = scopes.len(),
    "assembling dependency graph"
  );

  let mut assembler = Assembler {
    registry,
    scopes,
    done: HashMap::with_capacity(registry.len()),
    failed: HashSet::new(),
    path: Vec::new(),
    by_slot: Vec::with_capacity(registry.len()),
    errors: scopes.validate(),
  };

  for key in registry.sorted_keys() {
    assembler.visit(key);
  }

  if !assembler.errors.is_empty() {
    for error in &assembler.errors {
      tracing::warn!(%error, "invalid dependency graph");
    }
    return Err(GraphErrors {
      errors: assembler.errors,
    });
  }

  let nodes = assembler
    .done
    .into_iter()
    .map(|(key, assembled)| (key, assembled.node))
    .collect();

  Ok(Graph {
    nodes,
    by_slot: assembler.by_slot,
  })
}

impl Assembler<'_> {
  fn visit(&mut self, key: &InjectionKey) -> Option<Assembled> {
    if let Some(assembled) = self.done.get(key) {
      return Some(assembled.clone());
    }
    if self.failed.contains(key) {
      return None;
    }
    if let Some(pos) = self.path.iter().position(|k| k == key) {
      let mut chain = self.path[pos..].to_vec();
      chain.push(key.clone());
      self.errors.push(GraphError::CyclicDependency { chain });
      return None;
    }
    let registry = self.registry;
    let binding = registry.get(key)?;

    if let Lifetime::Scoped(scope) = binding.lifetime() {
      if !self.scopes.contains(scope) {
        self.errors.push(GraphError::UnknownScope {
          scope: scope.clone(),
          referenced_by: format!("binding '{}'", key),
        });
        self.failed.insert(key.clone());
        return None;
      }
    }

    self.path.push(key.clone());
    let mut params = Vec::with_capacity(binding.dependencies().len());
    let mut requires = Requirements::new();
    let mut complete = true;
    for dependency in binding.dependencies() {
      if !self.registry.contains(dependency) {
        self.errors.push(GraphError::UnresolvedDependency {
          dependency: dependency.clone(),
          required_by: key.clone(),
        });
        complete = false;
        continue;
      }
      match self.visit(dependency) {
        Some(assembled) => {
          params.push(assembled.node);
          for (scope, origin) in assembled.requires {
            requires.entry(scope).or_insert(origin);
          }
        }
        None => complete = false,
      }
    }
    self.path.pop();

    if complete {
      complete = self.check_scopes(key, binding.lifetime(), &mut requires);
    }
    if !complete {
      self.failed.insert(key.clone());
      return None;
    }

    let node = Arc::new(ProviderNode::new(self.by_slot.len(), binding.clone(), params));
    self.by_slot.push(node.clone());
    let assembled = Assembled { node, requires };
    self.done.insert(key.clone(), assembled.clone());
    Some(assembled)
  }

  /// Checks that every scope the dependencies need is open whenever this
  /// binding can be resolved, then records the binding's own requirement.
  fn check_scopes(&mut self, key: &InjectionKey, lifetime: &Lifetime, requires: &mut Requirements) -> bool {
    let before = self.errors.len();
    match lifetime {
      Lifetime::Singleton => {
        for (scope, origin) in requires.iter() {
          self.errors.push(GraphError::ScopeMismatch {
            key: key.clone(),
            lifetime: lifetime.clone(),
            dependency: origin.clone(),
            required: scope.clone(),
          });
        }
      }
      Lifetime::Scoped(own) => {
        for (scope, origin) in requires.iter() {
          if !self.scopes.is_ancestor_or_self(scope, own) {
            self.errors.push(GraphError::ScopeMismatch {
              key: key.clone(),
              lifetime: lifetime.clone(),
              dependency: origin.clone(),
              required: scope.clone(),
            });
          }
        }
        if !own.is_root() {
          requires.insert(own.clone(), key.clone());
        }
      }
      Lifetime::Unscoped => {
        // Every required scope must sit on one ancestor chain, otherwise no
        // single context can have them all open.
        let scopes: Vec<(&ScopeName, &InjectionKey)> = requires.iter().collect();
        for (i, (a, _)) in scopes.iter().enumerate() {
          for (b, origin) in scopes.iter().skip(i + 1) {
            if !self.scopes.is_ancestor_or_self(a, b) && !self.scopes.is_ancestor_or_self(b, a) {
              self.errors.push(GraphError::ScopeMismatch {
                key: key.clone(),
                lifetime: lifetime.clone(),
                dependency: (*origin).clone(),
                required: (*b).clone(),
              });
            }
          }
        }
      }
    }
    self.errors.len() == before
  }
}
