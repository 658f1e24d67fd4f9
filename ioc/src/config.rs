//! Container configuration loaded from YAML.

use crate::error::ConfigError;
use crate::scope::{ScopeName, ScopeSpec};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;

/// Declares the scope hierarchy and the registration policy of a container.
///
/// ```yaml
/// allow_overrides: false
/// scopes:
///   - name: activity_retained
///   - name: view_model
///     parent: activity_retained
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
  /// When set, registering a key twice replaces the earlier binding instead
  /// of failing.
  #[serde(default)]
  pub allow_overrides: bool,
  #[serde(default)]
  pub scopes: Vec<ScopeSpec>,
}

impl ContainerConfig {
  pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
    Ok(serde_yaml::from_str(source)?)
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    tracing::debug!(path = %path.display(), "loading container configuration");
    let file = File::open(path)?;
    let reader = io::BufReader::new(file);
    Ok(serde_yaml::from_reader(reader)?)
  }

  /// The screen-oriented hierarchy: `activity_retained` below the root, with
  /// `view_model` and an exclusive `activity` scope below it.
  pub fn with_standard_scopes() -> Self {
    Self {
      allow_overrides: false,
      scopes: vec![
        ScopeSpec::new(ScopeName::ACTIVITY_RETAINED),
        ScopeSpec::new(ScopeName::VIEW_MODEL).parent(ScopeName::ACTIVITY_RETAINED),
        ScopeSpec::new(ScopeName::ACTIVITY)
          .parent(ScopeName::ACTIVITY_RETAINED)
          .exclusive(true),
      ],
    }
  }

  pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(self)?)
  }
}
