//! Named configuration variables.
//!
//! Variables are addressed by `(group, variable)`. The environment provider
//! maps that pair to `{GROUP}_{VARIABLE}`; providers compose via `MergeProvider`,
//! where the first provider holding a variable wins.

use std::collections::HashMap;

/// Error type for variable lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VariableError {
    #[error("variable not found: {group}_{variable}")]
    NotFound { group: String, variable: String },
}

/// Resolves configuration values by group and name.
pub trait VariableProvider: Send + Sync {
    /// The value, or `None` if this provider does not have it.
    fn get(&self, group: &str, variable: &str) -> Option<String>;

    /// Fails on the first variable this provider cannot resolve.
    fn ensure(&self, group: &str, variables: &[&str]) -> Result<(), VariableError> {
        for variable in variables {
            if self.get(group, variable).is_none() {
                return Err(not_found(group, variable));
            }
        }
        Ok(())
    }
}

fn not_found(group: &str, variable: &str) -> VariableError {
    VariableError::NotFound {
        group: group.to_string(),
        variable: variable.to_string(),
    }
}

/// Reads process environment variables named `{GROUP}_{VARIABLE}`.
///
/// An empty value counts as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentProvider;

impl EnvironmentProvider {
    pub fn new() -> Self {
        Self
    }
}

impl VariableProvider for EnvironmentProvider {
    fn get(&self, group: &str, variable: &str) -> Option<String> {
        std::env::var(format!("{}_{}", group, variable))
            .ok()
            .filter(|value| !value.is_empty())
    }
}

/// Key of a `MapProvider` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableKey {
    pub group: String,
    pub variable: String,
}

impl VariableKey {
    pub fn new(group: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            variable: variable.into(),
        }
    }
}

/// Fixed in-memory variables.
#[derive(Debug, Clone, Default)]
pub struct MapProvider {
    values: HashMap<VariableKey, String>,
}

impl MapProvider {
    pub fn new(values: HashMap<VariableKey, String>) -> Self {
        Self { values }
    }
}

impl VariableProvider for MapProvider {
    fn get(&self, group: &str, variable: &str) -> Option<String> {
        self.values.get(&VariableKey::new(group, variable)).cloned()
    }
}

/// Chains providers; each variable resolves from the first provider that has it.
#[derive(Default)]
pub struct MergeProvider {
    providers: Vec<Box<dyn VariableProvider>>,
}

impl MergeProvider {
    pub fn new(providers: Vec<Box<dyn VariableProvider>>) -> Self {
        Self { providers }
    }

    /// Append a lower-priority provider.
    pub fn with(mut self, provider: impl VariableProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl VariableProvider for MergeProvider {
    fn get(&self, group: &str, variable: &str) -> Option<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.get(group, variable))
    }

    fn ensure(&self, group: &str, variables: &[&str]) -> Result<(), VariableError> {
        for variable in variables {
            let found = self
                .providers
                .iter()
                .any(|provider| provider.ensure(group, &[*variable]).is_ok());
            if !found {
                return Err(not_found(group, variable));
            }
        }
        Ok(())
    }
}
