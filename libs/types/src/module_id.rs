//! Module identifiers
//!
//! Modules are addressed by the key they have in the configuration file.
//! Lookups ignore case, display keeps the configured spelling.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Case-insensitive module identifier
#[derive(Debug, Clone)]
pub struct ModuleId {
    name: String,
    key: String,
}

impl ModuleId {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.to_lowercase();
        Self { name, key }
    }

    /// Name as written in the configuration
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized lookup key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for ModuleId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ModuleId {}

impl Hash for ModuleId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for ModuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for ModuleId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_ignores_case() {
        let mut registry = HashMap::new();
        registry.insert(ModuleId::new("GPO"), 1);

        assert_eq!(registry.get(&ModuleId::new("gpo")), Some(&1));
        assert_eq!(registry.get(&ModuleId::new("Gpo")), Some(&1));
        assert_eq!(registry.get(&ModuleId::new("GPI")), None);
    }

    #[test]
    fn test_display_keeps_configured_name() {
        let id = ModuleId::new("HttpClient");
        assert_eq!(id.to_string(), "HttpClient");
        assert_eq!(id.key(), "httpclient");
    }
}
