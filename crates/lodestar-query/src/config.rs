//! Naming conventions used when assembling proxies into Cypher.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```toml
//! result_variable = "row"
//! synthetic_prefix = "m"
//! ```

use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Variable naming and logging options shared by every proxy in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Node variable for a proxy that was not given one explicitly
    #[serde(default = "default_result_variable")]
    pub result_variable: String,

    /// Prefix for the variable a parent proxy is assembled under (`node2`)
    #[serde(default = "default_node_chain_prefix")]
    pub node_chain_prefix: String,

    /// Prefix for default relationship variables (`rel1`)
    #[serde(default = "default_rel_chain_prefix")]
    pub rel_chain_prefix: String,

    /// Prefix for variables introduced by association filters (`n1`, `n2`)
    #[serde(default = "default_synthetic_prefix")]
    pub synthetic_prefix: String,

    /// Emit a warning when a specialised resolver falls back to passthrough
    #[serde(default = "default_true")]
    pub log_resolver_fallbacks: bool,
}

fn default_result_variable() -> String {
    "result".to_string()
}

fn default_node_chain_prefix() -> String {
    "node".to_string()
}

fn default_rel_chain_prefix() -> String {
    "rel".to_string()
}

fn default_synthetic_prefix() -> String {
    "n".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            result_variable: default_result_variable(),
            node_chain_prefix: default_node_chain_prefix(),
            rel_chain_prefix: default_rel_chain_prefix(),
            synthetic_prefix: default_synthetic_prefix(),
            log_resolver_fallbacks: true,
        }
    }
}

impl QueryConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| QueryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Check that every name is an identifier and that generated variables
    /// from different sources can never coincide.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("result_variable", &self.result_variable),
            ("node_chain_prefix", &self.node_chain_prefix),
            ("rel_chain_prefix", &self.rel_chain_prefix),
            ("synthetic_prefix", &self.synthetic_prefix),
        ];
        for (key, value) in names {
            let valid = value
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(QueryError::Config(format!(
                    "{} must be a plain identifier, got {:?}",
                    key, value
                )));
            }
        }

        let prefixes = [
            ("node_chain_prefix", &self.node_chain_prefix),
            ("rel_chain_prefix", &self.rel_chain_prefix),
            ("synthetic_prefix", &self.synthetic_prefix),
        ];
        for (i, (key_a, a)) in prefixes.iter().enumerate() {
            for (key_b, b) in &prefixes[i + 1..] {
                if prefixes_clash(a, b) {
                    return Err(QueryError::Config(format!(
                        "{} {:?} and {} {:?} can generate the same variable",
                        key_a, a, key_b, b
                    )));
                }
            }
            if is_numbered(&self.result_variable, a) {
                return Err(QueryError::Config(format!(
                    "result_variable {:?} can be generated from {} {:?}",
                    self.result_variable, key_a, a
                )));
            }
        }
        Ok(())
    }
}

/// `name` is `prefix` followed by one or more digits
fn is_numbered(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Two prefixes clash when `a<digits>` and `b<digits>` can be equal: they are
/// the same, or one is the other followed by digits.
fn prefixes_clash(a: &str, b: &str) -> bool {
    a == b || is_numbered(a, b) || is_numbered(b, a)
}
