//! Formula definitions and engine configuration
//!
//! A configuration document is JSON:
//!
//! ```json
//! {
//!     "options": { "cache_results": true, "precedence": "climbing" },
//!     "formulas": {
//!         "1": { "expression": "atk*rate-def", "parameters": ["atk", "def", "rate"] }
//!     }
//! }
//! ```

use crate::error::{FormulaError, FormulaResult};
use crate::parser::Precedence;
use crate::FormulaId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Supplies formula definitions by id
pub trait FormulaSource {
    fn formula(&self, id: FormulaId) -> Option<FormulaDefinition>;
}

impl<T: FormulaSource + ?Sized> FormulaSource for &T {
    fn formula(&self, id: FormulaId) -> Option<FormulaDefinition> {
        (**self).formula(id)
    }
}

/// Formula text and the ordered names of its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaDefinition {
    pub expression: String,
    /// Argument order for evaluation
    #[serde(default, alias = "parameter")]
    pub parameters: Vec<String>,
}

impl FormulaDefinition {
    pub fn new<E, I, P>(expression: E, parameters: I) -> Self
    where
        E: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            expression: expression.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// Parameter names must be unique
    pub fn validate(&self) -> FormulaResult<()> {
        let mut seen = HashSet::new();
        for name in &self.parameters {
            if !seen.insert(name.as_str()) {
                return Err(FormulaError::Config(format!(
                    "parameter [{name}] is listed twice for formula [{}]",
                    self.expression
                )));
            }
        }
        Ok(())
    }
}

/// Formula definitions by id, in id order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaTable {
    formulas: BTreeMap<FormulaId, FormulaDefinition>,
}

impl FormulaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition
    pub fn insert(&mut self, id: FormulaId, definition: FormulaDefinition) {
        self.formulas.insert(id, definition);
    }

    pub fn get(&self, id: FormulaId) -> Option<&FormulaDefinition> {
        self.formulas.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormulaId, &FormulaDefinition)> {
        self.formulas.iter().map(|(id, definition)| (*id, definition))
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Parse a JSON object of definitions keyed by id
    pub fn from_json_str(json: &str) -> FormulaResult<Self> {
        let table: FormulaTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Read a JSON object of definitions keyed by id from a file
    pub fn from_json_file(path: impl AsRef<Path>) -> FormulaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> FormulaResult<()> {
        self.formulas.values().try_for_each(FormulaDefinition::validate)
    }
}

impl FormulaSource for FormulaTable {
    fn formula(&self, id: FormulaId) -> Option<FormulaDefinition> {
        self.formulas.get(&id).cloned()
    }
}

impl FromIterator<(FormulaId, FormulaDefinition)> for FormulaTable {
    fn from_iter<T: IntoIterator<Item = (FormulaId, FormulaDefinition)>>(iter: T) -> Self {
        Self {
            formulas: iter.into_iter().collect(),
        }
    }
}

/// Options for a [`FormulaEngine`](crate::FormulaEngine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Memoize results per formula and argument tuple (default: true)
    pub cache_results: bool,
    /// Operator grouping mode (default: climbing)
    pub precedence: Precedence,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_results: true,
            precedence: Precedence::Climbing,
        }
    }
}

/// A configuration document: engine options plus the formula table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub options: EngineOptions,
    pub formulas: FormulaTable,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> FormulaResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.formulas.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> FormulaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
