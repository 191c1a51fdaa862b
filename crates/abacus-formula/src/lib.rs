//! # abacus-formula
//!
//! Configured arithmetic formulas evaluated with decimal precision.
//!
//! This crate provides:
//! - Formula parsing (text + parameter names → structure)
//! - Structure evaluation against positional arguments
//! - An engine that memoizes parsed structures per formula id and results
//!   per formula id and argument tuple
//! - JSON configuration for formula tables and engine options
//!
//! ## Example
//!
//! ```rust
//! use abacus_formula::{FormulaDefinition, FormulaEngine, FormulaTable, Number};
//!
//! let mut table = FormulaTable::new();
//! table.insert(1, FormulaDefinition::new("(atk-def)*rate", ["atk", "def", "rate"]));
//!
//! let mut engine = FormulaEngine::new(table);
//! let damage = engine.evaluate_with(1, ["120", "40", "1.5"]);
//! assert_eq!(damage.to_string(), "120");
//! ```

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod number;
pub mod parser;
pub mod structure;

/// Identifier of a configured formula
pub type FormulaId = u32;

pub use cache::{ArgsKey, ResultCache, StructureCache};
pub use config::{EngineConfig, EngineOptions, FormulaDefinition, FormulaSource, FormulaTable};
pub use diagnostics::{DiagnosticSink, LogSink, MemorySink};
pub use engine::FormulaEngine;
pub use error::{FormulaError, FormulaResult, ParseError, ParseResult};
pub use evaluator::evaluate;
pub use number::Number;
pub use parser::{parse_formula, parse_formula_with, parse_or_invalid, Precedence};
pub use structure::{DisplayStructure, Element, FormulaStructure, Operator};
