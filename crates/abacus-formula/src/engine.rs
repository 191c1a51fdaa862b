//! Formula engine
//!
//! [`FormulaEngine`] owns everything with a process-long lifetime: the
//! formula source, the diagnostic sink and both caches. Evaluation takes
//! `&mut self`; a host that shares an engine between threads wraps it in a
//! `Mutex`.

use crate::cache::{ArgsKey, ResultCache, StructureCache};
use crate::config::{EngineConfig, EngineOptions, FormulaSource, FormulaTable};
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::evaluator::evaluate;
use crate::number::Number;
use crate::structure::FormulaStructure;
use crate::FormulaId;

/// Evaluates configured formulas by id
///
/// # Example
/// ```rust
/// use abacus_formula::{FormulaDefinition, FormulaEngine, FormulaTable, Number};
///
/// let mut table = FormulaTable::new();
/// table.insert(1, FormulaDefinition::new("a+b*2", ["a", "b"]));
///
/// let mut engine = FormulaEngine::new(table);
/// assert_eq!(engine.evaluate_with(1, [1, 3]), Number::from(7));
/// ```
#[derive(Debug)]
pub struct FormulaEngine<S, D = LogSink> {
    source: S,
    sink: D,
    options: EngineOptions,
    structures: StructureCache,
    results: ResultCache,
}

impl<S: FormulaSource> FormulaEngine<S, LogSink> {
    /// Create an engine with default options, logging diagnostics
    pub fn new(source: S) -> Self {
        Self::with_options(source, EngineOptions::default())
    }

    pub fn with_options(source: S, options: EngineOptions) -> Self {
        Self {
            source,
            sink: LogSink,
            options,
            structures: StructureCache::new(),
            results: ResultCache::new(),
        }
    }
}

impl FormulaEngine<FormulaTable, LogSink> {
    /// Create an engine from a loaded configuration document
    pub fn from_config(config: EngineConfig) -> Self {
        Self::with_options(config.formulas, config.options)
    }
}

impl<S: FormulaSource, D: DiagnosticSink> FormulaEngine<S, D> {
    /// Replace the diagnostic sink
    pub fn with_sink<E: DiagnosticSink>(self, sink: E) -> FormulaEngine<S, E> {
        FormulaEngine {
            source: self.source,
            sink,
            options: self.options,
            structures: self.structures,
            results: self.results,
        }
    }

    /// Parsed structure for a formula, parsing it on first use
    pub fn structure(&mut self, id: FormulaId) -> &FormulaStructure {
        self.structures
            .get_or_parse(id, &self.source, &self.sink, self.options.precedence)
    }

    /// Evaluate a formula
    ///
    /// Arguments are positional and follow the formula's parameter list.
    /// Formulas that failed to parse evaluate to `NaN` every time.
    pub fn evaluate(&mut self, id: FormulaId, args: &[Number]) -> Number {
        let cache_results = self.options.cache_results;

        if cache_results {
            if let Some(value) = self.results.get(id, args) {
                log::trace!("Formula {id} cache hit for [{}]", ArgsKey::new(args));
                return value;
            }
        }

        let structure =
            self.structures
                .get_or_parse(id, &self.source, &self.sink, self.options.precedence);
        let value = evaluate(structure, args);

        if cache_results {
            self.results.insert(id, ArgsKey::new(args), value);
        }

        value
    }

    /// Evaluate with arguments of any numeric-like type
    pub fn evaluate_with<I>(&mut self, id: FormulaId, args: I) -> Number
    where
        I: IntoIterator,
        I::Item: Into<Number>,
    {
        let args: Vec<Number> = args.into_iter().map(Into::into).collect();
        self.evaluate(id, &args)
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn structure_cache(&self) -> &StructureCache {
        &self.structures
    }

    pub fn result_cache(&self) -> &ResultCache {
        &self.results
    }
}
