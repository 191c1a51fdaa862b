//! Structure and result caches
//!
//! Both caches grow for the lifetime of their owner and are never
//! invalidated. Formula definitions are assumed not to change once read.

use crate::config::FormulaSource;
use crate::diagnostics::DiagnosticSink;
use crate::error::FormulaError;
use crate::number::Number;
use crate::parser::{parse_or_invalid, Precedence};
use crate::structure::FormulaStructure;
use crate::FormulaId;
use ahash::AHashMap;
use std::borrow::Borrow;
use std::fmt;

/// Parsed structures by formula id
#[derive(Debug, Default)]
pub struct StructureCache {
    structures: AHashMap<FormulaId, FormulaStructure>,
}

impl StructureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a structure that has already been parsed
    pub fn get(&self, id: FormulaId) -> Option<&FormulaStructure> {
        self.structures.get(&id)
    }

    /// Get a structure, parsing it on first access
    ///
    /// The definition is read from `source` and parsed exactly once per id.
    /// Parse failures and ids missing from the source are reported to `sink`
    /// and cached as [`FormulaStructure::invalid`].
    pub fn get_or_parse<S, D>(
        &mut self,
        id: FormulaId,
        source: &S,
        sink: &D,
        precedence: Precedence,
    ) -> &FormulaStructure
    where
        S: FormulaSource + ?Sized,
        D: DiagnosticSink + ?Sized,
    {
        self.structures.entry(id).or_insert_with(|| match source.formula(id) {
            Some(definition) => {
                log::debug!("Parsing formula {id}: {}", definition.expression);
                parse_or_invalid(
                    &definition.expression,
                    definition.parameters.as_slice(),
                    precedence,
                    sink,
                )
            }
            None => {
                sink.report(&FormulaError::UnknownFormula(id).to_string());
                FormulaStructure::invalid()
            }
        })
    }

    pub fn contains(&self, id: FormulaId) -> bool {
        self.structures.contains_key(&id)
    }

    /// Number of cached structures
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }
}

/// Argument tuple identifying a cached result
///
/// Compared and hashed as typed values rather than as joined text, so
/// numerically equal arguments (`2.0` and `2`) share an entry. `Display`
/// joins the values with `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgsKey(Box<[Number]>);

impl ArgsKey {
    pub fn new(args: &[Number]) -> Self {
        ArgsKey(args.into())
    }

    pub fn values(&self) -> &[Number] {
        &self.0
    }
}

impl Borrow<[Number]> for ArgsKey {
    fn borrow(&self) -> &[Number] {
        &self.0
    }
}

impl fmt::Display for ArgsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("_")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

/// Evaluation results by formula id and argument tuple
#[derive(Debug, Default)]
pub struct ResultCache {
    results: AHashMap<FormulaId, AHashMap<ArgsKey, Number>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: FormulaId, args: &[Number]) -> Option<Number> {
        self.results.get(&id)?.get(args).copied()
    }

    pub fn insert(&mut self, id: FormulaId, key: ArgsKey, value: Number) {
        self.results.entry(id).or_default().insert(key, value);
    }

    /// Number of cached results for one formula
    pub fn len_for(&self, id: FormulaId) -> usize {
        self.results.get(&id).map_or(0, |entries| entries.len())
    }

    /// Total number of cached results
    pub fn len(&self) -> usize {
        self.results.values().map(|entries| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FormulaDefinition, FormulaTable};
    use crate::diagnostics::MemorySink;

    fn args(values: &[i64]) -> Vec<Number> {
        values.iter().map(|&v| Number::from(v)).collect()
    }

    #[test]
    fn test_args_key_display() {
        assert_eq!(ArgsKey::new(&args(&[2, 3])).to_string(), "2_3");
        assert_eq!(ArgsKey::new(&[]).to_string(), "");
        assert_eq!(
            ArgsKey::new(&[Number::parse("1.50"), Number::NaN]).to_string(),
            "1.5_NaN"
        );
    }

    #[test]
    fn test_args_key_is_typed() {
        assert_ne!(ArgsKey::new(&args(&[12])), ArgsKey::new(&args(&[1, 2])));
        assert_eq!(
            ArgsKey::new(&[Number::parse("2.0")]),
            ArgsKey::new(&[Number::parse("2")])
        );
    }

    #[test]
    fn test_result_cache() {
        let mut cache = ResultCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get(1, &args(&[2, 3])), None);

        cache.insert(1, ArgsKey::new(&args(&[2, 3])), Number::from(5));
        cache.insert(1, ArgsKey::new(&args(&[4, 3])), Number::from(7));
        cache.insert(2, ArgsKey::new(&args(&[2, 3])), Number::from(6));

        assert_eq!(cache.get(1, &args(&[2, 3])), Some(Number::from(5)));
        assert_eq!(cache.get(2, &args(&[2, 3])), Some(Number::from(6)));
        assert_eq!(cache.get(1, &args(&[3, 2])), None);
        assert_eq!(cache.len_for(1), 2);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_structure_cache_parses_once() {
        let mut table = FormulaTable::new();
        table.insert(1, FormulaDefinition::new("a*2", ["a"]));
        let sink = MemorySink::new();
        let mut cache = StructureCache::new();

        let first = cache
            .get_or_parse(1, &table, &sink, Precedence::Climbing)
            .clone();
        // A changed definition is not observed once parsed
        table.insert(1, FormulaDefinition::new("a*3", ["a"]));
        let second = cache.get_or_parse(1, &table, &sink, Precedence::Climbing);

        assert_eq!(&first, second);
        assert_eq!(second.to_string(), "$0*2");
        assert_eq!(cache.len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_structure_cache_unknown_formula() {
        let table = FormulaTable::new();
        let sink = MemorySink::new();
        let mut cache = StructureCache::new();

        assert!(cache
            .get_or_parse(9, &table, &sink, Precedence::Climbing)
            .is_invalid());
        assert!(cache.contains(9));
        assert_eq!(sink.messages(), vec!["formula [9] is not configured".to_string()]);
    }
}
