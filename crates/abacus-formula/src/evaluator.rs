//! Formula evaluator
//!
//! Reduces a [`FormulaStructure`] to a [`Number`]. Each structure is folded
//! left to right, starting from zero with an implicit leading `+`. Groups are
//! handled by suspending the current frame and pushing one for the group;
//! when the group is reduced its value is handed back to the suspended frame.

use crate::number::Number;
use crate::structure::{Element, FormulaStructure, Operator};

/// Evaluate a structure against positional arguments
///
/// A variable whose argument is missing evaluates to `NaN`. Division by zero,
/// overflow and similar anomalies produce sentinel values rather than errors.
///
/// # Example
/// ```rust
/// use abacus_formula::{evaluate, parse_formula, Number};
///
/// let structure = parse_formula("(a+b)*2", &["a", "b"]).unwrap();
/// let result = evaluate(&structure, &[Number::from(2), Number::from(3)]);
/// assert_eq!(result, Number::from(10));
/// ```
pub fn evaluate(structure: &FormulaStructure, arguments: &[Number]) -> Number {
    let mut current = EvalFrame::new(structure);
    let mut suspended = Vec::new();

    loop {
        match current.advance(arguments) {
            Some(child) => suspended.push(std::mem::replace(&mut current, EvalFrame::new(child))),
            None => match suspended.pop() {
                Some(parent) => {
                    let value = current.value;
                    current = parent;
                    current.pending = Some(value);
                }
                None => return current.value,
            },
        }
    }
}

/// A structure being reduced
#[derive(Debug)]
struct EvalFrame<'s> {
    structure: &'s FormulaStructure,
    /// Running total
    value: Number,
    /// Next element to combine
    index: usize,
    /// Value of the group at `index`, once it has been reduced
    pending: Option<Number>,
}

impl<'s> EvalFrame<'s> {
    fn new(structure: &'s FormulaStructure) -> Self {
        Self {
            structure,
            value: Number::ZERO,
            index: 0,
            pending: None,
        }
    }

    /// Fold elements into the running total
    ///
    /// Returns the group to descend into, or `None` once every element has
    /// been combined.
    fn advance(&mut self, arguments: &[Number]) -> Option<&'s FormulaStructure> {
        let structure = self.structure;

        while let Some(element) = structure.elements.get(self.index) {
            let operand = match self.pending.take() {
                Some(value) => value,
                None => match element {
                    Element::Literal(value) => *value,
                    Element::Variable(arg) => arguments.get(*arg).copied().unwrap_or(Number::NaN),
                    Element::Group(child) => return Some(child),
                },
            };

            let operator = match self.index {
                0 => Operator::Add,
                i => structure.operators[i - 1],
            };
            self.value = operator.apply(self.value, operand);
            self.index += 1;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_formula, parse_formula_with, Precedence};

    const NONE: &[&str] = &[];

    fn eval(formula: &str) -> Number {
        evaluate(&parse_formula(formula, NONE).unwrap(), &[])
    }

    fn num(text: &str) -> Number {
        Number::parse(text)
    }

    #[test]
    fn test_left_to_right_associativity() {
        assert_eq!(eval("3-2-1"), Number::ZERO);
        assert_eq!(eval("16/4/2"), num("2"));
        assert_eq!(eval("2^3^2"), num("64"));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2+3*4"), num("14"));
        assert_eq!(eval("(2+3)*4"), num("20"));
        assert_eq!(eval("2*3+4"), num("10"));
        assert_eq!(eval("1+2*3^2"), num("19"));
        assert_eq!(eval("10-7%4*2"), num("4"));
    }

    #[test]
    fn test_climbing_versus_single_level() {
        assert_eq!(eval("1-2*3^2+4"), num("-13"));

        let structure = parse_formula_with("1-2*3^2+4", NONE, Precedence::SingleLevel).unwrap();
        assert_eq!(evaluate(&structure, &[]), num("-21"));
    }

    #[test]
    fn test_variables() {
        let structure = parse_formula("a+b", &["a", "b"]).unwrap();
        assert_eq!(evaluate(&structure, &[num("2"), num("3")]), num("5"));

        let structure = parse_formula("rate*base1", &["base1", "rate"]).unwrap();
        assert_eq!(evaluate(&structure, &[num("200"), num("0.15")]), num("30"));
    }

    #[test]
    fn test_missing_or_non_numeric_argument_is_nan() {
        let structure = parse_formula("a+b", &["a", "b"]).unwrap();
        assert_eq!(evaluate(&structure, &[num("2")]), Number::NaN);
        assert_eq!(evaluate(&structure, &[num("2"), num("x")]), Number::NaN);
    }

    #[test]
    fn test_power() {
        assert_eq!(eval("2^10"), num("1024"));
        assert_eq!(eval("2^10").to_string(), "1024");

        let root = eval("4^0.5");
        assert!((root.to_f64() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_decimal_precision() {
        assert_eq!(eval("0.1+0.2").to_string(), "0.3");
        assert_eq!(eval("1/4*4").to_string(), "1");
        assert_eq!(eval("7.50*2").to_string(), "15");
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        assert_eq!(eval("1/0"), Number::INFINITY);
        assert_eq!(eval("0/0"), Number::NaN);
        assert_eq!(eval("5%0"), Number::NaN);
        assert_eq!(eval("(1/0)-(1/0)"), Number::NaN);
        assert_eq!(eval("1/0-1"), Number::INFINITY);
    }

    #[test]
    fn test_invalid_structure_is_nan() {
        assert_eq!(evaluate(&FormulaStructure::invalid(), &[num("1")]), Number::NaN);
    }

    #[test]
    fn test_hand_built_structure() {
        let inner = FormulaStructure::new(Element::Variable(0))
            .then(Operator::Power, Element::Literal(num("2")));
        let structure = FormulaStructure::new(Element::Group(inner))
            .then(Operator::Subtract, Element::Literal(num("1")));
        assert_eq!(evaluate(&structure, &[num("3")]), num("8"));
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 50_000;
        let formula = format!("{}2{}*3", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(eval(&formula), num("6"));
    }

    #[test]
    fn test_idempotent() {
        let structure = parse_formula("a*(b-1)^2/7", &["a", "b"]).unwrap();
        let args = [num("3.5"), num("4")];
        let first = evaluate(&structure, &args);
        for _ in 0..10 {
            assert_eq!(evaluate(&structure, &args).to_string(), first.to_string());
        }
    }
}
