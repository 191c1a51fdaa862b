//! Parsed formula structures
//!
//! A [`FormulaStructure`] is a flat, left-to-right sequence of elements joined
//! by operators. Operator precedence is expressed by nesting: `2+3*4` becomes
//! `[2, (3*4)]` joined by `+`, so evaluation never needs to compare priorities.

use crate::number::Number;
use std::fmt;

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
}

impl Operator {
    /// Recognize an operator character
    pub fn from_char(c: char) -> Option<Operator> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Subtract),
            '*' => Some(Operator::Multiply),
            '/' => Some(Operator::Divide),
            '%' => Some(Operator::Remainder),
            '^' => Some(Operator::Power),
            _ => None,
        }
    }

    /// Binding strength; higher binds tighter
    pub fn priority(self) -> u8 {
        match self {
            Operator::Add | Operator::Subtract => 0,
            Operator::Multiply | Operator::Divide | Operator::Remainder => 1,
            Operator::Power => 2,
        }
    }

    /// Source character
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
            Operator::Remainder => '%',
            Operator::Power => '^',
        }
    }

    /// Apply the operator to two values
    pub fn apply(self, lhs: Number, rhs: Number) -> Number {
        match self {
            Operator::Add => lhs + rhs,
            Operator::Subtract => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::Divide => lhs / rhs,
            Operator::Remainder => lhs % rhs,
            Operator::Power => lhs.pow(rhs),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One operand of a structure
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Numeric literal
    Literal(Number),
    /// Index into the argument list
    Variable(usize),
    /// Parenthesized or precedence-raised sub-structure
    Group(FormulaStructure),
}

/// Parsed formula
///
/// Invariant: `operators.len() == elements.len() - 1`. `operators[i]` joins
/// `elements[i]` and `elements[i + 1]`.
///
/// `Clone`, `PartialEq`, `Debug` and `Drop` walk nested groups with work
/// lists, so structures of any depth are safe to copy, compare and print.
pub struct FormulaStructure {
    pub(crate) operators: Vec<Operator>,
    pub(crate) elements: Vec<Element>,
}

impl FormulaStructure {
    /// Create a structure holding a single element
    pub fn new(first: Element) -> Self {
        Self {
            operators: Vec::new(),
            elements: vec![first],
        }
    }

    /// The structure a failed parse produces: a single `NaN` literal
    pub fn invalid() -> Self {
        Self::new(Element::Literal(Number::NaN))
    }

    /// Append an operator and the element it joins
    pub fn push(&mut self, operator: Operator, element: Element) -> &mut Self {
        self.operators.push(operator);
        self.elements.push(element);
        self
    }

    /// Builder form of [`push`](Self::push)
    pub fn then(mut self, operator: Operator, element: Element) -> Self {
        self.push(operator, element);
        self
    }

    /// Check if this is the failed-parse structure
    pub fn is_invalid(&self) -> bool {
        self.operators.is_empty()
            && matches!(self.elements.as_slice(), [Element::Literal(Number::NaN)])
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Maximum group nesting depth (a flat structure has depth 1)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((structure, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            for element in &structure.elements {
                if let Element::Group(child) = element {
                    stack.push((child, depth + 1));
                }
            }
        }
        deepest
    }

    /// Display with parameter names in place of argument indices
    pub fn display_with<'a>(&'a self, parameters: &'a [String]) -> DisplayStructure<'a> {
        DisplayStructure {
            structure: self,
            parameters: Some(parameters),
        }
    }
}

impl Drop for FormulaStructure {
    // Nested groups are torn down from a work list so that dropping a very
    // deep structure does not recurse once per level.
    fn drop(&mut self) {
        let mut pending = Vec::new();
        collect_groups(&mut self.elements, &mut pending);
        while let Some(mut structure) = pending.pop() {
            collect_groups(&mut structure.elements, &mut pending);
        }
    }
}

fn collect_groups(elements: &mut Vec<Element>, pending: &mut Vec<FormulaStructure>) {
    for element in elements.drain(..) {
        if let Element::Group(child) = element {
            pending.push(child);
        }
    }
}

impl Clone for FormulaStructure {
    fn clone(&self) -> Self {
        // (source, elements copied so far); parents wait in `suspended`
        let mut current = (self, Vec::with_capacity(self.elements.len()));
        let mut suspended = Vec::new();

        loop {
            let source = current.0;
            let copied = &mut current.1;
            match source.elements.get(copied.len()) {
                Some(Element::Literal(value)) => copied.push(Element::Literal(*value)),
                Some(Element::Variable(arg)) => copied.push(Element::Variable(*arg)),
                Some(Element::Group(child)) => {
                    let frame = (child, Vec::with_capacity(child.elements.len()));
                    suspended.push(std::mem::replace(&mut current, frame));
                }
                None => {
                    let done = FormulaStructure {
                        operators: source.operators.clone(),
                        elements: std::mem::take(copied),
                    };
                    match suspended.pop() {
                        Some(parent) => {
                            current = parent;
                            current.1.push(Element::Group(done));
                        }
                        None => return done,
                    }
                }
            }
        }
    }
}

impl PartialEq for FormulaStructure {
    fn eq(&self, other: &Self) -> bool {
        let mut pairs = vec![(self, other)];

        while let Some((lhs, rhs)) = pairs.pop() {
            if lhs.operators != rhs.operators || lhs.elements.len() != rhs.elements.len() {
                return false;
            }
            for pair in lhs.elements.iter().zip(&rhs.elements) {
                match pair {
                    (Element::Group(a), Element::Group(b)) => pairs.push((a, b)),
                    (Element::Literal(a), Element::Literal(b)) if a == b => {}
                    (Element::Variable(a), Element::Variable(b)) if a == b => {}
                    _ => return false,
                }
            }
        }

        true
    }
}

impl fmt::Debug for FormulaStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FormulaStructure")
            .field(&format_args!("{self}"))
            .finish()
    }
}

/// Renders a structure as formula text, parenthesizing every group
pub struct DisplayStructure<'a> {
    structure: &'a FormulaStructure,
    parameters: Option<&'a [String]>,
}

impl fmt::Display for DisplayStructure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self.structure, 0usize)];

        while let Some((structure, index)) = stack.pop() {
            if index == structure.elements.len() {
                if !stack.is_empty() {
                    f.write_str(")")?;
                }
                continue;
            }
            if index > 0 {
                write!(f, "{}", structure.operators[index - 1])?;
            }
            stack.push((structure, index + 1));

            match &structure.elements[index] {
                Element::Literal(value) => write!(f, "{value}")?,
                Element::Variable(arg) => match self.parameters.and_then(|p| p.get(*arg)) {
                    Some(name) => f.write_str(name)?,
                    None => write!(f, "${arg}")?,
                },
                Element::Group(child) => {
                    f.write_str("(")?;
                    stack.push((child, 0));
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for FormulaStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        DisplayStructure {
            structure: self,
            parameters: None,
        }
        .fmt(f)
    }
}
