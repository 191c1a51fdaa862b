//! Formula parser
//!
//! Turns formula text into a [`FormulaStructure`]. Precedence is resolved by
//! nesting: when a tighter operator follows an operand, that operand is moved
//! into a new sub-structure and scanning continues there. Parenthesized groups
//! are queued and parsed once the current chain of frames is finished.
//!
//! The parser keeps its own stack of frames, so neither deep nesting nor long
//! operator chains grow the call stack.

use crate::diagnostics::DiagnosticSink;
use crate::error::{ParseError, ParseResult};
use crate::number::Number;
use crate::structure::{Element, FormulaStructure, Operator};
use serde::{Deserialize, Serialize};

/// How far a lower-priority operator climbs back through the frame chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precedence {
    /// Attach to the outermost frame whose priority is at least the
    /// operator's own, giving textbook precedence for every formula
    #[default]
    Climbing,
    /// Only the immediate parent frame is considered. Formulas that mix all
    /// three priority levels without parentheses can group differently,
    /// e.g. `1-2*3^2+4` evaluates as `1-(2*3^2+4)`.
    SingleLevel,
}

/// Parse a formula with default (climbing) precedence
///
/// # Example
/// ```rust
/// use abacus_formula::parse_formula;
///
/// let structure = parse_formula("a+b*2", &["a", "b"]).unwrap();
/// assert_eq!(structure.to_string(), "$0+($1*2)");
/// ```
pub fn parse_formula<S: AsRef<str>>(
    formula: &str,
    parameters: &[S],
) -> ParseResult<FormulaStructure> {
    parse_formula_with(formula, parameters, Precedence::default())
}

/// Parse a formula with an explicit precedence mode
pub fn parse_formula_with<S: AsRef<str>>(
    formula: &str,
    parameters: &[S],
    precedence: Precedence,
) -> ParseResult<FormulaStructure> {
    FormulaParser::new(formula, parameters, precedence).run()
}

/// Parse a formula, reporting any error to `sink` and returning
/// [`FormulaStructure::invalid`] in its place
pub fn parse_or_invalid<S, D>(
    formula: &str,
    parameters: &[S],
    precedence: Precedence,
    sink: &D,
) -> FormulaStructure
where
    S: AsRef<str>,
    D: DiagnosticSink + ?Sized,
{
    match parse_formula_with(formula, parameters, precedence) {
        Ok(structure) => structure,
        Err(err) => {
            sink.report(&err.to_string());
            FormulaStructure::invalid()
        }
    }
}

/// Structure under construction; groups refer to other drafts by index
#[derive(Debug, Default)]
struct Draft {
    operators: Vec<Operator>,
    elements: Vec<DraftElement>,
}

#[derive(Debug)]
enum DraftElement {
    Literal(Number),
    Variable(usize),
    Group(usize),
}

/// A resumable scan over one piece of formula text
#[derive(Debug)]
struct ParseFrame {
    /// Text bounds as character offsets into the formula
    start: usize,
    end: usize,
    /// Next character to scan
    cursor: usize,
    /// Draft receiving operators and elements
    target: usize,
    /// Priority of the operators collected so far
    priority: Option<u8>,
    /// Frame this one was raised from; shares its text
    parent: Option<usize>,
}

enum Step {
    /// Text exhausted
    Finished,
    /// Continue in another frame
    Switch(usize),
}

struct FormulaParser<'a, S> {
    formula: &'a str,
    chars: Vec<char>,
    parameters: &'a [S],
    precedence: Precedence,
    /// Matching `)` for every balanced `(`, by position
    closes: Vec<Option<usize>>,
    drafts: Vec<Draft>,
    frames: Vec<ParseFrame>,
    /// Group frames waiting to be parsed
    deferred: Vec<usize>,
}

impl<'a, S: AsRef<str>> FormulaParser<'a, S> {
    fn new(formula: &'a str, parameters: &'a [S], precedence: Precedence) -> Self {
        let chars: Vec<char> = formula.chars().collect();
        let closes = match_parentheses(&chars);
        Self {
            formula,
            chars,
            parameters,
            precedence,
            closes,
            drafts: Vec::new(),
            frames: Vec::new(),
            deferred: Vec::new(),
        }
    }

    fn run(mut self) -> ParseResult<FormulaStructure> {
        if self.chars.is_empty() {
            return Err(ParseError::EmptyFormula);
        }

        let root_draft = self.new_draft(Draft::default());
        let mut current = self.new_frame(ParseFrame {
            start: 0,
            end: self.chars.len(),
            cursor: 0,
            target: root_draft,
            priority: None,
            parent: None,
        });

        loop {
            match self.scan(current)? {
                Step::Switch(next) => current = next,
                Step::Finished => {
                    self.check_complete(current)?;

                    let frame = &self.frames[current];
                    if let Some(parent) = frame.parent {
                        let cursor = frame.cursor;
                        self.frames[parent].cursor = cursor;
                        current = parent;
                    } else if let Some(next) = self.deferred.pop() {
                        current = next;
                    } else {
                        break;
                    }
                }
            }
        }

        Ok(self.assemble())
    }

    fn new_draft(&mut self, draft: Draft) -> usize {
        self.drafts.push(draft);
        self.drafts.len() - 1
    }

    fn new_frame(&mut self, frame: ParseFrame) -> usize {
        self.frames.push(frame);
        self.frames.len() - 1
    }

    /// Scan the frame until its text runs out or control moves elsewhere
    fn scan(&mut self, current: usize) -> ParseResult<Step> {
        loop {
            let (pos, end) = {
                let frame = &self.frames[current];
                (frame.cursor, frame.end)
            };
            if pos >= end {
                return Ok(Step::Finished);
            }

            let c = self.chars[pos];

            if c.is_ascii_digit() {
                let stop = self.scan_while(pos, end, |c| c.is_ascii_digit() || c == '.');
                let text: String = self.chars[pos..stop].iter().collect();
                self.push_operand(current, pos, DraftElement::Literal(Number::parse(&text)))?;
                self.frames[current].cursor = stop;
            } else if c.is_ascii_alphabetic() {
                let letters = self.scan_while(pos, end, |c| c.is_ascii_alphabetic());
                let stop = self.scan_while(letters, end, |c| c.is_ascii_digit());
                let name: String = self.chars[pos..stop].iter().collect();
                let index = self.resolve_parameter(&name)?;
                self.push_operand(current, pos, DraftElement::Variable(index))?;
                self.frames[current].cursor = stop;
            } else if c == '(' {
                let close = self.matching_close(current, pos)?;
                let group = self.new_draft(Draft::default());
                let frame = self.new_frame(ParseFrame {
                    start: pos + 1,
                    end: close,
                    cursor: pos + 1,
                    target: group,
                    priority: None,
                    parent: None,
                });
                self.push_operand(current, pos, DraftElement::Group(group))?;
                self.deferred.push(frame);
                self.frames[current].cursor = close + 1;
            } else if c == ')' {
                return Err(ParseError::UnexpectedCloseTag {
                    formula: self.formula.to_string(),
                    expression: self.expression(current),
                    position: self.offset(current, pos),
                });
            } else if let Some(operator) = Operator::from_char(c) {
                if let Some(next) = self.push_operator(current, pos, operator)? {
                    return Ok(Step::Switch(next));
                }
            } else {
                return Err(ParseError::IllegalCharacter {
                    formula: self.formula.to_string(),
                    expression: self.expression(current),
                    character: c,
                    position: self.offset(current, pos),
                });
            }
        }
    }

    fn scan_while(&self, from: usize, end: usize, accept: impl Fn(char) -> bool) -> usize {
        let mut pos = from;
        while pos < end && accept(self.chars[pos]) {
            pos += 1;
        }
        pos
    }

    fn resolve_parameter(&self, name: &str) -> ParseResult<usize> {
        self.parameters
            .iter()
            .position(|p| p.as_ref() == name)
            .ok_or_else(|| ParseError::UnknownParameter {
                formula: self.formula.to_string(),
                name: name.to_string(),
                parameters: self
                    .parameters
                    .iter()
                    .map(|p| p.as_ref())
                    .collect::<Vec<_>>()
                    .join(","),
            })
    }

    /// Position of the `)` closing the `(` at `open`
    fn matching_close(&self, current: usize, open: usize) -> ParseResult<usize> {
        match self.closes[open] {
            Some(close) if close < self.frames[current].end => {
                if close == open + 1 {
                    return Err(ParseError::EmptyGroup {
                        formula: self.formula.to_string(),
                        expression: self.expression(current),
                        position: self.offset(current, open),
                    });
                }
                Ok(close)
            }
            _ => Err(ParseError::MissingCloseTag {
                formula: self.formula.to_string(),
                expression: self.expression(current),
            }),
        }
    }

    fn push_operand(&mut self, current: usize, pos: usize, element: DraftElement) -> ParseResult<()> {
        let target = self.frames[current].target;
        let draft = &self.drafts[target];
        if draft.elements.len() != draft.operators.len() {
            return Err(ParseError::MissingOperator {
                formula: self.formula.to_string(),
                expression: self.expression(current),
                position: self.offset(current, pos),
            });
        }
        self.drafts[target].elements.push(element);
        Ok(())
    }

    /// Attach an operator, possibly moving to another frame
    fn push_operator(
        &mut self,
        current: usize,
        pos: usize,
        operator: Operator,
    ) -> ParseResult<Option<usize>> {
        let target = self.frames[current].target;
        let draft = &self.drafts[target];
        if draft.elements.len() != draft.operators.len() + 1 {
            return Err(self.missing_operand(current, pos, operator.symbol()));
        }

        let priority = operator.priority();
        let current_priority = self.frames[current].priority.unwrap_or(priority);

        if priority > current_priority {
            // Tighter binding: the last operand becomes the first operand of
            // a new sub-structure, scanned over the same text.
            let operand = self.drafts[target]
                .elements
                .pop()
                .ok_or_else(|| self.missing_operand(current, pos, operator.symbol()))?;
            let raised = self.new_draft(Draft {
                operators: vec![operator],
                elements: vec![operand],
            });
            self.drafts[target].elements.push(DraftElement::Group(raised));

            let (start, end) = (self.frames[current].start, self.frames[current].end);
            let next = self.new_frame(ParseFrame {
                start,
                end,
                cursor: pos + 1,
                target: raised,
                priority: Some(priority),
                parent: Some(current),
            });
            return Ok(Some(next));
        }

        if priority < current_priority {
            if let Some(ancestor) = self.ancestor_for(current, priority) {
                let frame = &mut self.frames[ancestor];
                frame.priority = Some(priority);
                frame.cursor = pos + 1;
                let target = frame.target;
                self.drafts[target].operators.push(operator);
                return Ok(Some(ancestor));
            }
        }

        self.drafts[target].operators.push(operator);
        let frame = &mut self.frames[current];
        frame.priority = Some(priority);
        frame.cursor = pos + 1;
        Ok(None)
    }

    /// Outermost raised-from frame that binds no tighter than `priority`
    fn ancestor_for(&self, current: usize, priority: u8) -> Option<usize> {
        let mut found = None;
        let mut next = self.frames[current].parent;

        while let Some(parent) = next {
            match self.frames[parent].priority {
                Some(p) if p >= priority => found = Some(parent),
                _ => break,
            }
            if self.precedence == Precedence::SingleLevel {
                break;
            }
            next = self.frames[parent].parent;
        }

        found
    }

    /// A finished frame must end on an operand
    fn check_complete(&self, current: usize) -> ParseResult<()> {
        let frame = &self.frames[current];
        let draft = &self.drafts[frame.target];
        if draft.elements.len() == draft.operators.len() + 1 {
            return Ok(());
        }

        if draft.operators.is_empty() {
            return Err(ParseError::EmptyGroup {
                formula: self.formula.to_string(),
                expression: self.expression(current),
                position: 0,
            });
        }

        let last = frame.end - 1;
        Err(self.missing_operand(current, last, self.chars[last]))
    }

    fn missing_operand(&self, current: usize, pos: usize, operator: char) -> ParseError {
        ParseError::MissingOperand {
            formula: self.formula.to_string(),
            expression: self.expression(current),
            operator,
            position: self.offset(current, pos),
        }
    }

    fn expression(&self, frame: usize) -> String {
        let frame = &self.frames[frame];
        self.chars[frame.start..frame.end].iter().collect()
    }

    fn offset(&self, frame: usize, pos: usize) -> usize {
        pos - self.frames[frame].start
    }

    /// Convert drafts into owned structures, children before parents
    fn assemble(mut self) -> FormulaStructure {
        let mut order = Vec::with_capacity(self.drafts.len());
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            order.push(index);
            for element in &self.drafts[index].elements {
                if let DraftElement::Group(child) = element {
                    stack.push(*child);
                }
            }
        }

        let mut built: Vec<Option<FormulaStructure>> = Vec::with_capacity(self.drafts.len());
        built.resize_with(self.drafts.len(), || None);

        for index in order.into_iter().rev() {
            let draft = std::mem::take(&mut self.drafts[index]);
            let elements = draft
                .elements
                .into_iter()
                .map(|element| match element {
                    DraftElement::Literal(value) => Element::Literal(value),
                    DraftElement::Variable(arg) => Element::Variable(arg),
                    DraftElement::Group(child) => Element::Group(
                        built[child]
                            .take()
                            .unwrap_or_else(FormulaStructure::invalid),
                    ),
                })
                .collect();
            built[index] = Some(FormulaStructure {
                operators: draft.operators,
                elements,
            });
        }

        built
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_else(FormulaStructure::invalid)
    }
}

/// Pair every `(` with its `)`; unbalanced parentheses map to `None`
fn match_parentheses(chars: &[char]) -> Vec<Option<usize>> {
    let mut closes = vec![None; chars.len()];
    let mut open = Vec::new();

    for (pos, &c) in chars.iter().enumerate() {
        match c {
            '(' => open.push(pos),
            ')' => {
                if let Some(start) = open.pop() {
                    closes[start] = Some(pos);
                }
            }
            _ => {}
        }
    }

    closes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use pretty_assertions::assert_eq;

    const NONE: &[&str] = &[];

    fn show(formula: &str) -> String {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        parse_formula(formula, &names).unwrap().display_with(&names).to_string()
    }

    #[test]
    fn test_parse_number() {
        let structure = parse_formula("42", NONE).unwrap();
        assert_eq!(
            structure,
            FormulaStructure::new(Element::Literal(Number::from(42)))
        );

        let structure = parse_formula("3.14", NONE).unwrap();
        assert_eq!(structure.to_string(), "3.14");
    }

    #[test]
    fn test_parse_malformed_numeral_is_nan() {
        let structure = parse_formula("1.2.3+1", NONE).unwrap();
        assert_eq!(structure.elements()[0], Element::Literal(Number::NaN));
    }

    #[test]
    fn test_parse_variables() {
        let structure = parse_formula("b+a", &["a", "b"]).unwrap();
        assert_eq!(
            structure,
            FormulaStructure::new(Element::Variable(1)).then(Operator::Add, Element::Variable(0))
        );

        // Letters then trailing digits form one name
        let structure = parse_formula("x12*y", &["y", "x12"]).unwrap();
        assert_eq!(structure.to_string(), "$1*$0");
    }

    #[test]
    fn test_parse_same_priority_is_flat() {
        let structure = parse_formula("3-2-1", NONE).unwrap();
        assert_eq!(structure.operators(), &[Operator::Subtract, Operator::Subtract]);
        assert_eq!(structure.elements().len(), 3);
        assert_eq!(show("a*b/c%2"), "a*b/c%2");
    }

    #[test]
    fn test_parse_precedence_nests() {
        assert_eq!(show("2+3*4"), "2+(3*4)");
        assert_eq!(show("2*3+4"), "2*3+4");
        assert_eq!(show("a+b*c^2"), "a+(b*(c^2))");
        assert_eq!(show("a^2*b+c"), "a^2*b+c");
        assert_eq!(show("1+2*3+4"), "1+(2*3)+4");
    }

    #[test]
    fn test_parse_groups() {
        assert_eq!(show("(2+3)*4"), "(2+3)*4");
        assert_eq!(show("((a))"), "((a))");
        assert_eq!(show("a*(b+(c-1))"), "a*(b+(c-1))");
        assert_eq!(show("(a+b)*(c+1)^2"), "(a+b)*((c+1)^2)");
    }

    #[test]
    fn test_parse_climbing_precedence() {
        assert_eq!(show("1-2*3^2+4"), "1-(2*(3^2))+4");
        assert_eq!(show("a+b^c*2-1"), "a+(b^c*2)-1");
    }

    #[test]
    fn test_parse_single_level_precedence() {
        let structure =
            parse_formula_with("1-2*3^2+4", NONE, Precedence::SingleLevel).unwrap();
        assert_eq!(structure.to_string(), "1-(2*(3^2)+4)");

        // Two priority levels group the same way in both modes
        let structure = parse_formula_with("1+2*3-4", NONE, Precedence::SingleLevel).unwrap();
        assert_eq!(structure.to_string(), "1+(2*3)-4");
    }

    #[test]
    fn test_parse_unknown_parameter() {
        let err = parse_formula("a+c", &["a", "b"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownParameter {
                formula: "a+c".into(),
                name: "c".into(),
                parameters: "a,b".into(),
            }
        );

        // Matching is case-sensitive
        assert!(parse_formula("A", &["a"]).is_err());
    }

    #[test]
    fn test_parse_missing_close_tag() {
        let err = parse_formula("(1+2", NONE).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingCloseTag {
                formula: "(1+2".into(),
                expression: "(1+2".into(),
            }
        );
    }

    #[test]
    fn test_parse_unexpected_close_tag() {
        let err = parse_formula(")1+2", NONE).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedCloseTag { position: 0, .. }
        ));

        let err = parse_formula("(1)+2)", NONE).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedCloseTag { position: 5, .. }
        ));
    }

    #[test]
    fn test_parse_empty_group() {
        let err = parse_formula("1+()", NONE).unwrap_err();
        assert_eq!(
            err,
            ParseError::EmptyGroup {
                formula: "1+()".into(),
                expression: "1+()".into(),
                position: 2,
            }
        );

        let err = parse_formula("2*(())", NONE).unwrap_err();
        assert!(matches!(err, ParseError::EmptyGroup { position: 0, .. }));
    }

    #[test]
    fn test_parse_illegal_character() {
        let err = parse_formula("1 + 2", NONE).unwrap_err();
        assert!(matches!(
            err,
            ParseError::IllegalCharacter {
                character: ' ',
                position: 1,
                ..
            }
        ));

        // Errors inside groups report the group text
        let err = parse_formula("2*(3&4)", NONE).unwrap_err();
        assert_eq!(
            err,
            ParseError::IllegalCharacter {
                formula: "2*(3&4)".into(),
                expression: "3&4".into(),
                character: '&',
                position: 1,
            }
        );
    }

    #[test]
    fn test_parse_operand_and_operator_checks() {
        assert!(matches!(
            parse_formula("-1", NONE).unwrap_err(),
            ParseError::MissingOperand { operator: '-', position: 0, .. }
        ));
        assert!(matches!(
            parse_formula("1+2*", NONE).unwrap_err(),
            ParseError::MissingOperand { operator: '*', position: 3, .. }
        ));
        assert!(matches!(
            parse_formula("1++2", NONE).unwrap_err(),
            ParseError::MissingOperand { position: 2, .. }
        ));
        assert!(matches!(
            parse_formula("2(3)", NONE).unwrap_err(),
            ParseError::MissingOperator { position: 1, .. }
        ));
        assert_eq!(parse_formula("", NONE).unwrap_err(), ParseError::EmptyFormula);
    }

    #[test]
    fn test_parse_or_invalid_reports() {
        let sink = MemorySink::new();
        let structure = parse_or_invalid("(1+2", NONE, Precedence::Climbing, &sink);

        assert!(structure.is_invalid());
        assert_eq!(
            sink.messages(),
            vec!["expression [(1+2] in formula [(1+2] lacks a close tag".to_string()]
        );

        let structure = parse_or_invalid("1+2", NONE, Precedence::Climbing, &sink);
        assert!(!structure.is_invalid());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_parse_deep_nesting() {
        let depth = 50_000;
        let formula = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let structure = parse_formula(&formula, NONE).unwrap();
        assert_eq!(structure.depth(), depth + 1);
    }

    #[test]
    fn test_parse_long_operator_chain() {
        let formula = vec!["1"; 20_000].join("+2^");
        let structure = parse_formula(&formula, NONE).unwrap();
        assert_eq!(structure.elements().len(), 20_000);
    }
}
