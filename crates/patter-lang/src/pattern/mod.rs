//! The pattern language: the element model, its matcher, and the
//! compiler from registration pattern text.
//!
//! A pattern is matched against a target string with a cursor. Each
//! element either advances the cursor or fails; failure of the whole
//! pattern produces no diagnostic (the dispatcher simply tries the next
//! candidate).

mod compiler;
mod match_context;

pub use compiler::{compile_pattern, PatternError};
pub use match_context::{MatchContext, ParseResult};

use std::any::TypeId;
use std::fmt;

use patter_core::strings;
use regex::Regex;

use crate::parser;
use crate::parser::BooleanMode;
use crate::types::PatternType;

/// Upper bound on sub-parse nesting. Deeper attempts fail like a
/// no-match instead of overflowing the stack on pathological input.
pub(crate) const MAX_PARSE_DEPTH: usize = 64;

/// One element of a compiled pattern.
pub enum PatternElement {
    /// Case-insensitive literal text; boundary whitespace in the pattern
    /// greedily matches whitespace runs in the input.
    Text(String),
    /// Matches the inner element or nothing.
    Optional(Box<PatternElement>),
    /// Pipe-separated alternatives, tried in order.
    Choice(Vec<ChoiceBranch>),
    /// An anchored regular expression segment.
    RegexGroup(Regex),
    /// A typed expression placeholder.
    Expression(ExpressionElement),
    /// A sequence of elements matched back to back.
    Compound(Vec<PatternElement>),
}

/// One alternative of a choice group, with its optional mark.
pub struct ChoiceBranch {
    mark: Option<u32>,
    element: PatternElement,
}

impl ChoiceBranch {
    pub fn new(mark: Option<u32>, element: PatternElement) -> Self {
        Self { mark, element }
    }

    pub fn mark(&self) -> Option<u32> {
        self.mark
    }
}

/// A `%type%` placeholder: matches any expression parseable as the
/// expected pattern type.
pub struct ExpressionElement {
    expected: PatternType,
    literals_only: bool,
    optional: bool,
}

impl ExpressionElement {
    pub fn new(expected: PatternType, literals_only: bool, optional: bool) -> Self {
        Self {
            expected,
            literals_only,
            optional,
        }
    }

    pub fn expected(&self) -> &PatternType {
        &self.expected
    }

    fn match_at(&self, s: &str, at: usize, cx: &mut MatchContext<'_>) -> Option<usize> {
        let rest = &s[at..];
        if rest.trim().is_empty() {
            return if self.optional { Some(at) } else { None };
        }

        let engine = cx.engine();
        let state = cx.state();
        let boolean = self.expected.ty().type_id() == TypeId::of::<bool>();

        // Candidate end positions: prefixes ending at word or group
        // boundaries, never splitting a string, variable or
        // parenthesized group. Tried longest first so a list literal is
        // not cut short at its first separator.
        let mut ends = Vec::new();
        let mut i = at;
        while i < s.len() {
            let skipped = strings::next_simple_char_index(s, i);
            if skipped > i {
                i = skipped;
                ends.push(i);
                continue;
            }
            i += s[i..].chars().next().map_or(1, char::len_utf8);
            let at_word_end = match s[i..].chars().next() {
                Some(c) => c.is_whitespace(),
                None => true,
            };
            if at_word_end {
                ends.push(i);
            }
        }

        for end in ends.into_iter().rev() {
            let candidate = s[at..end].trim();
            if candidate.is_empty() {
                continue;
            }
            cx.logger().recurse();
            let parsed = if boolean {
                parser::parse_boolean_expression(
                    engine,
                    candidate,
                    BooleanMode::NotConditional,
                    state,
                    cx.logger(),
                )
            } else if self.literals_only {
                parser::parse_literal(engine, candidate, &self.expected, state, cx.logger())
            } else {
                parser::parse_expression(engine, candidate, &self.expected, state, cx.logger())
            };
            if parsed.is_none() {
                cx.logger().forget_error();
            }
            cx.logger().callback();
            if let Some(expression) = parsed {
                cx.add_expression(expression);
                return Some(end);
            }
        }

        if self.optional {
            Some(at)
        } else {
            None
        }
    }
}

impl PatternElement {
    /// Matches this element against `s` starting at byte index `at`.
    /// Returns the cursor position after the match, or `None`.
    pub fn match_at(&self, s: &str, at: usize, cx: &mut MatchContext<'_>) -> Option<usize> {
        if cx.logger().recursion() > MAX_PARSE_DEPTH {
            return None;
        }
        match self {
            PatternElement::Text(text) => match_text(text, s, at),
            PatternElement::Optional(inner) => {
                let checkpoint = cx.checkpoint();
                match inner.match_at(s, at, cx) {
                    Some(end) => Some(end),
                    None => {
                        cx.rollback(checkpoint);
                        Some(at)
                    }
                }
            }
            PatternElement::Choice(branches) => {
                for branch in branches {
                    let checkpoint = cx.checkpoint();
                    if let Some(end) = branch.element.match_at(s, at, cx) {
                        if let Some(mark) = branch.mark {
                            cx.add_mark(mark);
                        }
                        return Some(end);
                    }
                    cx.rollback(checkpoint);
                }
                None
            }
            PatternElement::RegexGroup(regex) => {
                let found = regex.find(&s[at..])?;
                debug_assert_eq!(found.start(), 0);
                cx.add_regex_result(found.as_str().to_string());
                Some(at + found.end())
            }
            PatternElement::Expression(element) => element.match_at(s, at, cx),
            PatternElement::Compound(elements) => {
                let mut cursor = at;
                for element in elements {
                    cursor = element.match_at(s, cursor, cx)?;
                }
                Some(cursor)
            }
        }
    }

    /// Matches the whole string: the pattern must consume every
    /// character (trailing whitespace excepted).
    pub fn match_whole(&self, s: &str, cx: &mut MatchContext<'_>) -> bool {
        match self.match_at(s, 0, cx) {
            Some(end) => s[end..].trim().is_empty(),
            None => false,
        }
    }
}

/// Literal text matching: ASCII-case-insensitive, with greedy whitespace
/// at the pattern's own boundaries.
fn match_text(text: &str, s: &str, at: usize) -> Option<usize> {
    if text.is_empty() {
        return Some(at);
    }
    let stripped = text.trim();
    let mut pos = at;

    if text.chars().next().is_some_and(char::is_whitespace) {
        pos = consume_whitespace(s, pos);
    }
    if stripped.is_empty() {
        return Some(pos);
    }

    let end = pos + stripped.len();
    let region = s.get(pos..end)?;
    if !region.eq_ignore_ascii_case(stripped) {
        return None;
    }
    pos = end;

    if text.chars().next_back().is_some_and(char::is_whitespace) {
        pos = consume_whitespace(s, pos);
    }
    Some(pos)
}

fn consume_whitespace(s: &str, mut pos: usize) -> usize {
    while let Some(c) = s[pos..].chars().next() {
        if !c.is_whitespace() {
            break;
        }
        pos += c.len_utf8();
    }
    pos
}

impl fmt::Debug for PatternElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternElement::Text(t) => write!(f, "Text({:?})", t),
            PatternElement::Optional(inner) => write!(f, "Optional({:?})", inner),
            PatternElement::Choice(branches) => {
                let marks: Vec<_> = branches.iter().map(|b| b.mark).collect();
                write!(f, "Choice(marks: {:?})", marks)
            }
            PatternElement::RegexGroup(r) => write!(f, "Regex({:?})", r.as_str()),
            PatternElement::Expression(e) => write!(f, "Expression({})", e.expected),
            PatternElement::Compound(elements) => f.debug_list().entries(elements.iter()).finish(),
        }
    }
}

impl fmt::Display for ExpressionElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}%", self.expected)
    }
}
