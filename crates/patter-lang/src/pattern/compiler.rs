//! Compiles registration pattern text into [`PatternElement`] trees.
//!
//! The pattern language:
//! - literal text, case- and whitespace-insensitive
//! - `[x]` optional group
//! - `(a|b|c)` choice group; a branch may carry a mark, `1¦a` or `1:a`
//! - `<regex>` anchored regular expression segment
//! - `%type%` expression placeholder; the plural form of a type name
//!   accepts multiple values. Flags before the name: `*` literals only,
//!   `-` optional, `~` forces plural acceptance.
//! - `\x` escapes the next character

use patter_core::strings;
use regex::Regex;
use thiserror::Error;

use crate::types::{PatternType, TypeRegistry};

use super::{ChoiceBranch, ExpressionElement, PatternElement};

/// Why a pattern failed to compile. Registration reports these as
/// malformed-input diagnostics and skips the pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unclosed `{0}` group")]
    Unclosed(char),
    #[error("unknown type name `{0}`")]
    UnknownType(String),
    #[error("empty expression placeholder")]
    EmptyPlaceholder,
    #[error("invalid regex segment: {0}")]
    Regex(#[from] regex::Error),
}

/// Compiles one pattern string against the registered type names.
pub fn compile_pattern(pattern: &str, types: &TypeRegistry) -> Result<PatternElement, PatternError> {
    parse_sequence(pattern, types)
}

fn parse_sequence(s: &str, types: &TypeRegistry) -> Result<PatternElement, PatternError> {
    let mut elements: Vec<PatternElement> = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    let flush = |elements: &mut Vec<PatternElement>, text: &mut String| {
        if !text.is_empty() {
            elements.push(PatternElement::Text(std::mem::take(text)));
        }
    };

    while i < s.len() {
        let c = s[i..].chars().next().expect("in-bounds index");
        match c {
            '\\' => {
                i += 1;
                if let Some(next) = s[i..].chars().next() {
                    text.push(next);
                    i += next.len_utf8();
                } else {
                    text.push('\\');
                }
            }
            '[' => {
                flush(&mut elements, &mut text);
                let close = strings::find_closing_index(s, '[', ']', i)
                    .ok_or(PatternError::Unclosed('['))?;
                let inner = parse_sequence(&s[i + 1..close], types)?;
                elements.push(PatternElement::Optional(Box::new(inner)));
                i = close + 1;
            }
            '(' => {
                flush(&mut elements, &mut text);
                let close = strings::find_closing_index(s, '(', ')', i)
                    .ok_or(PatternError::Unclosed('('))?;
                let mut branches = Vec::new();
                for part in split_choices(&s[i + 1..close]) {
                    let (mark, rest) = split_mark(part);
                    branches.push(ChoiceBranch::new(mark, parse_sequence(rest, types)?));
                }
                elements.push(PatternElement::Choice(branches));
                i = close + 1;
            }
            '%' => {
                flush(&mut elements, &mut text);
                let close = strings::find_closing_index(s, '%', '%', i)
                    .ok_or(PatternError::Unclosed('%'))?;
                elements.push(PatternElement::Expression(parse_placeholder(
                    &s[i + 1..close],
                    types,
                )?));
                i = close + 1;
            }
            '<' => {
                flush(&mut elements, &mut text);
                let close = strings::find_closing_index(s, '<', '>', i)
                    .ok_or(PatternError::Unclosed('<'))?;
                let regex = Regex::new(&format!("^(?:{})", &s[i + 1..close]))?;
                elements.push(PatternElement::RegexGroup(regex));
                i = close + 1;
            }
            _ => {
                text.push(c);
                i += c.len_utf8();
            }
        }
    }
    flush(&mut elements, &mut text);

    Ok(match elements.len() {
        0 => PatternElement::Text(String::new()),
        1 => elements.into_iter().next().expect("one element"),
        _ => PatternElement::Compound(elements),
    })
}

/// Splits a choice group body on top-level pipes.
fn split_choices(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth = depth.saturating_sub(1),
            b'%' => {
                if let Some(close) = strings::find_closing_index(s, '%', '%', i) {
                    i = close;
                }
            }
            b'|' if depth == 0 => {
                parts.push(&s[last..i]);
                last = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&s[last..]);
    parts
}

/// Recognizes a branch mark prefix: digits followed by `¦` or `:`.
fn split_mark(branch: &str) -> (Option<u32>, &str) {
    let digits: String = branch.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return (None, branch);
    }
    let rest = &branch[digits.len()..];
    for separator in ['¦', ':'] {
        if let Some(tail) = rest.strip_prefix(separator) {
            if let Ok(mark) = digits.parse() {
                return (Some(mark), tail);
            }
        }
    }
    (None, branch)
}

/// Parses the inside of a `%...%` placeholder: flags, then a type name.
fn parse_placeholder(spec: &str, types: &TypeRegistry) -> Result<ExpressionElement, PatternError> {
    let mut literals_only = false;
    let mut optional = false;
    let mut force_plural = false;
    let mut name = spec;
    loop {
        match name.chars().next() {
            Some('*') => literals_only = true,
            Some('-') => optional = true,
            Some('~') => force_plural = true,
            _ => break,
        }
        name = &name[1..];
    }
    if name.is_empty() {
        return Err(PatternError::EmptyPlaceholder);
    }
    let mut expected = types
        .pattern_type(name)
        .ok_or_else(|| PatternError::UnknownType(name.to_string()))?;
    if force_plural {
        expected = PatternType::new(std::sync::Arc::clone(expected.ty()), false);
    }
    Ok(ExpressionElement::new(expected, literals_only, optional))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    struct AnyMarker;

    fn types() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .new_type::<AnyMarker>("object", "objects")
            .any()
            .register();
        registry
            .new_type::<bool>("boolean", "booleans")
            .literal_parser(|s| match s {
                "true" => Some(Value::new(true)),
                "false" => Some(Value::new(false)),
                _ => None,
            })
            .register();
        registry
    }

    #[test]
    fn plain_text() {
        let pattern = compile_pattern("on load", &types()).unwrap();
        assert!(matches!(pattern, PatternElement::Text(t) if t == "on load"));
    }

    #[test]
    fn placeholder_splits_text() {
        let pattern = compile_pattern("set %object% to %object%", &types()).unwrap();
        let elements = match pattern {
            PatternElement::Compound(e) => e,
            other => panic!("expected compound, got {:?}", other),
        };
        assert_eq!(elements.len(), 4);
        assert!(matches!(&elements[0], PatternElement::Text(t) if t == "set "));
        assert!(matches!(&elements[1], PatternElement::Expression(_)));
        assert!(matches!(&elements[2], PatternElement::Text(t) if t == " to "));
        assert!(matches!(&elements[3], PatternElement::Expression(_)));
    }

    #[test]
    fn plural_type_name() {
        let pattern = compile_pattern("%objects%", &types()).unwrap();
        match pattern {
            PatternElement::Expression(e) => assert!(!e.expected().is_single()),
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn plural_flag() {
        let pattern = compile_pattern("%~object%", &types()).unwrap();
        match pattern {
            PatternElement::Expression(e) => assert!(!e.expected().is_single()),
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn optional_group() {
        let pattern = compile_pattern("[the ]object", &types()).unwrap();
        let elements = match pattern {
            PatternElement::Compound(e) => e,
            other => panic!("expected compound, got {:?}", other),
        };
        assert!(matches!(&elements[0], PatternElement::Optional(_)));
    }

    #[test]
    fn choice_with_marks() {
        let pattern = compile_pattern("(1¦add|2¦remove)", &types()).unwrap();
        match pattern {
            PatternElement::Choice(branches) => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[0].mark(), Some(1));
                assert_eq!(branches[1].mark(), Some(2));
            }
            other => panic!("expected choice, got {:?}", other),
        }
    }

    #[test]
    fn choice_colon_mark_spelling() {
        let pattern = compile_pattern("(1:on|2:off)", &types()).unwrap();
        match pattern {
            PatternElement::Choice(branches) => {
                assert_eq!(branches[0].mark(), Some(1));
                assert_eq!(branches[1].mark(), Some(2));
            }
            other => panic!("expected choice, got {:?}", other),
        }
    }

    #[test]
    fn unmarked_choice() {
        let pattern = compile_pattern("(a|b)", &types()).unwrap();
        match pattern {
            PatternElement::Choice(branches) => {
                assert_eq!(branches[0].mark(), None);
                assert_eq!(branches[1].mark(), None);
            }
            other => panic!("expected choice, got {:?}", other),
        }
    }

    #[test]
    fn nested_groups_split_correctly() {
        let pattern = compile_pattern("((a|b)|c)", &types()).unwrap();
        match pattern {
            PatternElement::Choice(branches) => assert_eq!(branches.len(), 2),
            other => panic!("expected choice, got {:?}", other),
        }
    }

    #[test]
    fn escape_keeps_literal() {
        let pattern = compile_pattern("100\\% done", &types()).unwrap();
        assert!(matches!(pattern, PatternElement::Text(t) if t == "100% done"));
    }

    #[test]
    fn regex_segment() {
        let pattern = compile_pattern("<[a-z]+>", &types()).unwrap();
        assert!(matches!(pattern, PatternElement::RegexGroup(_)));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let error = compile_pattern("%widget%", &types()).unwrap_err();
        assert!(matches!(error, PatternError::UnknownType(name) if name == "widget"));
    }

    #[test]
    fn unclosed_group_is_an_error() {
        assert!(matches!(
            compile_pattern("[oops", &types()),
            Err(PatternError::Unclosed('['))
        ));
        assert!(matches!(
            compile_pattern("%object", &types()),
            Err(PatternError::Unclosed('%'))
        ));
    }
}
