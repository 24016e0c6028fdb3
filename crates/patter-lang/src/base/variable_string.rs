use std::sync::Arc;

use patter_core::log::ParseLogger;
use patter_core::strings;

use crate::base::converted;
use crate::engine::Engine;
use crate::parser;
use crate::parser::state::ParserState;
use crate::syntax::{Expression, SyntaxElement, TriggerContext};
use crate::types::{PatternType, Type, Value};

enum StringPart {
    Text(String),
    Interpolated(Box<dyn Expression>),
}

/// A quoted string with optional percent-delimited interpolation:
/// `"hello %name%"`. A string without interpolation is *simple* and
/// counts as a literal.
pub struct VariableString {
    parts: Vec<StringPart>,
    string_type: Arc<Type>,
}

impl VariableString {
    /// Parses a string literal including its surrounding quotes.
    /// Returns `None` when `s` is not a quoted string.
    pub fn new_with_quotes(
        s: &str,
        engine: &Engine,
        state: &ParserState,
        logger: &mut ParseLogger,
    ) -> Option<Self> {
        let s = s.trim();
        if s.len() < 2 || !s.starts_with('"') {
            return None;
        }
        // The closing quote must be the final character.
        let closing = strings::find_closing_index(s, '"', '"', 0)?;
        if closing != s.len() - 1 {
            return None;
        }
        Self::parse(&s[1..closing], engine, state, logger)
    }

    fn parse(
        inner: &str,
        engine: &Engine,
        state: &ParserState,
        logger: &mut ParseLogger,
    ) -> Option<Self> {
        let object = PatternType::new(Arc::clone(engine.types().object()), true);
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut i = 0;
        while i < inner.len() {
            let c = inner[i..].chars().next().expect("in-bounds index");
            match c {
                '\\' => {
                    i += 1;
                    if let Some(next) = inner[i..].chars().next() {
                        text.push(next);
                        i += next.len_utf8();
                    }
                }
                '%' => {
                    let close = strings::find_closing_index(inner, '%', '%', i)?;
                    if !text.is_empty() {
                        parts.push(StringPart::Text(std::mem::take(&mut text)));
                    }
                    logger.recurse();
                    let expression =
                        parser::parse_expression(engine, &inner[i + 1..close], &object, state, logger);
                    if expression.is_none() {
                        logger.forget_error();
                    }
                    logger.callback();
                    parts.push(StringPart::Interpolated(expression?));
                    i = close + 1;
                }
                _ => {
                    text.push(c);
                    i += c.len_utf8();
                }
            }
        }
        if !text.is_empty() {
            parts.push(StringPart::Text(text));
        }
        Some(Self {
            parts,
            string_type: Arc::clone(engine.types().by_name("string")?),
        })
    }

    /// Whether the string holds no interpolation.
    pub fn is_simple(&self) -> bool {
        !self
            .parts
            .iter()
            .any(|part| matches!(part, StringPart::Interpolated(_)))
    }

    /// Renders the string against a context.
    pub fn render(&self, ctx: &dyn TriggerContext) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                StringPart::Text(text) => out.push_str(text),
                StringPart::Interpolated(expression) => match expression.single_value(ctx) {
                    Some(value) => out.push_str(&expression.return_type().display(&value)),
                    None => out.push_str("<none>"),
                },
            }
        }
        out
    }
}

impl SyntaxElement for VariableString {
    fn describe(&self, ctx: Option<&dyn TriggerContext>, debug: bool) -> String {
        match ctx {
            Some(ctx) => format!("\"{}\"", self.render(ctx)),
            None => {
                let mut out = String::from("\"");
                for part in &self.parts {
                    match part {
                        StringPart::Text(text) => out.push_str(text),
                        StringPart::Interpolated(expression) => {
                            out.push('%');
                            out.push_str(&expression.describe(None, debug));
                            out.push('%');
                        }
                    }
                }
                out.push('"');
                out
            }
        }
    }
}

impl Expression for VariableString {
    fn values(&self, ctx: &dyn TriggerContext) -> Vec<Value> {
        vec![Value::new(self.render(ctx))]
    }

    fn return_type(&self) -> Arc<Type> {
        Arc::clone(&self.string_type)
    }

    fn is_literal(&self) -> bool {
        self.is_simple()
    }

    fn convert_to(
        self: Box<Self>,
        target: &Arc<Type>,
        engine: &Engine,
    ) -> Option<Box<dyn Expression>> {
        converted::wrap(self, target, engine)
    }
}
