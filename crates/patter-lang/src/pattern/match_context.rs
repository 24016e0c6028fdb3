use patter_core::log::ParseLogger;

use crate::engine::Engine;
use crate::parser::state::ParserState;
use crate::syntax::Expression;

/// State accumulated during a single top-down match attempt of one
/// pattern against one string: captured expressions, the XOR-combined
/// choice marks, and matched regex segments.
pub struct MatchContext<'a> {
    engine: &'a Engine,
    state: &'a ParserState,
    logger: &'a mut ParseLogger,
    captured: Vec<Box<dyn Expression>>,
    parse_mark: u32,
    regex_results: Vec<String>,
}

/// Snapshot of a match context, used to roll back a failed branch.
#[derive(Clone, Copy)]
pub(crate) struct Checkpoint {
    captured: usize,
    parse_mark: u32,
    regex_results: usize,
}

impl<'a> MatchContext<'a> {
    pub fn new(engine: &'a Engine, state: &'a ParserState, logger: &'a mut ParseLogger) -> Self {
        Self {
            engine,
            state,
            logger,
            captured: Vec::new(),
            parse_mark: 0,
            regex_results: Vec::new(),
        }
    }

    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    pub fn state(&self) -> &'a ParserState {
        self.state
    }

    pub fn logger(&mut self) -> &mut ParseLogger {
        self.logger
    }

    pub fn add_expression(&mut self, expression: Box<dyn Expression>) {
        self.captured.push(expression);
    }

    /// XORs a choice mark into the running parse mark.
    pub fn add_mark(&mut self, mark: u32) {
        self.parse_mark ^= mark;
    }

    pub fn add_regex_result(&mut self, matched: String) {
        self.regex_results.push(matched);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            captured: self.captured.len(),
            parse_mark: self.parse_mark,
            regex_results: self.regex_results.len(),
        }
    }

    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.captured.truncate(checkpoint.captured);
        self.parse_mark = checkpoint.parse_mark;
        self.regex_results.truncate(checkpoint.regex_results);
    }

    /// Consumes the context into the captured expressions and the
    /// immutable result handed to `init`.
    pub fn finish(self, source: &str) -> (Vec<Box<dyn Expression>>, ParseResult) {
        (
            self.captured,
            ParseResult {
                source: source.to_string(),
                parse_mark: self.parse_mark,
                regex_results: self.regex_results,
            },
        )
    }
}

/// The immutable outcome of a successful pattern match, passed to
/// `SyntaxElement::init`.
#[derive(Clone, Debug)]
pub struct ParseResult {
    source: String,
    parse_mark: u32,
    regex_results: Vec<String>,
}

impl ParseResult {
    /// The matched source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// XOR of the marks of every chosen choice branch.
    pub fn parse_mark(&self) -> u32 {
        self.parse_mark
    }

    /// Text matched by each regex segment, in pattern order.
    pub fn regex_results(&self) -> &[String] {
        &self.regex_results
    }
}
