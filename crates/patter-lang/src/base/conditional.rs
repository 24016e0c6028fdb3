use patter_core::file::FileSection;
use patter_core::log::ParseLogger;

use crate::engine::Engine;
use crate::parser;
use crate::parser::state::ParserState;
use crate::syntax::{Expression, Statement, SyntaxElement, TriggerContext};

/// Which clause of an `if` chain a [`Conditional`] is.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConditionalMode {
    If,
    ElseIf,
    Else,
}

/// An `if` / `else if` / `else` block. The falling clause forms a chain:
/// the `else if`s and `else` attached to an `if` hang off it.
pub struct Conditional {
    mode: ConditionalMode,
    condition: Option<Box<dyn Expression>>,
    first: Option<Box<dyn Statement>>,
    falling: Option<Box<Conditional>>,
    next: Option<Box<dyn Statement>>,
}

impl Conditional {
    /// Builds a conditional and parses the section body as its branch.
    /// `condition` is `None` exactly for `else`.
    pub fn load(
        engine: &Engine,
        section: &FileSection,
        condition: Option<Box<dyn Expression>>,
        mode: ConditionalMode,
        state: &mut ParserState,
        logger: &mut ParseLogger,
    ) -> Self {
        debug_assert_eq!(condition.is_none(), mode == ConditionalMode::Else);
        let items = parser::load_items(engine, section, state, logger);
        Self {
            mode,
            condition,
            first: parser::link_statements(items),
            falling: None,
            next: None,
        }
    }

    pub fn mode(&self) -> ConditionalMode {
        self.mode
    }

    pub fn condition(&self) -> Option<&dyn Expression> {
        self.condition.as_deref()
    }

    pub fn first(&self) -> Option<&dyn Statement> {
        self.first.as_deref()
    }

    pub fn falling_clause(&self) -> Option<&Conditional> {
        self.falling.as_deref()
    }

    /// Attaches a falling clause at the end of the chain.
    pub fn set_falling_clause(&mut self, clause: Conditional) {
        match &mut self.falling {
            Some(falling) => falling.set_falling_clause(clause),
            None => self.falling = Some(Box::new(clause)),
        }
    }

    /// Mode of the last clause in the chain; an `Else` here means the
    /// chain accepts no further clauses.
    pub fn tail_mode(&self) -> ConditionalMode {
        match &self.falling {
            Some(falling) => falling.tail_mode(),
            None => self.mode,
        }
    }

    fn condition_holds(&self, ctx: &dyn TriggerContext) -> bool {
        match &self.condition {
            Some(condition) => condition
                .single_value(ctx)
                .and_then(|value| value.downcast_ref::<bool>().copied())
                .unwrap_or(false),
            None => true,
        }
    }
}

impl SyntaxElement for Conditional {
    fn on_unload(&self) {
        let mut current = self.first.as_deref();
        while let Some(statement) = current {
            statement.on_unload();
            current = statement.next();
        }
        if let Some(falling) = &self.falling {
            falling.on_unload();
        }
    }

    fn describe(&self, ctx: Option<&dyn TriggerContext>, debug: bool) -> String {
        match (&self.mode, &self.condition) {
            (ConditionalMode::If, Some(condition)) => {
                format!("if {}", condition.describe(ctx, debug))
            }
            (ConditionalMode::ElseIf, Some(condition)) => {
                format!("else if {}", condition.describe(ctx, debug))
            }
            _ => "else".to_string(),
        }
    }
}

impl Statement for Conditional {
    fn set_next(&mut self, next: Option<Box<dyn Statement>>) {
        self.next = next;
    }

    fn next(&self) -> Option<&dyn Statement> {
        self.next.as_deref()
    }

    fn walk(&self, ctx: &dyn TriggerContext) -> Option<&dyn Statement> {
        if self.condition_holds(ctx) {
            self.first.as_deref().or_else(|| self.next())
        } else if let Some(falling) = &self.falling {
            falling.walk(ctx)
        } else {
            self.next()
        }
    }
}

/// A `continue if <condition>` line: the chain walk stops here unless
/// the condition holds.
pub struct InlineCondition {
    condition: Box<dyn Expression>,
    next: Option<Box<dyn Statement>>,
}

impl InlineCondition {
    pub fn new(condition: Box<dyn Expression>) -> Self {
        Self {
            condition,
            next: None,
        }
    }

    pub fn condition(&self) -> &dyn Expression {
        self.condition.as_ref()
    }
}

impl SyntaxElement for InlineCondition {
    fn describe(&self, ctx: Option<&dyn TriggerContext>, debug: bool) -> String {
        format!("continue if {}", self.condition.describe(ctx, debug))
    }
}

impl Statement for InlineCondition {
    fn set_next(&mut self, next: Option<Box<dyn Statement>>) {
        self.next = next;
    }

    fn next(&self) -> Option<&dyn Statement> {
        self.next.as_deref()
    }

    fn walk(&self, ctx: &dyn TriggerContext) -> Option<&dyn Statement> {
        let holds = self
            .condition
            .single_value(ctx)
            .and_then(|value| value.downcast_ref::<bool>().copied())
            .unwrap_or(false);
        if holds {
            self.next()
        } else {
            None
        }
    }
}
