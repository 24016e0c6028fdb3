//! The syntax parser: dispatches text fragments against the registered
//! syntax, recency-first, and assembles statements into chains.
//!
//! Diagnostics follow one rule throughout: a failed pattern match is
//! silent, a failed `init` is silent, a semantic rejection logs an error
//! that the dispatcher later discards if any other candidate succeeds.
//! Only when nothing matches does a final no-match diagnostic surface.

pub mod state;

use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

use patter_core::file::{FileElement, FileSection};
use patter_core::log::{ErrorContext, ErrorKind, ParseLogger};
use patter_core::strings;
use regex::Regex;

use crate::base::{
    parse_variable, Conditional, ConditionalMode, ExpressionList, InlineCondition, LiteralList,
    SimpleLiteral, Trigger, UnloadedTrigger, VariableString,
};
use crate::engine::Engine;
use crate::pattern::{MatchContext, MAX_PARSE_DEPTH};
use crate::registration::{EffectInfo, EventInfo, ExpressionInfo, SectionInfo, SyntaxMeta};
use crate::registry::RecencyList;
use crate::syntax::{CodeSection, Effect, Expression, Statement};
use crate::types::{PatternType, Type, Value};

use state::ParserState;

/// How [`parse_boolean_expression`] treats conditions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BooleanMode {
    /// The expression must not be a condition.
    NotConditional,
    /// Conditions and plain boolean expressions both qualify.
    MaybeConditional,
    /// The expression must be a condition.
    Conditional,
}

fn list_split_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:\s*,\s*|\s+(?:and|n?or)\s+)").expect("valid list split pattern")
    })
}

/// Strips one layer of enclosing parentheses if they balance over the
/// whole string.
fn strip_outer_parens(s: &str) -> &str {
    if s.starts_with('(')
        && s.ends_with(')')
        && strings::find_closing_index(s, '(', ')', 0) == Some(s.len() - 1)
    {
        s[1..s.len() - 1].trim()
    } else {
        s
    }
}

/// `TypeId` of the concrete type behind a trait object, for restriction
/// checks and downcasts.
fn concrete_type_of(element: &dyn Any) -> TypeId {
    element.type_id()
}

/// Parses an expression of the expected pattern type.
///
/// Attempts, in order: enclosed parentheses, literals, variables, list
/// literals (for plural expectations), then the registered expressions —
/// recency list first, remainder of the registry after.
pub fn parse_expression(
    engine: &Engine,
    s: &str,
    expected: &PatternType,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn Expression>> {
    let s = s.trim();
    if s.is_empty() || logger.recursion() > MAX_PARSE_DEPTH {
        return None;
    }
    let s = strip_outer_parens(s);

    if let Some(literal) = parse_literal(engine, s, expected, parser_state, logger) {
        return Some(literal);
    }

    if let Some(variable) = parse_variable(s, engine, parser_state, logger) {
        if !variable.is_single() && expected.is_single() {
            logger.error(
                format!(
                    "A single value was expected, but {} represents multiple values.",
                    s
                ),
                ErrorKind::SemanticError,
            );
            return None;
        }
        return Some(Box::new(variable));
    }

    if !expected.is_single() {
        if let Some(list) = parse_list_literal(engine, s, expected, parser_state, logger) {
            return Some(list);
        }
    }

    let recent = engine.recent_expressions();
    for info in &recent {
        if let Some(expression) =
            match_expression_info(engine, s, info, expected, parser_state, logger)
        {
            engine.acknowledge_expression(info);
            logger.clear_errors();
            return Some(expression);
        }
        logger.forget_error();
    }
    for info in RecencyList::remainder(&recent, engine.registry().expressions()) {
        if let Some(expression) =
            match_expression_info(engine, s, &info, expected, parser_state, logger)
        {
            engine.acknowledge_expression(&info);
            logger.clear_errors();
            return Some(expression);
        }
        logger.forget_error();
    }

    logger.set_context(ErrorContext::NoMatch);
    logger.error(
        format!("No expression matching '{}' was found", s),
        ErrorKind::NoMatch,
    );
    None
}

fn match_expression_info(
    engine: &Engine,
    s: &str,
    info: &Arc<ExpressionInfo>,
    expected: &PatternType,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn Expression>> {
    let info_type = info.return_type().ty();
    let expected_type = expected.ty();
    if !engine
        .types()
        .is_assignable(expected_type, info_type.type_id())
        && !engine
            .converters()
            .converter_exists(info_type.type_id(), expected_type.type_id())
    {
        return None;
    }

    for (index, element) in info.meta().patterns().iter().enumerate() {
        logger.set_context(ErrorContext::Matching);
        let mut cx = MatchContext::new(engine, parser_state, logger);
        if !element.match_whole(s, &mut cx) {
            continue;
        }
        let (captured, result) = cx.finish(s);

        logger.set_context(ErrorContext::Initialization);
        if !validators_allow(engine, info.meta(), logger) {
            return None;
        }
        let mut expression = info.create();
        if !expression.init(captured, index, &result) {
            continue;
        }

        logger.set_context(ErrorContext::ConstraintChecking);
        let actual = expression.return_type();
        if !engine
            .types()
            .is_assignable(expected_type, actual.type_id())
        {
            match expression.convert_to(expected_type, engine) {
                Some(converted) => return Some(converted),
                None => {
                    logger.error(
                        format!(
                            "{} was expected, but {} was found",
                            strings::with_indefinite_article(&expected.to_string()),
                            strings::with_indefinite_article(actual.base_name()),
                        ),
                        ErrorKind::SemanticError,
                    );
                    return None;
                }
            }
        }
        if !expression.is_single() && expected.is_single() {
            logger.error(
                format!(
                    "A single value was expected, but '{}' represents multiple values.",
                    s
                ),
                ErrorKind::SemanticError,
            );
            continue;
        }
        if parser_state.is_restricting_expressions()
            && !parser_state.allows(concrete_type_of(expression.as_ref()))
        {
            logger.set_context(ErrorContext::RestrictedSyntaxes);
            logger.error(
                format!(
                    "The enclosing section does not allow the use of this expression: {}",
                    expression.describe(None, logger.is_debug())
                ),
                ErrorKind::RestrictedSyntax,
            );
            continue;
        }
        return Some(expression);
    }
    None
}

/// Runs the init validators for one instantiation attempt. A veto logs
/// an exception diagnostic and aborts the candidate.
fn validators_allow(engine: &Engine, meta: &SyntaxMeta, logger: &mut ParseLogger) -> bool {
    match engine.registry().validate(meta) {
        Ok(()) => true,
        Err(veto) => {
            logger.error(
                format!("Could not create `{}`: {}", meta.name(), veto),
                ErrorKind::Exception,
            );
            false
        }
    }
}

/// Parses a boolean expression, with `mode` governing whether the result
/// must, must not, or may be a condition. The literal words `true` and
/// `false` are recognized directly.
pub fn parse_boolean_expression(
    engine: &Engine,
    s: &str,
    mode: BooleanMode,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn Expression>> {
    let s = s.trim();
    if s.is_empty() || logger.recursion() > MAX_PARSE_DEPTH {
        return None;
    }
    let s = strip_outer_parens(s);

    let boolean = boolean_pattern_type(engine);
    if s.eq_ignore_ascii_case("true") {
        return Some(Box::new(SimpleLiteral::new(
            Arc::clone(boolean.ty()),
            Value::new(true),
        )));
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(Box::new(SimpleLiteral::new(
            Arc::clone(boolean.ty()),
            Value::new(false),
        )));
    }

    if let Some(variable) = parse_variable(s, engine, parser_state, logger) {
        if !variable.is_single() {
            logger.error(
                format!(
                    "A single value was expected, but {} represents multiple values.",
                    s
                ),
                ErrorKind::SemanticError,
            );
            return None;
        }
        return Some(Box::new(variable));
    }

    let bool_id = boolean.ty().type_id();
    let recent = engine.recent_expressions();
    let candidates = recent.iter().cloned().chain(RecencyList::remainder(
        &recent,
        engine.registry().expressions(),
    ));
    for info in candidates {
        if info.return_type().ty().type_id() != bool_id {
            continue;
        }
        let Some(expression) =
            match_expression_info(engine, s, &info, &boolean, parser_state, logger)
        else {
            logger.forget_error();
            continue;
        };
        let conditional = expression.is_conditional();
        match mode {
            BooleanMode::NotConditional if conditional => {
                logger.error(
                    "The boolean expression must not be conditional",
                    ErrorKind::SemanticError,
                );
                return None;
            }
            BooleanMode::Conditional if !conditional => {
                logger.error(
                    "The boolean expression must be conditional",
                    ErrorKind::SemanticError,
                );
                return None;
            }
            _ => {}
        }
        if conditional {
            engine.acknowledge_condition(&info);
        }
        engine.acknowledge_expression(&info);
        logger.clear_errors();
        return Some(expression);
    }

    logger.set_context(ErrorContext::NoMatch);
    logger.error(
        format!("No expression matching '{}' was found", s),
        ErrorKind::NoMatch,
    );
    None
}

fn boolean_pattern_type(engine: &Engine) -> PatternType {
    let ty = engine
        .types()
        .by_name("boolean")
        .expect("boolean type registered by defaults");
    PatternType::new(Arc::clone(ty), true)
}

/// Parses a literal of the expected type: every type assignable or
/// convertible to it gets to try its literal parser; quoted strings go
/// through the variable-string recognizer.
pub fn parse_literal(
    engine: &Engine,
    s: &str,
    expected: &PatternType,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn Expression>> {
    let expected_type = expected.ty();
    for ty in engine.types().iter() {
        let direct = engine.types().is_assignable(expected_type, ty.type_id());
        if !direct
            && !engine
                .converters()
                .converter_exists(ty.type_id(), expected_type.type_id())
        {
            continue;
        }
        if let Some(parse) = ty.literal_parser() {
            if let Some(value) = parse(s) {
                let literal = Box::new(SimpleLiteral::new(Arc::clone(ty), value));
                return if direct {
                    Some(literal)
                } else {
                    literal.convert_to(expected_type, engine)
                };
            }
        }
    }

    if let Some(string_type) = engine.types().by_name("string") {
        let accepts_string = engine
            .types()
            .is_assignable(expected_type, string_type.type_id())
            || engine
                .converters()
                .converter_exists(string_type.type_id(), expected_type.type_id());
        if accepts_string {
            if let Some(vs) = VariableString::new_with_quotes(s, engine, parser_state, logger) {
                let literal = Box::new(vs);
                return if engine
                    .types()
                    .is_assignable(expected_type, string_type.type_id())
                {
                    Some(literal)
                } else {
                    literal.convert_to(expected_type, engine)
                };
            }
        }
    }
    None
}

/// Parses a list literal: elements joined by top-level `,`, `and`, `or`
/// or `nor`. The list is an and-list unless every separator is `or`.
pub fn parse_list_literal(
    engine: &Engine,
    s: &str,
    expected: &PatternType,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn Expression>> {
    debug_assert!(!expected.is_single());
    let lower = s.to_ascii_lowercase();
    if !s.contains(',') && !lower.contains("and") && !lower.contains("or") {
        // `nor` contains `or`, so this also covers nor-lists.
        return None;
    }

    // Split into alternating element / separator tokens, skipping over
    // strings, variables and parenthesized groups.
    let pattern = list_split_pattern();
    let mut parts: Vec<String> = Vec::new();
    let mut last = 0usize;
    let mut i = 0usize;
    while i < s.len() {
        let skipped = strings::next_simple_char_index(s, i);
        if skipped > i {
            i = skipped;
            continue;
        }
        let c = s.as_bytes()[i];
        if c == b' ' || c == b',' {
            if let Some(found) = pattern.find(&s[i..]) {
                if i == last {
                    // Zero-length component between separators.
                    return None;
                }
                parts.push(s[last..i].to_string());
                parts.push(found.as_str().to_string());
                i += found.end();
                last = i;
                continue;
            }
        }
        i += s[i..].chars().next().map_or(1, char::len_utf8);
    }
    if last >= s.len() {
        // Trailing separator.
        return None;
    }
    parts.push(s[last..].to_string());
    if parts.len() == 1 {
        return None;
    }

    // Combining rule: `and`/`nor` force an and-list; `or` makes an
    // or-list only if nothing forced and-ness before it.
    let mut is_and: Option<bool> = None;
    for (index, part) in parts.iter().enumerate() {
        if index % 2 == 1 {
            let separator = part.trim().to_ascii_lowercase();
            if separator == "and" || separator == "nor" {
                is_and = Some(true);
            } else if separator == "or" {
                is_and = Some(is_and == Some(true));
            }
        }
    }
    let is_and_list = is_and.unwrap_or(true);

    let mut expressions: Vec<Box<dyn Expression>> = Vec::new();
    let mut all_literal = true;
    for (index, part) in parts.iter().enumerate() {
        if index % 2 != 0 {
            continue;
        }
        logger.recurse();
        let expression = parse_expression(engine, part.trim(), expected, parser_state, logger);
        if expression.is_none() {
            logger.forget_error();
        }
        logger.callback();
        let expression = expression?;
        all_literal &= expression.is_literal();
        expressions.push(expression);
    }

    if expressions.len() == 1 {
        return expressions.pop();
    }

    let common = common_return_type(engine, &expressions);
    if all_literal {
        let items = expressions
            .into_iter()
            .map(|expression| coerce_string_literal(engine, expression))
            .collect();
        Some(Box::new(LiteralList::new(items, common, is_and_list)))
    } else {
        Some(Box::new(ExpressionList::new(
            expressions,
            common,
            is_and_list,
        )))
    }
}

/// The common type of the expressions: their shared return type, or the
/// any-type when they disagree.
fn common_return_type(engine: &Engine, expressions: &[Box<dyn Expression>]) -> Arc<Type> {
    let first = expressions
        .first()
        .map(|expression| expression.return_type());
    match first {
        Some(first)
            if expressions
                .iter()
                .all(|e| e.return_type().type_id() == first.type_id()) =>
        {
            first
        }
        _ => Arc::clone(engine.types().object()),
    }
}

/// A simple variable string among literal list elements becomes a plain
/// string literal.
fn coerce_string_literal(engine: &Engine, expression: Box<dyn Expression>) -> Box<dyn Expression> {
    let is_variable_string = {
        let any: &dyn Any = expression.as_ref();
        any.is::<VariableString>()
    };
    if !is_variable_string {
        return expression;
    }
    let value = expression
        .single_value(&crate::syntax::DummyContext)
        .expect("a simple variable string always renders");
    let string_type = engine
        .types()
        .by_type_id(value.type_id())
        .cloned()
        .unwrap_or_else(|| Arc::clone(engine.types().object()));
    Box::new(SimpleLiteral::new(string_type, value))
}

/// Parses a line as an effect, recency-first over the registered
/// effects.
pub fn parse_effect(
    engine: &Engine,
    s: &str,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn Effect>> {
    if s.is_empty() {
        return None;
    }
    let recent = engine.recent_effects();
    for info in &recent {
        if let Some(effect) = match_effect_info(engine, s, info, parser_state, logger) {
            engine.acknowledge_effect(info);
            logger.clear_errors();
            return Some(effect);
        }
        logger.forget_error();
    }
    for info in RecencyList::remainder(&recent, engine.registry().effects()) {
        if let Some(effect) = match_effect_info(engine, s, &info, parser_state, logger) {
            engine.acknowledge_effect(&info);
            logger.clear_errors();
            return Some(effect);
        }
        logger.forget_error();
    }
    logger.set_context(ErrorContext::NoMatch);
    logger.error(
        format!("No effect matching '{}' was found", s),
        ErrorKind::NoMatch,
    );
    None
}

fn match_effect_info(
    engine: &Engine,
    s: &str,
    info: &Arc<EffectInfo>,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn Effect>> {
    for (index, element) in info.meta().patterns().iter().enumerate() {
        logger.set_context(ErrorContext::Matching);
        let mut cx = MatchContext::new(engine, parser_state, logger);
        if !element.match_whole(s, &mut cx) {
            continue;
        }
        let (captured, result) = cx.finish(s);

        logger.set_context(ErrorContext::Initialization);
        if !validators_allow(engine, info.meta(), logger) {
            return None;
        }
        let mut effect = info.create();
        if !effect.init(captured, index, &result) {
            continue;
        }
        return Some(effect);
    }
    None
}

/// Parses a line as a statement: either an inline `continue if`
/// condition or an effect.
pub fn parse_statement(
    engine: &Engine,
    s: &str,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn Statement>> {
    if s.is_empty() {
        return None;
    }
    const CONTINUE_IF: &str = "continue if ";
    if strings::starts_with_ignore_case(s, CONTINUE_IF) {
        let condition =
            parse_inline_condition(engine, &s[CONTINUE_IF.len()..], parser_state, logger)?;
        if !parser_state.allows(TypeId::of::<InlineCondition>()) {
            logger.set_context(ErrorContext::RestrictedSyntaxes);
            logger.error(
                "Inline conditions are not allowed in this section",
                ErrorKind::RestrictedSyntax,
            );
            return None;
        }
        return Some(Box::new(condition));
    }

    let effect = parse_effect(engine, s, parser_state, logger)?;
    if !parser_state.allows(concrete_type_of(effect.as_ref())) {
        logger.set_context(ErrorContext::RestrictedSyntaxes);
        logger.error(
            format!(
                "The enclosing section does not allow the use of this effect: {}",
                effect.describe(None, logger.is_debug())
            ),
            ErrorKind::RestrictedSyntax,
        );
        return None;
    }
    let statement: Box<dyn Statement> = effect;
    Some(statement)
}

/// Parses a line as an inline condition: a CONDITIONAL boolean
/// expression wrapped in [`InlineCondition`].
pub fn parse_inline_condition(
    engine: &Engine,
    s: &str,
    parser_state: &ParserState,
    logger: &mut ParseLogger,
) -> Option<InlineCondition> {
    if s.is_empty() {
        return None;
    }
    parse_boolean_expression(engine, s, BooleanMode::Conditional, parser_state, logger)
        .map(InlineCondition::new)
}

/// Parses a file section as a registered code section; on a match the
/// instance recurses into its body through `load_section`.
pub fn parse_section(
    engine: &Engine,
    section: &FileSection,
    parser_state: &mut ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn CodeSection>> {
    if section.content().is_empty() {
        return None;
    }
    let recent = engine.recent_sections();
    for info in &recent {
        if let Some(code) = match_section_info(engine, section, info, parser_state, logger) {
            engine.acknowledge_section(info);
            logger.clear_errors();
            return Some(code);
        }
        logger.forget_error();
    }
    for info in RecencyList::remainder(&recent, engine.registry().sections()) {
        if let Some(code) = match_section_info(engine, section, &info, parser_state, logger) {
            engine.acknowledge_section(&info);
            logger.clear_errors();
            return Some(code);
        }
        logger.forget_error();
    }
    logger.set_context(ErrorContext::NoMatch);
    logger.error(
        format!("No section matching '{}' was found", section.content()),
        ErrorKind::NoMatch,
    );
    None
}

fn match_section_info(
    engine: &Engine,
    section: &FileSection,
    info: &Arc<SectionInfo>,
    parser_state: &mut ParserState,
    logger: &mut ParseLogger,
) -> Option<Box<dyn CodeSection>> {
    for (index, element) in info.meta().patterns().iter().enumerate() {
        logger.set_context(ErrorContext::Matching);
        let mut cx = MatchContext::new(engine, parser_state, logger);
        if !element.match_whole(section.content(), &mut cx) {
            continue;
        }
        let (captured, result) = cx.finish(section.content());

        logger.set_context(ErrorContext::Initialization);
        if !validators_allow(engine, info.meta(), logger) {
            return None;
        }
        let mut code = info.create();
        if !code.init(captured, index, &result) {
            continue;
        }
        code.load_section(section, engine, parser_state, logger);
        return Some(code);
    }
    None
}

/// Matches a section header against the event registry and stages an
/// [`UnloadedTrigger`]; body parsing is deferred to the loader's
/// priority-ordered finalize pass.
pub fn parse_trigger<'s>(
    engine: &Engine,
    section: &'s FileSection,
    logger: &mut ParseLogger,
) -> Option<UnloadedTrigger<'s>> {
    if section.content().is_empty() {
        return None;
    }
    let recent = engine.recent_events();
    for info in &recent {
        if let Some(trigger) = match_event_info(engine, section, info, logger) {
            engine.acknowledge_event(info);
            logger.clear_errors();
            return Some(trigger);
        }
        logger.forget_error();
    }
    for info in RecencyList::remainder(&recent, engine.registry().events()) {
        if let Some(trigger) = match_event_info(engine, section, &info, logger) {
            engine.acknowledge_event(&info);
            logger.clear_errors();
            return Some(trigger);
        }
        logger.forget_error();
    }
    logger.set_context(ErrorContext::NoMatch);
    logger.error(
        format!("No trigger matching '{}' was found", section.content()),
        ErrorKind::NoMatch,
    );
    None
}

fn match_event_info<'s>(
    engine: &Engine,
    section: &'s FileSection,
    info: &Arc<EventInfo>,
    logger: &mut ParseLogger,
) -> Option<UnloadedTrigger<'s>> {
    for (index, element) in info.meta().patterns().iter().enumerate() {
        let mut parser_state = ParserState::new();
        logger.set_context(ErrorContext::Matching);
        let mut cx = MatchContext::new(engine, &parser_state, logger);
        if !element.match_whole(section.content(), &mut cx) {
            continue;
        }
        let (captured, result) = cx.finish(section.content());

        logger.set_context(ErrorContext::Initialization);
        if !validators_allow(engine, info.meta(), logger) {
            return None;
        }
        let mut event = info.create();
        if !event.init(captured, index, &result) {
            continue;
        }

        parser_state.set_current_contexts(info.contexts().to_vec());
        let trigger = Trigger::new(event);
        // The body is not loaded here; the loading-priority pass does it.
        return Some(UnloadedTrigger::new(
            trigger,
            section,
            section.line(),
            Arc::clone(info),
            parser_state,
        ));
    }
    None
}

/// Parses every child of a section, in order, handling the
/// `if`/`else if`/`else` grammar inline. Accepted statements are
/// returned unlinked; [`link_statements`] chains them.
pub fn load_items(
    engine: &Engine,
    section: &FileSection,
    parser_state: &mut ParserState,
    logger: &mut ParseLogger,
) -> Vec<Box<dyn Statement>> {
    let mut items: Vec<Box<dyn Statement>> = Vec::new();
    logger.recurse();
    for element in section.elements() {
        logger.finish_line();
        logger.set_line(element.line());
        match element {
            FileElement::Void(_) => continue,
            FileElement::Section(child) => {
                let content = child.content();
                if strings::starts_with_ignore_case(content, "if ") {
                    let Some(condition) = parse_boolean_expression(
                        engine,
                        &content["if ".len()..],
                        BooleanMode::MaybeConditional,
                        parser_state,
                        logger,
                    ) else {
                        continue;
                    };
                    if !conditionals_allowed(parser_state, logger) {
                        continue;
                    }
                    items.push(Box::new(Conditional::load(
                        engine,
                        child,
                        Some(condition),
                        ConditionalMode::If,
                        parser_state,
                        logger,
                    )));
                } else if strings::starts_with_ignore_case(content, "else if ") {
                    if open_conditional(&mut items).is_none() {
                        logger.error(
                            "An 'else if' must be placed after an 'if'",
                            ErrorKind::StructureError,
                        );
                        continue;
                    }
                    let Some(condition) = parse_boolean_expression(
                        engine,
                        &content["else if ".len()..],
                        BooleanMode::MaybeConditional,
                        parser_state,
                        logger,
                    ) else {
                        continue;
                    };
                    if !conditionals_allowed(parser_state, logger) {
                        continue;
                    }
                    let clause = Conditional::load(
                        engine,
                        child,
                        Some(condition),
                        ConditionalMode::ElseIf,
                        parser_state,
                        logger,
                    );
                    open_conditional(&mut items)
                        .expect("checked above")
                        .set_falling_clause(clause);
                } else if content.eq_ignore_ascii_case("else") {
                    if open_conditional(&mut items).is_none() {
                        logger.error(
                            "An 'else' must be placed after an 'if' or an 'else if'",
                            ErrorKind::StructureError,
                        );
                        continue;
                    }
                    if !conditionals_allowed(parser_state, logger) {
                        continue;
                    }
                    let clause = Conditional::load(
                        engine,
                        child,
                        None,
                        ConditionalMode::Else,
                        parser_state,
                        logger,
                    );
                    open_conditional(&mut items)
                        .expect("checked above")
                        .set_falling_clause(clause);
                } else {
                    let Some(code) = parse_section(engine, child, parser_state, logger) else {
                        continue;
                    };
                    if !parser_state.allows(concrete_type_of(code.as_ref())) {
                        logger.set_context(ErrorContext::RestrictedSyntaxes);
                        logger.error(
                            format!(
                                "The enclosing section does not allow the use of this section: {}",
                                code.describe(None, logger.is_debug())
                            ),
                            ErrorKind::RestrictedSyntax,
                        );
                        continue;
                    }
                    let statement: Box<dyn Statement> = code;
                    items.push(statement);
                }
            }
            FileElement::Simple(simple) => {
                if let Some(statement) =
                    parse_statement(engine, simple.content(), parser_state, logger)
                {
                    items.push(statement);
                }
            }
        }
    }
    logger.finish_line();
    logger.callback();
    items
}

fn conditionals_allowed(parser_state: &ParserState, logger: &mut ParseLogger) -> bool {
    if parser_state.allows(TypeId::of::<Conditional>()) {
        return true;
    }
    logger.set_context(ErrorContext::RestrictedSyntaxes);
    logger.error(
        "Conditionals are not allowed in this section",
        ErrorKind::RestrictedSyntax,
    );
    false
}

/// The trailing conditional of `items`, if it still accepts falling
/// clauses (its chain does not already end in `else`).
fn open_conditional(items: &mut [Box<dyn Statement>]) -> Option<&mut Conditional> {
    let last = items.last_mut()?;
    let any: &mut dyn Any = last.as_mut();
    let conditional = any.downcast_mut::<Conditional>()?;
    if conditional.tail_mode() == ConditionalMode::Else {
        None
    } else {
        Some(conditional)
    }
}

/// Links statements into a forward chain and returns its head.
pub fn link_statements(items: Vec<Box<dyn Statement>>) -> Option<Box<dyn Statement>> {
    let mut head: Option<Box<dyn Statement>> = None;
    for mut item in items.into_iter().rev() {
        item.set_next(head.take());
        head = Some(item);
    }
    head
}
