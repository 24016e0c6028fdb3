//! Splits raw source text into the indent-aware element tree.
//!
//! Physical lines ending in a backslash are joined into one logical line,
//! trailing comments are trimmed, and blank or comment-only lines become
//! void elements. Non-void lines are grouped into blocks by indentation:
//! a line ending in `:` opens a section whose body is the run of
//! more-indented lines that follows.

use crate::log::{ErrorKind, ParseLogger};

use super::element::{FileElement, FileSection, SimpleElement, VoidElement};

/// One logical line: a physical line plus any continuations joined into it.
#[derive(Debug)]
struct LogicalLine {
    /// 1-based number of the first physical line.
    number: usize,
    /// Content with comments stripped; leading indentation preserved.
    text: String,
    /// How many continuation lines were folded into this one.
    joined: usize,
}

/// Columns a tab advances the indentation by.
const TAB_WIDTH: usize = 4;

/// Builds the element tree for a whole source file.
pub fn parse_file(source: &str, logger: &mut ParseLogger) -> Vec<FileElement> {
    let lines = logical_lines(source);
    let (elements, consumed) = parse_block(&lines, 0, None, logger);
    debug_assert_eq!(consumed, lines.len());
    elements
}

fn logical_lines(source: &str) -> Vec<LogicalLine> {
    let mut out: Vec<LogicalLine> = Vec::new();
    let mut number = 0usize;
    let mut lines = source.lines();
    while let Some(raw) = lines.next() {
        number += 1;
        let mut text = strip_comment(raw).to_string();
        let start = number;
        let mut joined = 0usize;
        while ends_with_continuation(&text) {
            text.pop();
            match lines.next() {
                Some(next) => {
                    number += 1;
                    joined += 1;
                    text.push_str(strip_comment(next));
                }
                None => break,
            }
        }
        out.push(LogicalLine {
            number: start,
            text,
            joined,
        });
    }
    out
}

/// Cuts the line at the first `#` that is neither escaped nor inside a
/// quoted string, then trims trailing whitespace.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'"' => in_string = !in_string,
            b'#' if !in_string => return line[..i].trim_end(),
            _ => {}
        }
        i += 1;
    }
    line.trim_end()
}

fn ends_with_continuation(text: &str) -> bool {
    // An even run of backslashes is fully escaped and continues nothing.
    let trailing = text.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

/// Indentation of a line in columns, tabs expanded.
fn indent_columns(line: &str) -> usize {
    let mut cols = 0;
    for c in line.chars() {
        match c {
            '\t' => cols += TAB_WIDTH,
            c if c.is_whitespace() => cols += 1,
            _ => break,
        }
    }
    cols
}

/// Pushes void elements covering the physical lines a continuation
/// consumed, so in-order line numbers stay contiguous.
fn push_joined_voids(into: &mut Vec<FileElement>, line: &LogicalLine) {
    for offset in 1..=line.joined {
        into.push(FileElement::Void(VoidElement::new(line.number + offset)));
    }
}

/// Parses one block: the run of lines more indented than `parent_indent`
/// (all lines, for the root). Returns the elements and the index of the
/// first line not consumed.
fn parse_block(
    lines: &[LogicalLine],
    start: usize,
    parent_indent: Option<usize>,
    logger: &mut ParseLogger,
) -> (Vec<FileElement>, usize) {
    let mut elements = Vec::new();
    let mut block_indent: Option<usize> = None;
    let mut i = start;

    while i < lines.len() {
        let line = &lines[i];
        let content = line.text.trim();

        if content.is_empty() {
            elements.push(FileElement::Void(VoidElement::new(line.number)));
            i += 1;
            continue;
        }

        let indent = indent_columns(&line.text);
        if let Some(parent) = parent_indent {
            if indent <= parent {
                break;
            }
        }

        match block_indent {
            None => block_indent = Some(indent),
            Some(expected) if indent != expected => {
                logger.set_line(line.number);
                logger.error(
                    format!(
                        "The indentation of line {} does not match any enclosing block",
                        line.number
                    ),
                    ErrorKind::StructureError,
                );
                logger.finish_line();
                i = skip_offending(lines, i, indent);
                continue;
            }
            Some(_) => {}
        }

        if let Some(header) = content.strip_suffix(':') {
            let mut children = Vec::new();
            push_joined_voids(&mut children, line);
            let (body, next) = parse_block(lines, i + 1, Some(indent), logger);
            children.extend(body);
            elements.push(FileElement::Section(FileSection::new(
                line.number,
                header.trim_end().to_string(),
                children,
            )));
            i = next;
        } else {
            elements.push(FileElement::Simple(SimpleElement::new(
                line.number,
                content.to_string(),
            )));
            push_joined_voids(&mut elements, line);
            i += 1;
        }
    }

    (elements, i)
}

/// Skips a mis-indented line and, if it opened a section, its whole
/// more-indented body.
fn skip_offending(lines: &[LogicalLine], at: usize, indent: usize) -> usize {
    let mut i = at + 1;
    if lines[at].text.trim().ends_with(':') {
        while i < lines.len() {
            let line = &lines[i];
            if !line.text.trim().is_empty() && indent_columns(&line.text) <= indent {
                break;
            }
            i += 1;
        }
    }
    i
}
