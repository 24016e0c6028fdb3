//! The structured parse log.
//!
//! Diagnostics produced while parsing a script are collected here rather
//! than printed. Errors logged during a candidate match attempt stay
//! *pending* until the dispatcher either discards them (another candidate
//! matched, or this one is abandoned) or flushes them to the visible
//! output. The `recurse`/`callback` pair scopes pending errors to a
//! sub-parse so the discard is precise.

mod entry;

pub use entry::{ContextTrail, ErrorContext, ErrorKind, LogEntry, LogLevel};

/// Collects diagnostics during the parse of one script.
///
/// The logger tracks the current source line, the recursion depth of the
/// parse, and the parser context (what phase the dispatcher is in). Every
/// error is tagged with all three.
pub struct ParseLogger {
    debug: bool,
    script: Option<String>,
    /// 1-based current line; 0 before the first `next_line`.
    line: usize,
    /// One context per open recursion frame; the last is the current one.
    contexts: Vec<ErrorContext>,
    /// Entries not yet flushed, tagged with the recursion depth at which
    /// they were produced.
    pending: Vec<(usize, LogEntry)>,
    flushed: Vec<LogEntry>,
}

impl ParseLogger {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            script: None,
            line: 0,
            contexts: vec![ErrorContext::Matching],
            pending: Vec::new(),
            flushed: Vec::new(),
        }
    }

    /// Whether debug-level output is kept.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Associates subsequent entries with a script name.
    pub fn set_script(&mut self, name: impl Into<String>) {
        self.script = Some(name.into());
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    pub fn next_line(&mut self) {
        self.line += 1;
    }

    /// Sets the parser context for the current recursion frame.
    pub fn set_context(&mut self, context: ErrorContext) {
        *self.contexts.last_mut().expect("context stack never empty") = context;
    }

    /// Enters a sub-parse. Errors logged inside are scoped to it and can
    /// be discarded without touching the caller's entries.
    pub fn recurse(&mut self) {
        self.contexts.push(ErrorContext::Matching);
    }

    /// Leaves a sub-parse entered with [`recurse`](Self::recurse).
    pub fn callback(&mut self) {
        assert!(self.contexts.len() > 1, "callback without matching recurse");
        self.contexts.pop();
    }

    /// Current sub-parse depth; 1 at the top level. The parser uses this
    /// to bound pattern recursion.
    pub fn recursion(&self) -> usize {
        self.contexts.len()
    }

    fn push(&mut self, level: LogLevel, message: String, kind: Option<ErrorKind>, tip: Option<String>) {
        if level == LogLevel::Debug && !self.debug {
            return;
        }
        let trail: ContextTrail = self.contexts.iter().copied().collect();
        let entry = LogEntry::new(
            message,
            level,
            self.line,
            trail,
            kind,
            self.script.clone(),
            tip,
        );
        self.pending.push((self.recursion(), entry));
    }

    pub fn error(&mut self, message: impl Into<String>, kind: ErrorKind) {
        self.push(LogLevel::Error, message.into(), Some(kind), None);
    }

    pub fn error_with_tip(&mut self, message: impl Into<String>, kind: ErrorKind, tip: impl Into<String>) {
        self.push(LogLevel::Error, message.into(), Some(kind), Some(tip.into()));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message.into(), None, None);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into(), None, None);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Debug, message.into(), None, None);
    }

    /// Discards pending errors produced at or below the current recursion
    /// depth. Called after a candidate fails, so its complaints do not
    /// outlive the attempt.
    pub fn forget_error(&mut self) {
        let depth = self.recursion();
        self.pending
            .retain(|(r, e)| *r < depth || !e.is_error());
    }

    /// Discards pending errors produced at or below the current recursion
    /// depth. Called after a candidate *succeeds*, so complaints from the
    /// losing candidates disappear from the visible log.
    pub fn clear_errors(&mut self) {
        // Same scope as forget_error; kept separate because the two call
        // sites mean different things.
        self.forget_error();
    }

    /// Flushes all pending entries to the visible output.
    pub fn finish_line(&mut self) {
        for (_, entry) in self.pending.drain(..) {
            self.flushed.push(entry);
        }
    }

    /// Whether any error has been produced (pending or flushed).
    pub fn has_error(&self) -> bool {
        self.flushed.iter().any(LogEntry::is_error)
            || self.pending.iter().any(|(_, e)| e.is_error())
    }

    /// Flushed entries so far.
    pub fn entries(&self) -> &[LogEntry] {
        &self.flushed
    }

    /// Flushes anything still pending and hands back every entry.
    pub fn close(mut self) -> Vec<LogEntry> {
        self.finish_line();
        self.flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_pending_until_finish_line() {
        let mut log = ParseLogger::new(false);
        log.next_line();
        log.error("bad thing", ErrorKind::SemanticError);
        assert!(log.entries().is_empty());
        log.finish_line();
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].line(), 1);
    }

    #[test]
    fn forget_error_drops_current_scope_only() {
        let mut log = ParseLogger::new(false);
        log.error("outer", ErrorKind::SemanticError);
        log.recurse();
        log.error("inner", ErrorKind::SemanticError);
        log.forget_error();
        log.callback();
        let entries = log.close();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message(), "outer");
    }

    #[test]
    fn forget_error_at_top_level_drops_everything_pending() {
        let mut log = ParseLogger::new(false);
        log.error("candidate failed", ErrorKind::SemanticError);
        log.forget_error();
        log.error("final", ErrorKind::NoMatch);
        let entries = log.close();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind(), Some(ErrorKind::NoMatch));
    }

    #[test]
    fn non_errors_survive_forget() {
        let mut log = ParseLogger::new(false);
        log.warn("heads up");
        log.error("bad", ErrorKind::SemanticError);
        log.forget_error();
        let entries = log.close();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level(), LogLevel::Warning);
    }

    #[test]
    fn debug_entries_require_debug_mode() {
        let mut quiet = ParseLogger::new(false);
        quiet.debug("invisible");
        assert!(quiet.close().is_empty());

        let mut verbose = ParseLogger::new(true);
        verbose.debug("visible");
        assert_eq!(verbose.close().len(), 1);
    }

    #[test]
    fn context_trail_tracks_recursion() {
        let mut log = ParseLogger::new(false);
        log.set_context(ErrorContext::Initialization);
        log.recurse();
        log.set_context(ErrorContext::ConstraintChecking);
        log.error("deep", ErrorKind::SemanticError);
        log.callback();
        let entries = log.close();
        assert_eq!(
            entries[0].context(),
            &[ErrorContext::Initialization, ErrorContext::ConstraintChecking]
        );
    }

    #[test]
    fn line_tracking() {
        let mut log = ParseLogger::new(false);
        assert_eq!(log.line(), 0);
        log.next_line();
        log.next_line();
        assert_eq!(log.line(), 2);
        log.set_line(7);
        assert_eq!(log.line(), 7);
    }
}
