use smallvec::SmallVec;
use thiserror::Error;

/// Verbosity level of a log entry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// The kind of a user-facing parse error.
///
/// These describe problems in the script source, never in the host
/// program; precondition violations panic instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Error)]
pub enum ErrorKind {
    /// No registered syntax matched the text.
    #[error("no match")]
    NoMatch,
    /// The text matched, but its meaning is inconsistent (wrong plurality,
    /// unconvertible type, and so on).
    #[error("semantic error")]
    SemanticError,
    /// The file's block structure is wrong (stray `else`, bad indentation,
    /// code outside a trigger).
    #[error("structure error")]
    StructureError,
    /// A registration input (usually a syntax pattern) could not be read.
    #[error("malformed input")]
    MalformedInput,
    /// The syntax is valid but not allowed in the enclosing section.
    #[error("restricted syntax")]
    RestrictedSyntax,
    /// Instantiation of a syntax element failed or was vetoed.
    #[error("exception")]
    Exception,
}

/// What the parser was doing when a diagnostic was produced.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorContext {
    Matching,
    Initialization,
    ConstraintChecking,
    RestrictedSyntaxes,
    NoMatch,
}

/// Context trail type: one context per open recursion frame.
pub type ContextTrail = SmallVec<[ErrorContext; 4]>;

/// A single structured entry in the parse log.
#[derive(Clone, Debug)]
pub struct LogEntry {
    message: String,
    level: LogLevel,
    line: usize,
    context: ContextTrail,
    kind: Option<ErrorKind>,
    script: Option<String>,
    tip: Option<String>,
}

impl LogEntry {
    pub(crate) fn new(
        message: String,
        level: LogLevel,
        line: usize,
        context: ContextTrail,
        kind: Option<ErrorKind>,
        script: Option<String>,
        tip: Option<String>,
    ) -> Self {
        Self {
            message,
            level,
            line,
            context,
            kind,
            script,
            tip,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// 1-based source line the entry refers to; 0 when no line applies
    /// (e.g. registration-time diagnostics).
    pub fn line(&self) -> usize {
        self.line
    }

    /// The trail of parser contexts, outermost first.
    pub fn context(&self) -> &[ErrorContext] {
        &self.context
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    /// Name of the script the entry belongs to, if any.
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn tip(&self) -> Option<&str> {
        self.tip.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(format!("{}", ErrorKind::NoMatch), "no match");
        assert_eq!(format!("{}", ErrorKind::StructureError), "structure error");
    }

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn entry_accessors() {
        let entry = LogEntry::new(
            "boom".into(),
            LogLevel::Error,
            3,
            ContextTrail::from_slice(&[ErrorContext::Matching]),
            Some(ErrorKind::SemanticError),
            Some("test.ptr".into()),
            None,
        );
        assert_eq!(entry.message(), "boom");
        assert_eq!(entry.line(), 3);
        assert_eq!(entry.kind(), Some(ErrorKind::SemanticError));
        assert_eq!(entry.script(), Some("test.ptr"));
        assert!(entry.is_error());
    }
}
