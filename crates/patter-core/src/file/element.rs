/// A blank or comment-only line. Carries only its line number so the
/// element tree still covers every source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoidElement {
    line: usize,
}

impl VoidElement {
    pub fn new(line: usize) -> Self {
        Self { line }
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

/// A one-line element: a statement candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleElement {
    line: usize,
    content: String,
}

impl SimpleElement {
    pub fn new(line: usize, content: String) -> Self {
        Self { line, content }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// The trimmed line content.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A line ending in `:` together with its more-indented block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSection {
    line: usize,
    content: String,
    elements: Vec<FileElement>,
}

impl FileSection {
    pub fn new(line: usize, content: String, elements: Vec<FileElement>) -> Self {
        Self {
            line,
            content,
            elements,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// The header line content, colon stripped.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn elements(&self) -> &[FileElement] {
        &self.elements
    }
}

/// One node of the indent-aware element tree built from a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileElement {
    Void(VoidElement),
    Simple(SimpleElement),
    Section(FileSection),
}

impl FileElement {
    pub fn line(&self) -> usize {
        match self {
            FileElement::Void(v) => v.line(),
            FileElement::Simple(s) => s.line(),
            FileElement::Section(s) => s.line(),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, FileElement::Void(_))
    }
}
