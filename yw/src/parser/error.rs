use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::annotation::Qualifier;

/// Structural inconsistencies in the annotation stream.
///
/// Every variant carries the 1-based source line and the byte span of the
/// offending annotation so the caller can point at it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("line {line}: `@end {name}` has no matching `@begin`")]
    UnexpectedEnd {
        name: String,
        line: usize,
        span: Range<usize>,
    },

    #[error(
        "line {line}: expected `@end {expected}` to close the block opened on line {opened}, found `@end {found}`"
    )]
    MismatchedEnd {
        expected: String,
        found: String,
        opened: usize,
        line: usize,
        span: Range<usize>,
    },

    #[error("line {line}: block `{name}` is never closed; expected `@end {name}` before end of input")]
    UnclosedBlock {
        name: String,
        line: usize,
        span: Range<usize>,
    },

    #[error("line {line}: `@{qualifier}` requires a name")]
    MissingName {
        qualifier: Qualifier,
        line: usize,
        span: Range<usize>,
    },

    #[error("line {line}: {message}")]
    MalformedContent {
        message: String,
        line: usize,
        span: Range<usize>,
    },

    #[error("line {line}: `@uri` must follow a port declared in block `{block}`")]
    DanglingUri {
        block: String,
        line: usize,
        span: Range<usize>,
    },
}

impl MarkupError {
    pub fn line(&self) -> usize {
        match self {
            MarkupError::UnexpectedEnd { line, .. }
            | MarkupError::MismatchedEnd { line, .. }
            | MarkupError::UnclosedBlock { line, .. }
            | MarkupError::MissingName { line, .. }
            | MarkupError::MalformedContent { line, .. }
            | MarkupError::DanglingUri { line, .. } => *line,
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            MarkupError::UnexpectedEnd { span, .. }
            | MarkupError::MismatchedEnd { span, .. }
            | MarkupError::UnclosedBlock { span, .. }
            | MarkupError::MissingName { span, .. }
            | MarkupError::MalformedContent { span, .. }
            | MarkupError::DanglingUri { span, .. } => span.clone(),
        }
    }

    /// The block the error is about, when there is one.
    pub fn block_name(&self) -> Option<&str> {
        match self {
            MarkupError::UnexpectedEnd { name, .. } | MarkupError::UnclosedBlock { name, .. } => {
                Some(name)
            }
            MarkupError::MismatchedEnd { expected, .. } => Some(expected),
            MarkupError::DanglingUri { block, .. } => Some(block),
            MarkupError::MissingName { .. } | MarkupError::MalformedContent { .. } => None,
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let diagnostic = Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(vec![Label::primary(file_id, self.span())]);
        match self {
            MarkupError::MismatchedEnd { expected, .. } => diagnostic.with_notes(vec![format!(
                "blocks must be closed in the reverse order they were opened; `{}` is still open",
                expected
            )]),
            MarkupError::UnclosedBlock { name, .. } => {
                diagnostic.with_notes(vec![format!("add `@end {}` after its last annotation", name)])
            }
            _ => diagnostic,
        }
    }
}
