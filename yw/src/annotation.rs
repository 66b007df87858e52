use std::fmt;
use std::ops::Range;

use crate::extract::CommentLine;

/// The character that marks a comment line as an annotation.
pub const SIGIL: char = '@';

/// The leading keyword of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Begin,
    End,
    In,
    Out,
    Param,
    Uri,
    Return,
    /// Anything else: free text continuing the current block's description.
    Comment,
}

impl Qualifier {
    /// Look up a structural keyword, ignoring ASCII case.
    pub fn from_keyword(word: &str) -> Option<Qualifier> {
        let qualifier = match word.to_ascii_lowercase().as_str() {
            "begin" => Qualifier::Begin,
            "end" => Qualifier::End,
            "in" => Qualifier::In,
            "out" => Qualifier::Out,
            "param" => Qualifier::Param,
            "uri" => Qualifier::Uri,
            "return" => Qualifier::Return,
            _ => return None,
        };
        Some(qualifier)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Begin => "begin",
            Qualifier::End => "end",
            Qualifier::In => "in",
            Qualifier::Out => "out",
            Qualifier::Param => "param",
            Qualifier::Uri => "uri",
            Qualifier::Return => "return",
            Qualifier::Comment => "comment",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recognized annotation line: qualifier plus the raw text after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// 1-based source line.
    pub line: usize,
    /// Byte span of the annotation text in the source.
    pub span: Range<usize>,
    pub qualifier: Qualifier,
    pub content: String,
}

impl Annotation {
    /// Split a comment into qualifier and content.
    /// Returns `None` when the comment does not start with the sigil.
    pub fn from_comment(comment: &CommentLine) -> Option<Annotation> {
        let body = comment.text.strip_prefix(SIGIL)?;

        let (word, rest) = match body.find(char::is_whitespace) {
            Some(pos) => (&body[..pos], body[pos..].trim()),
            None => (body, ""),
        };

        let (qualifier, content) = match Qualifier::from_keyword(word) {
            Some(qualifier) => (qualifier, rest),
            // `@desc` is an explicit description line; drop the keyword.
            None if word.eq_ignore_ascii_case("desc") => (Qualifier::Comment, rest),
            None => (Qualifier::Comment, body.trim()),
        };

        Some(Annotation {
            line: comment.line,
            span: comment.span.clone(),
            qualifier,
            content: content.to_string(),
        })
    }
}
