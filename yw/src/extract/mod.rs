use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::Range;
use std::path::Path;

use regex::Regex;
use tracing::{debug, trace};

use crate::annotation::Annotation;
use crate::error::{ConfigError, Error};

/// Where a comment starts within a line.
#[derive(Debug, Clone)]
pub enum CommentMarker {
    /// A literal delimiter such as `#` or `//`.
    Literal(String),
    /// A regular pattern; the comment starts where the first match ends.
    Pattern(Regex),
}

impl CommentMarker {
    pub fn literal(marker: impl Into<String>) -> Result<Self, ConfigError> {
        let marker = marker.into();
        if marker.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        Ok(CommentMarker::Literal(marker))
    }

    pub fn pattern(pattern: &str) -> Result<Self, ConfigError> {
        if pattern.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        Regex::new(pattern)
            .map(CommentMarker::Pattern)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Byte offset just past the marker, if the line contains one.
    fn comment_start(&self, line: &str) -> Option<usize> {
        match self {
            CommentMarker::Literal(marker) => line.find(marker.as_str()).map(|pos| pos + marker.len()),
            CommentMarker::Pattern(regex) => regex.find(line).map(|m| m.end()),
        }
    }
}

/// One comment recovered from the source, with the marker and surrounding
/// whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    /// 1-based source line.
    pub line: usize,
    /// Byte span of `text` in the source.
    pub span: Range<usize>,
    pub text: String,
}

/// Lazy, forward-only scan over the comment lines of a reader.
pub struct Comments<'m, R> {
    reader: R,
    marker: &'m CommentMarker,
    buf: String,
    line: usize,
    offset: usize,
    done: bool,
}

impl<R: BufRead> Iterator for Comments<'_, R> {
    type Item = io::Result<CommentLine>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            let read = match self.reader.read_line(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => n,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };

            let line_start = self.offset;
            self.offset += read;
            self.line += 1;

            let text = self.buf.trim_end_matches(['\n', '\r']);
            let Some(after_marker) = self.marker.comment_start(text) else {
                continue;
            };

            let rest = &text[after_marker..];
            let leading = rest.len() - rest.trim_start().len();
            let trimmed = rest.trim();
            let start = line_start + after_marker + leading;

            return Some(Ok(CommentLine {
                line: self.line,
                span: start..start + trimmed.len(),
                text: trimmed.to_string(),
            }));
        }
        None
    }
}

/// Everything one pass over a source produced.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// All comment lines, annotated or not. Empty unless requested.
    pub comments: Vec<CommentLine>,
    pub annotations: Vec<Annotation>,
}

impl Extraction {
    /// The recognized comment lines as plain text, one per line.
    pub fn lines_report(&self) -> String {
        let mut out = String::new();
        for comment in &self.comments {
            out.push_str(&comment.text);
            out.push('\n');
        }
        out
    }
}

/// Scans sources for comments and annotations.
#[derive(Debug, Clone)]
pub struct Extractor {
    marker: CommentMarker,
    keep_comments: bool,
}

impl Extractor {
    pub fn new(marker: CommentMarker) -> Self {
        Extractor {
            marker,
            keep_comments: false,
        }
    }

    /// Fails fast when the caller could not determine a marker.
    pub fn from_marker(
        marker: Option<CommentMarker>,
        language: Option<&str>,
    ) -> Result<Self, ConfigError> {
        marker.map(Extractor::new).ok_or_else(|| ConfigError::NoCommentMarker {
            language: language.map(str::to_string),
        })
    }

    /// Also retain non-annotation comment lines for the lines report.
    pub fn keep_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    pub fn marker(&self) -> &CommentMarker {
        &self.marker
    }

    pub fn comments<R: BufRead>(&self, reader: R) -> Comments<'_, R> {
        Comments {
            reader,
            marker: &self.marker,
            buf: String::new(),
            line: 0,
            offset: 0,
            done: false,
        }
    }

    /// Lazily yield only the annotation lines.
    pub fn annotations<R: BufRead>(&self, reader: R) -> impl Iterator<Item = io::Result<Annotation>> {
        self.comments(reader).filter_map(|comment| match comment {
            Ok(comment) => Annotation::from_comment(&comment).map(Ok),
            Err(err) => Some(Err(err)),
        })
    }

    /// Consume the reader once and collect annotations (and comments, if kept).
    pub fn extract<R: BufRead>(&self, reader: R) -> Result<Extraction, Error> {
        let mut extraction = Extraction::default();
        for comment in self.comments(reader) {
            let comment = comment?;
            if let Some(annotation) = Annotation::from_comment(&comment) {
                trace!(line = annotation.line, qualifier = %annotation.qualifier, "annotation");
                extraction.annotations.push(annotation);
            }
            if self.keep_comments {
                extraction.comments.push(comment);
            }
        }
        debug!(
            annotations = extraction.annotations.len(),
            comments = extraction.comments.len(),
            "extraction finished"
        );
        Ok(extraction)
    }

    pub fn extract_path(&self, path: &Path) -> Result<Extraction, Error> {
        let file = File::open(path).map_err(|source| ConfigError::UnreadableSource {
            path: path.to_path_buf(),
            source,
        })?;
        self.extract(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::annotation::Qualifier;

    fn hash() -> Extractor {
        Extractor::new(CommentMarker::literal("#").unwrap())
    }

    #[test]
    fn finds_comments_after_code() {
        let src = "x = 1  # @begin A\nprint(x)\n# plain note\n";
        let comments: Vec<_> = hash().comments(src.as_bytes()).map(Result::unwrap).collect();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "@begin A");
        assert_eq!(comments[0].line, 1);
        assert_eq!(&src[comments[0].span.clone()], "@begin A");
        assert_eq!(comments[1].line, 3);
        assert_eq!(&src[comments[1].span.clone()], "plain note");
    }

    #[test]
    fn spans_survive_crlf_line_endings() {
        let src = "a\r\n#   @in x\r\n";
        let comments: Vec<_> = hash().comments(src.as_bytes()).map(Result::unwrap).collect();
        assert_eq!(&src[comments[0].span.clone()], "@in x");
        assert_eq!(comments[0].line, 2);
    }

    #[test]
    fn annotations_skip_plain_comments() {
        let src = "# intro\n# @begin A\n# @end A\n";
        let quals: Vec<_> = hash()
            .annotations(src.as_bytes())
            .map(|a| a.unwrap().qualifier)
            .collect();
        assert_eq!(quals, vec![Qualifier::Begin, Qualifier::End]);
    }

    #[test]
    fn pattern_marker() {
        let extractor = Extractor::new(CommentMarker::pattern(r"//+|--").unwrap());
        let src = "int x; /// @out x\nselect 1 -- @in y\n";
        let texts: Vec<_> = extractor
            .comments(src.as_bytes())
            .map(|c| c.unwrap().text)
            .collect();
        assert_eq!(texts, vec!["@out x", "@in y"]);
    }

    #[test]
    fn lines_report_keeps_all_comments_when_asked() {
        let src = "# intro\n# @begin A\ncode()\n# @end A\n";
        let kept = hash().keep_comments(true).extract(src.as_bytes()).unwrap();
        assert_eq!(kept.lines_report(), "intro\n@begin A\n@end A\n");
        assert_eq!(kept.annotations.len(), 2);

        let dropped = hash().extract(src.as_bytes()).unwrap();
        assert!(dropped.comments.is_empty());
        assert_eq!(dropped.lines_report(), "");
    }

    #[test]
    fn missing_marker_is_a_config_error() {
        let err = Extractor::from_marker(None, Some("cobol")).unwrap_err();
        assert!(matches!(err, ConfigError::NoCommentMarker { .. }));
        assert!(err.to_string().contains("cobol"));
    }

    #[test]
    fn empty_and_invalid_markers_are_rejected() {
        assert!(matches!(CommentMarker::literal(""), Err(ConfigError::EmptyMarker)));
        assert!(matches!(
            CommentMarker::pattern("(unclosed"),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn extract_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# @begin A").unwrap();
        writeln!(file, "# @end A").unwrap();
        let extraction = hash().extract_path(file.path()).unwrap();
        assert_eq!(extraction.annotations.len(), 2);
    }

    #[test]
    fn unreadable_source_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash().extract_path(&dir.path().join("missing.py")).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::UnreadableSource { .. })));
    }
}
