use std::io;
use std::path::PathBuf;

use crate::parser::MarkupError;

pub type Result<T> = std::result::Result<T, Error>;

/// Any failure of an extraction run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error("I/O error while reading source: {0}")]
    Io(#[from] io::Error),
}

/// The information needed to start extracting is missing or unusable.
/// Raised before any source text is consumed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no comment marker given and none known for {}", describe_language(.language))]
    NoCommentMarker { language: Option<String> },

    #[error("comment marker must not be empty")]
    EmptyMarker,

    #[error("invalid comment pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot read source '{}': {source}", .path.display())]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_language(language: &Option<String>) -> String {
    match language {
        Some(lang) => format!("language `{}`", lang),
        None => "an unidentified source type".to_string(),
    }
}
