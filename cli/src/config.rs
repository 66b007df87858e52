use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use yw::{CommentMarker, ConfigError};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "yw.toml";

const BUILTIN_LANGUAGES: &[(&str, &str)] = &[
    ("python", "#"),
    ("r", "#"),
    ("shell", "#"),
    ("bash", "#"),
    ("perl", "#"),
    ("ruby", "#"),
    ("julia", "#"),
    ("make", "#"),
    ("yaml", "#"),
    ("toml", "#"),
    ("c", "//"),
    ("cpp", "//"),
    ("java", "//"),
    ("javascript", "//"),
    ("typescript", "//"),
    ("go", "//"),
    ("rust", "//"),
    ("scala", "//"),
    ("kotlin", "//"),
    ("swift", "//"),
    ("php", "//"),
    ("sql", "--"),
    ("haskell", "--"),
    ("lua", "--"),
    ("matlab", "%"),
    ("octave", "%"),
    ("tex", "%"),
    ("fortran", "!"),
    ("lisp", ";"),
    ("clojure", ";"),
];

const BUILTIN_EXTENSIONS: &[(&str, &str)] = &[
    ("py", "python"),
    ("r", "r"),
    ("sh", "shell"),
    ("bash", "bash"),
    ("pl", "perl"),
    ("rb", "ruby"),
    ("jl", "julia"),
    ("mk", "make"),
    ("yml", "yaml"),
    ("yaml", "yaml"),
    ("toml", "toml"),
    ("c", "c"),
    ("h", "c"),
    ("cc", "cpp"),
    ("cpp", "cpp"),
    ("hpp", "cpp"),
    ("java", "java"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("go", "go"),
    ("rs", "rust"),
    ("scala", "scala"),
    ("kt", "kotlin"),
    ("swift", "swift"),
    ("php", "php"),
    ("sql", "sql"),
    ("hs", "haskell"),
    ("lua", "lua"),
    ("m", "matlab"),
    ("tex", "tex"),
    ("f90", "fortran"),
    ("f", "fortran"),
    ("lisp", "lisp"),
    ("clj", "clojure"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `yw.toml`. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub extract: ExtractConfig,
    pub graph: GraphConfig,
    /// Extra or overriding language → comment marker entries.
    pub languages: BTreeMap<String, String>,
    /// Extra or overriding file extension → language entries.
    pub extensions: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    pub comment: Option<String>,
    pub pattern: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    pub view: Option<String>,
    pub root: Option<String>,
}

/// What the command line said about comment markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerRequest<'a> {
    pub comment: Option<&'a str>,
    pub pattern: Option<&'a str>,
    pub language: Option<&'a str>,
    pub source: Option<&'a Path>,
}

impl Config {
    /// Load an explicit config file, or `yw.toml` if one is present.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigFileError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Config::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigFileError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Config::from_toml(&text).map_err(|source| ConfigFileError::Parse { path, source })
    }

    pub fn from_toml(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn marker_for_language(&self, language: &str) -> Option<&str> {
        let language = language.to_ascii_lowercase();
        self.languages
            .get(&language)
            .map(String::as_str)
            .or_else(|| lookup(BUILTIN_LANGUAGES, &language))
    }

    pub fn language_for_path(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        let lower = ext.to_ascii_lowercase();
        self.extensions
            .get(ext)
            .or_else(|| self.extensions.get(&lower))
            .cloned()
            .or_else(|| lookup(BUILTIN_EXTENSIONS, &lower).map(str::to_string))
    }

    /// Pick the comment marker: command line first, then this config,
    /// then the language table. Also returns the language consulted, if any.
    pub fn resolve_marker(
        &self,
        request: MarkerRequest<'_>,
    ) -> Result<(Option<CommentMarker>, Option<String>), ConfigError> {
        if let Some(comment) = request.comment {
            return Ok((Some(CommentMarker::literal(comment)?), None));
        }
        if let Some(pattern) = request.pattern {
            return Ok((Some(CommentMarker::pattern(pattern)?), None));
        }
        if let Some(comment) = &self.extract.comment {
            return Ok((Some(CommentMarker::literal(comment.as_str())?), None));
        }
        if let Some(pattern) = &self.extract.pattern {
            return Ok((Some(CommentMarker::pattern(pattern)?), None));
        }

        let language = request
            .language
            .map(str::to_string)
            .or_else(|| self.extract.language.clone())
            .or_else(|| request.source.and_then(|path| self.language_for_path(path)));

        let marker = language
            .as_deref()
            .and_then(|lang| self.marker_for_language(lang))
            .map(CommentMarker::literal)
            .transpose()?;

        Ok((marker, language))
    }
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(marker: &Option<CommentMarker>) -> Option<&str> {
        match marker {
            Some(CommentMarker::Literal(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    #[test]
    fn parses_all_sections() {
        let config = Config::from_toml(
            r##"
            [extract]
            language = "julia"

            [graph]
            view = "data"
            root = "analysis"

            [languages]
            julia = "#"
            mylang = ";;"

            [extensions]
            ml = "mylang"
            "##,
        )
        .unwrap();
        assert_eq!(config.graph.view.as_deref(), Some("data"));
        assert_eq!(config.marker_for_language("MyLang"), Some(";;"));
        assert_eq!(config.language_for_path(Path::new("a.ml")).as_deref(), Some("mylang"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Config::from_toml("[extract]\nmarker = \"#\"\n").is_err());
    }

    #[test]
    fn command_line_wins() {
        let config = Config::from_toml("[extract]\ncomment = \"%\"\n").unwrap();
        let (marker, _) = config
            .resolve_marker(MarkerRequest {
                comment: Some("//"),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(literal(&marker), Some("//"));

        let (marker, _) = config.resolve_marker(MarkerRequest::default()).unwrap();
        assert_eq!(literal(&marker), Some("%"));
    }

    #[test]
    fn infers_marker_from_extension() {
        let config = Config::default();
        let (marker, language) = config
            .resolve_marker(MarkerRequest {
                source: Some(Path::new("scripts/fit.R")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(literal(&marker), Some("#"));
        assert_eq!(language.as_deref(), Some("r"));
    }

    #[test]
    fn unknown_language_yields_no_marker() {
        let config = Config::default();
        let (marker, language) = config
            .resolve_marker(MarkerRequest {
                language: Some("cobol"),
                ..Default::default()
            })
            .unwrap();
        assert!(marker.is_none());
        assert_eq!(language.as_deref(), Some("cobol"));

        let (marker, language) = config.resolve_marker(MarkerRequest::default()).unwrap();
        assert!(marker.is_none());
        assert!(language.is_none());
    }

    #[test]
    fn bad_pattern_is_reported() {
        let config = Config::default();
        let err = config
            .resolve_marker(MarkerRequest {
                pattern: Some("[oops"),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
