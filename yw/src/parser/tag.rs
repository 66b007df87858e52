use crate::annotation::{Annotation, Qualifier};
use crate::model::PortKind;
use crate::parser::error::MarkupError;

const DESC_KEYWORD: &str = "@desc";

/// A port or parameter declaration: `name [= binding] [@desc text]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDecl {
    pub name: String,
    pub binding: Option<String>,
    pub description: Option<String>,
}

/// The typed meaning of one annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Begin {
        name: String,
        description: Option<String>,
    },
    End {
        name: String,
    },
    In(PortDecl),
    Out(PortDecl),
    Param(PortDecl),
    Return(PortDecl),
    Uri(String),
    FreeText(String),
}

impl Tag {
    /// The port kind and declaration, for tags that declare a port.
    pub fn as_port(&self) -> Option<(PortKind, &PortDecl)> {
        match self {
            Tag::In(decl) => Some((PortKind::In, decl)),
            Tag::Out(decl) => Some((PortKind::Out, decl)),
            Tag::Param(decl) => Some((PortKind::Param, decl)),
            Tag::Return(decl) => Some((PortKind::Return, decl)),
            Tag::Begin { .. } | Tag::End { .. } | Tag::Uri(_) | Tag::FreeText(_) => None,
        }
    }
}

/// Interpret the content of an annotation according to its qualifier.
pub fn parse_tag(annotation: &Annotation) -> Result<Tag, MarkupError> {
    match annotation.qualifier {
        Qualifier::Begin => {
            let decl = parse_block_name(annotation)?;
            Ok(Tag::Begin {
                name: decl.name,
                description: decl.description,
            })
        }
        Qualifier::End => {
            let decl = parse_block_name(annotation)?;
            Ok(Tag::End { name: decl.name })
        }
        Qualifier::In => parse_declaration(annotation).map(Tag::In),
        Qualifier::Out => parse_declaration(annotation).map(Tag::Out),
        Qualifier::Param => parse_declaration(annotation).map(Tag::Param),
        Qualifier::Return => parse_declaration(annotation).map(Tag::Return),
        Qualifier::Uri => {
            let uri = normalize_whitespace(&annotation.content);
            if uri.is_empty() {
                return Err(MarkupError::MalformedContent {
                    message: "`@uri` requires a value".to_string(),
                    line: annotation.line,
                    span: annotation.span.clone(),
                });
            }
            Ok(Tag::Uri(uri))
        }
        Qualifier::Comment => Ok(Tag::FreeText(normalize_whitespace(&annotation.content))),
    }
}

fn parse_block_name(annotation: &Annotation) -> Result<PortDecl, MarkupError> {
    let decl = parse_declaration(annotation)?;
    if let Some(binding) = &decl.binding {
        return Err(MarkupError::MalformedContent {
            message: format!(
                "`@{}` takes a block name only, found `{} = {}`",
                annotation.qualifier, decl.name, binding
            ),
            line: annotation.line,
            span: annotation.span.clone(),
        });
    }
    Ok(decl)
}

fn parse_declaration(annotation: &Annotation) -> Result<PortDecl, MarkupError> {
    let malformed = |message: String| MarkupError::MalformedContent {
        message,
        line: annotation.line,
        span: annotation.span.clone(),
    };

    let (head, description) = split_description(&annotation.content);
    let (name, binding) = match head.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (head.trim(), None),
    };

    if name.is_empty() {
        return Err(MarkupError::MissingName {
            qualifier: annotation.qualifier,
            line: annotation.line,
            span: annotation.span.clone(),
        });
    }
    if name.contains(char::is_whitespace) {
        return Err(malformed(format!(
            "expected a single name after `@{}`, found `{}`",
            annotation.qualifier,
            normalize_whitespace(name)
        )));
    }

    let binding = match binding {
        Some("") => {
            return Err(malformed(format!("expected a value after `{} =`", name)));
        }
        Some(value) => Some(normalize_whitespace(value)),
        None => None,
    };

    Ok(PortDecl {
        name: name.to_string(),
        binding,
        description,
    })
}

/// Split off a trailing `@desc text` clause.
fn split_description(content: &str) -> (&str, Option<String>) {
    for (pos, _) in content.match_indices(DESC_KEYWORD) {
        let before_ok = content[..pos]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace);
        let rest = &content[pos + DESC_KEYWORD.len()..];
        let after_ok = rest.chars().next().is_none_or(char::is_whitespace);
        if before_ok && after_ok {
            let text = normalize_whitespace(rest);
            let description = if text.is_empty() { None } else { Some(text) };
            return (&content[..pos], description);
        }
    }
    (content, None)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(qualifier: Qualifier, content: &str) -> Annotation {
        Annotation {
            line: 3,
            span: 0..content.len(),
            qualifier,
            content: content.to_string(),
        }
    }

    fn parse(qualifier: Qualifier, content: &str) -> Result<Tag, MarkupError> {
        parse_tag(&annotation(qualifier, content))
    }

    #[test]
    fn bare_name() {
        assert_eq!(
            parse(Qualifier::In, "raw").unwrap(),
            Tag::In(PortDecl {
                name: "raw".into(),
                binding: None,
                description: None
            })
        );
    }

    #[test]
    fn name_binding_and_description() {
        let tag = parse(Qualifier::Out, "x   =  data/out.csv   @desc  cleaned   rows").unwrap();
        assert_eq!(
            tag,
            Tag::Out(PortDecl {
                name: "x".into(),
                binding: Some("data/out.csv".into()),
                description: Some("cleaned rows".into()),
            })
        );
    }

    #[test]
    fn tight_equals_sign() {
        let Tag::Param(decl) = parse(Qualifier::Param, "k=3").unwrap() else {
            panic!("expected a param");
        };
        assert_eq!(decl.name, "k");
        assert_eq!(decl.binding.as_deref(), Some("3"));
    }

    #[test]
    fn begin_with_description() {
        assert_eq!(
            parse(Qualifier::Begin, "fit_model @desc Fits the curve").unwrap(),
            Tag::Begin {
                name: "fit_model".into(),
                description: Some("Fits the curve".into())
            }
        );
    }

    #[test]
    fn desc_must_stand_alone() {
        let Tag::In(decl) = parse(Qualifier::In, "x = a@description").unwrap() else {
            panic!("expected an input");
        };
        assert_eq!(decl.binding.as_deref(), Some("a@description"));
        assert_eq!(decl.description, None);
    }

    #[test]
    fn begin_and_end_need_names() {
        assert!(matches!(
            parse(Qualifier::Begin, ""),
            Err(MarkupError::MissingName {
                qualifier: Qualifier::Begin,
                line: 3,
                ..
            })
        ));
        assert!(matches!(
            parse(Qualifier::End, "  "),
            Err(MarkupError::MissingName {
                qualifier: Qualifier::End,
                ..
            })
        ));
        assert!(matches!(
            parse(Qualifier::In, "@desc orphaned"),
            Err(MarkupError::MissingName { .. })
        ));
    }

    #[test]
    fn malformed_content() {
        assert!(matches!(
            parse(Qualifier::In, "two words"),
            Err(MarkupError::MalformedContent { .. })
        ));
        assert!(matches!(
            parse(Qualifier::Out, "x ="),
            Err(MarkupError::MalformedContent { .. })
        ));
        assert!(matches!(
            parse(Qualifier::Begin, "A = b"),
            Err(MarkupError::MalformedContent { .. })
        ));
        assert!(matches!(
            parse(Qualifier::Uri, ""),
            Err(MarkupError::MalformedContent { .. })
        ));
    }

    #[test]
    fn uri_keeps_equals_signs() {
        assert_eq!(
            parse(Qualifier::Uri, "file:data/run?id=7").unwrap(),
            Tag::Uri("file:data/run?id=7".into())
        );
    }

    #[test]
    fn free_text_is_normalized() {
        assert_eq!(
            parse(Qualifier::Comment, "  spans   two\twords ").unwrap(),
            Tag::FreeText("spans two words".into())
        );
    }

    #[test]
    fn port_view() {
        let tag = parse(Qualifier::Return, "r").unwrap();
        assert_eq!(tag.as_port().map(|(kind, _)| kind), Some(PortKind::Return));
        assert!(parse(Qualifier::End, "A").unwrap().as_port().is_none());
    }
}
