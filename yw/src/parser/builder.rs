use tracing::debug;

use crate::annotation::Annotation;
use crate::model::{BlockId, BlockTree, Port, PortId, PortKind};
use crate::parser::error::MarkupError;
use crate::parser::tag::{PortDecl, Tag, parse_tag};

/// Build a block tree from annotations in source order.
pub fn build_tree<'a>(
    annotations: impl IntoIterator<Item = &'a Annotation>,
    root_name: &str,
) -> Result<BlockTree, MarkupError> {
    let mut state = BuildState::new(root_name);
    for annotation in annotations {
        let tag = parse_tag(annotation)?;
        state.apply(annotation, tag)?;
    }
    state.finish()
}

/// Stack machine that turns tags into a block tree.
#[derive(Debug)]
pub struct BuildState {
    tree: BlockTree,
    /// Open blocks; the root is always at the bottom.
    stack: Vec<BlockId>,
    /// Most recent port of the current block, the target of `@uri`.
    last_port: Option<PortId>,
}

impl BuildState {
    pub fn new(root_name: &str) -> Self {
        BuildState {
            tree: BlockTree::new(root_name),
            stack: vec![BlockId::ROOT],
            last_port: None,
        }
    }

    /// The block new ports and text attach to.
    pub fn current(&self) -> BlockId {
        self.stack.last().copied().unwrap_or(BlockId::ROOT)
    }

    /// Number of open blocks, not counting the root.
    pub fn open_depth(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    pub fn apply(&mut self, annotation: &Annotation, tag: Tag) -> Result<(), MarkupError> {
        match tag {
            Tag::Begin { name, description } => {
                let parent = self.current();
                let id = self
                    .tree
                    .add_block(parent, name, annotation.line, annotation.span.clone());
                if let Some(description) = description {
                    self.tree.append_description(id, &description);
                }
                debug!(block = %self.tree.qualified_name(id), line = annotation.line, "begin");
                self.stack.push(id);
                self.last_port = None;
            }
            Tag::End { name } => {
                if self.stack.len() == 1 {
                    return Err(MarkupError::UnexpectedEnd {
                        name,
                        line: annotation.line,
                        span: annotation.span.clone(),
                    });
                }
                let open = self.tree.block(self.current());
                if open.name != name {
                    return Err(MarkupError::MismatchedEnd {
                        expected: open.name.clone(),
                        found: name,
                        opened: open.line,
                        line: annotation.line,
                        span: annotation.span.clone(),
                    });
                }
                debug!(block = %self.tree.qualified_name(self.current()), line = annotation.line, "end");
                self.stack.pop();
                self.last_port = None;
            }
            Tag::Uri(uri) => {
                let current = self.current();
                match self.last_port {
                    Some(port) if self.tree.port(port).block == current => {
                        self.tree.set_uri(port, uri);
                    }
                    _ => {
                        return Err(MarkupError::DanglingUri {
                            block: self.tree.block(current).name.clone(),
                            line: annotation.line,
                            span: annotation.span.clone(),
                        });
                    }
                }
            }
            Tag::FreeText(text) => {
                self.tree.append_description(self.current(), &text);
            }
            Tag::In(decl) => self.add_port(annotation, PortKind::In, decl),
            Tag::Out(decl) => self.add_port(annotation, PortKind::Out, decl),
            Tag::Param(decl) => self.add_port(annotation, PortKind::Param, decl),
            Tag::Return(decl) => self.add_port(annotation, PortKind::Return, decl),
        }
        Ok(())
    }

    fn add_port(&mut self, annotation: &Annotation, kind: PortKind, decl: PortDecl) {
        let port = self.tree.add_port(Port {
            name: decl.name,
            binding: decl.binding,
            uri: None,
            kind,
            description: decl.description,
            block: self.current(),
            line: annotation.line,
        });
        self.last_port = Some(port);
    }

    /// Close the build. Any block still open besides the root is an error.
    pub fn finish(self) -> Result<BlockTree, MarkupError> {
        if self.stack.len() > 1 {
            let block = self.tree.block(self.current());
            return Err(MarkupError::UnclosedBlock {
                name: block.name.clone(),
                line: block.line,
                span: block.span.clone(),
            });
        }
        Ok(self.tree)
    }
}
