pub mod resolve;
pub mod workflow;

use std::fmt;
use std::ops::Range;

pub use resolve::{Channel, ChannelId, PortLink, Resolution, resolve};
pub use workflow::Workflow;

/// Name given to the implicit top-level block when the caller picks none.
pub const DEFAULT_ROOT_NAME: &str = "program";

/// Stable index of a block in its [`BlockTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub const ROOT: BlockId = BlockId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Stable index of a port in its [`BlockTree`]. Ids are handed out in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(usize);

impl PortId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

/// Which annotation declared a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    In,
    Out,
    Param,
    Return,
}

impl PortKind {
    pub fn direction(self) -> Direction {
        match self {
            PortKind::In | PortKind::Param => Direction::In,
            PortKind::Out | PortKind::Return => Direction::Out,
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortKind::In => "in",
            PortKind::Out => "out",
            PortKind::Param => "param",
            PortKind::Return => "return",
        })
    }
}

/// A named data binding declared on a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    /// The value after `=`, if any.
    pub binding: Option<String>,
    pub uri: Option<String>,
    pub kind: PortKind,
    pub description: Option<String>,
    /// The block that declared the port.
    pub block: BlockId,
    pub line: usize,
}

impl Port {
    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    /// The string used for matching: the binding, or the name when unbound.
    pub fn key(&self) -> &str {
        self.binding.as_deref().unwrap_or(&self.name)
    }

    /// True when the two ports refer to the same data.
    pub fn matches(&self, other: &Port) -> bool {
        if self.key() == other.key() {
            return true;
        }
        matches!((&self.uri, &other.uri), (Some(a), Some(b)) if a == b)
    }
}

/// A named computational stage recovered from a `@begin`/`@end` pair.
#[derive(Debug, Clone)]
pub struct Block {
    /// Case-sensitive block name.
    pub name: String,
    pub parent: Option<BlockId>,
    /// Nested blocks in source order.
    pub children: Vec<BlockId>,
    pub in_ports: Vec<PortId>,
    pub out_ports: Vec<PortId>,
    pub params: Vec<PortId>,
    pub description: String,
    /// Line of the `@begin` annotation (0 for the root).
    pub line: usize,
    /// Byte span of the `@begin` annotation.
    pub span: Range<usize>,
}

impl Block {
    fn new(name: String, parent: Option<BlockId>, line: usize, span: Range<usize>) -> Self {
        Block {
            name,
            parent,
            children: Vec::new(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
            params: Vec::new(),
            description: String::new(),
            line,
            span,
        }
    }

    /// Inputs and params in declaration order.
    pub fn inputs(&self) -> Vec<PortId> {
        let mut inputs: Vec<PortId> = self.in_ports.iter().chain(&self.params).copied().collect();
        inputs.sort();
        inputs
    }

    pub fn outputs(&self) -> &[PortId] {
        &self.out_ports
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena holding every block and port of one extraction.
/// Index 0 is always the implicit root block.
#[derive(Debug, Clone)]
pub struct BlockTree {
    blocks: Vec<Block>,
    ports: Vec<Port>,
}

impl BlockTree {
    pub fn new(root_name: impl Into<String>) -> Self {
        BlockTree {
            blocks: vec![Block::new(root_name.into(), None, 0, 0..0)],
            ports: Vec::new(),
        }
    }

    pub fn root(&self) -> BlockId {
        BlockId::ROOT
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    /// Number of blocks, root included.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks opened by `@begin`, i.e. every block except the implicit root.
    pub fn declared_block_count(&self) -> usize {
        let root = self.root();
        self.blocks().filter(|(id, _)| *id != root).count()
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i), b))
    }

    pub fn ports(&self) -> impl Iterator<Item = (PortId, &Port)> {
        self.ports.iter().enumerate().map(|(i, p)| (PortId(i), p))
    }

    /// Nesting depth of a block; the root is at depth 0.
    pub fn depth_of(&self, id: BlockId) -> usize {
        let mut depth = 0;
        let mut current = self.block(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.block(parent).parent;
        }
        depth
    }

    /// Maximum nesting depth of any block.
    pub fn depth(&self) -> usize {
        self.blocks()
            .map(|(id, _)| self.depth_of(id))
            .max()
            .unwrap_or(0)
    }

    /// Names from the outermost non-root ancestor down to `id`.
    /// Empty for the root.
    pub fn path(&self, id: BlockId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(block_id) = current {
            let block = self.block(block_id);
            if block.parent.is_none() {
                break;
            }
            names.push(block.name.as_str());
            current = block.parent;
        }
        names.reverse();
        names
    }

    /// Slash-joined ancestor path; the root's own name for the root.
    pub fn qualified_name(&self, id: BlockId) -> String {
        if id == BlockId::ROOT {
            return self.block(id).name.clone();
        }
        self.path(id).join("/")
    }

    /// Look up the first block with the given slash-joined path.
    pub fn find(&self, path: &str) -> Option<BlockId> {
        self.blocks()
            .map(|(id, _)| id)
            .find(|&id| id != BlockId::ROOT && self.qualified_name(id) == path)
    }

    pub(crate) fn add_block(
        &mut self,
        parent: BlockId,
        name: String,
        line: usize,
        span: Range<usize>,
    ) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block::new(name, Some(parent), line, span));
        self.blocks[parent.0].children.push(id);
        id
    }

    pub(crate) fn add_port(&mut self, port: Port) -> PortId {
        let id = PortId(self.ports.len());
        let block = &mut self.blocks[port.block.0];
        match port.kind {
            PortKind::In => block.in_ports.push(id),
            PortKind::Param => block.params.push(id),
            PortKind::Out | PortKind::Return => block.out_ports.push(id),
        }
        self.ports.push(port);
        id
    }

    pub(crate) fn set_uri(&mut self, id: PortId, uri: String) {
        self.ports[id.0].uri = Some(uri);
    }

    pub(crate) fn append_description(&mut self, id: BlockId, text: &str) {
        if text.is_empty() {
            return;
        }
        let description = &mut self.blocks[id.0].description;
        if !description.is_empty() {
            description.push(' ');
        }
        description.push_str(text);
    }
}
