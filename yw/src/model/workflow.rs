use super::resolve::{Channel, ChannelId, PortLink, Resolution, resolve};
use super::{Block, BlockId, BlockTree, Port, PortId};

/// A block tree together with its resolved channels.
///
/// Built once, then only read; the renderer takes it by shared reference.
#[derive(Debug, Clone)]
pub struct Workflow {
    tree: BlockTree,
    resolution: Resolution,
}

impl Workflow {
    pub fn new(tree: BlockTree) -> Self {
        let resolution = resolve(&tree);
        Workflow { tree, resolution }
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn block(&self, id: BlockId) -> &Block {
        self.tree.block(id)
    }

    pub fn port(&self, id: PortId) -> &Port {
        self.tree.port(id)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.resolution.channels
    }

    pub fn channel(&self, id: ChannelId) -> &Channel {
        self.resolution.channel(id)
    }

    pub fn open_inputs(&self) -> &[PortId] {
        &self.resolution.open_inputs
    }

    pub fn open_outputs(&self) -> &[PortId] {
        &self.resolution.open_outputs
    }

    /// Child ports that were folded into a matching enclosing declaration.
    pub fn links(&self) -> &[PortLink] {
        &self.resolution.links
    }

    pub fn into_tree(self) -> BlockTree {
        self.tree
    }
}
