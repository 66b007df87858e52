//! Data-flow resolution.
//!
//! Within each scope, an input of a block is matched against the outputs of
//! the siblings that come before it. A producer that has not fed anything yet
//! is always preferred; when every matching producer is already used, the
//! earliest one is reused so one output may fan out to several consumers.
//! Ports that stay unmatched in a scope are promoted to the parent and take
//! part in the parent's scope as if the parent had declared them. A promoted
//! port the parent already declares with the same key or URI is linked to
//! that declaration instead, so one piece of data keeps one boundary port.
//! What survives at the root is the open boundary of the workflow.

use tracing::debug;

use super::{BlockId, BlockTree, PortId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(usize);

impl ChannelId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A resolved data-flow edge from an output port to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    pub producer: PortId,
    pub consumer: PortId,
    /// The block whose children were being matched.
    pub scope: BlockId,
}

impl Channel {
    pub fn from_block(&self, tree: &BlockTree) -> BlockId {
        tree.port(self.producer).block
    }

    pub fn to_block(&self, tree: &BlockTree) -> BlockId {
        tree.port(self.consumer).block
    }
}

/// A child's port that stands for the same data as a port declared on an
/// enclosing block. The outer port takes part in matching for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortLink {
    pub inner: PortId,
    pub outer: PortId,
}

/// Output of [`resolve`]: the channels plus the ports nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub channels: Vec<Channel>,
    /// Inputs with no producer anywhere in the program.
    pub open_inputs: Vec<PortId>,
    /// Outputs with no consumer anywhere in the program.
    pub open_outputs: Vec<PortId>,
    pub links: Vec<PortLink>,
}

impl Resolution {
    pub fn channel(&self, id: ChannelId) -> &Channel {
        &self.channels[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &Channel)> {
        self.channels.iter().enumerate().map(|(i, c)| (ChannelId(i), c))
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = ChannelId> {
        (0..self.channels.len()).map(ChannelId)
    }

    /// The enclosing declaration `inner` was linked to, if any.
    pub fn outer_port(&self, inner: PortId) -> Option<PortId> {
        self.links
            .iter()
            .find(|link| link.inner == inner)
            .map(|link| link.outer)
    }
}

/// Match ports across the whole tree. Pure: the tree is only read.
pub fn resolve(tree: &BlockTree) -> Resolution {
    let mut out = Resolution::default();
    let root = tree.root();
    let promoted = resolve_scope(tree, root, &mut out);
    let boundary = effective_ports(tree, root, promoted, &mut out.links);
    out.open_inputs = boundary.inputs;
    out.open_outputs = boundary.outputs;

    debug!(
        channels = out.channels.len(),
        links = out.links.len(),
        open_inputs = out.open_inputs.len(),
        open_outputs = out.open_outputs.len(),
        "resolution finished"
    );

    out
}

#[derive(Debug, Default)]
struct Boundary {
    inputs: Vec<PortId>,
    outputs: Vec<PortId>,
}

struct Producer {
    port: PortId,
    matched: bool,
}

/// Declared ports of `id`, followed by what its children left unmatched
/// and the block does not already declare.
fn effective_ports(
    tree: &BlockTree,
    id: BlockId,
    promoted: Boundary,
    links: &mut Vec<PortLink>,
) -> Boundary {
    let block = tree.block(id);
    Boundary {
        inputs: merge_promoted(tree, block.inputs(), promoted.inputs, links),
        outputs: merge_promoted(tree, block.outputs().to_vec(), promoted.outputs, links),
    }
}

fn merge_promoted(
    tree: &BlockTree,
    mut declared: Vec<PortId>,
    promoted: Vec<PortId>,
    links: &mut Vec<PortLink>,
) -> Vec<PortId> {
    let own = declared.len();
    for inner in promoted {
        let port = tree.port(inner);
        match declared[..own]
            .iter()
            .find(|&&outer| tree.port(outer).matches(port))
            .copied()
        {
            Some(outer) => {
                debug!(
                    inner = %tree.qualified_name(port.block),
                    outer = %tree.qualified_name(tree.port(outer).block),
                    key = port.key(),
                    "linked promoted port"
                );
                links.push(PortLink { inner, outer });
            }
            None => declared.push(inner),
        }
    }
    declared
}

/// Match the children of `scope` against each other and return the ports
/// left over for promotion.
fn resolve_scope(tree: &BlockTree, scope: BlockId, out: &mut Resolution) -> Boundary {
    let mut producers: Vec<Producer> = Vec::new();
    let mut leftover = Boundary::default();

    for &child in &tree.block(scope).children {
        let promoted = resolve_scope(tree, child, out);
        let ports = effective_ports(tree, child, promoted, &mut out.links);

        for input in ports.inputs {
            match pick_producer(tree, &producers, input) {
                Some(index) => {
                    let producer = &mut producers[index];
                    producer.matched = true;
                    debug!(
                        from = %tree.qualified_name(tree.port(producer.port).block),
                        to = %tree.qualified_name(tree.port(input).block),
                        key = tree.port(input).key(),
                        "channel"
                    );
                    out.channels.push(Channel {
                        producer: producer.port,
                        consumer: input,
                        scope,
                    });
                }
                None => leftover.inputs.push(input),
            }
        }

        producers.extend(
            ports
                .outputs
                .into_iter()
                .map(|port| Producer { port, matched: false }),
        );
    }

    leftover.outputs = producers
        .into_iter()
        .filter(|p| !p.matched)
        .map(|p| p.port)
        .collect();

    if !leftover.inputs.is_empty() || !leftover.outputs.is_empty() {
        debug!(
            scope = %tree.qualified_name(scope),
            inputs = leftover.inputs.len(),
            outputs = leftover.outputs.len(),
            "promoting unmatched ports"
        );
    }

    leftover
}

/// Earliest unmatched producer for `input`, else the earliest matching one.
fn pick_producer(tree: &BlockTree, producers: &[Producer], input: PortId) -> Option<usize> {
    let consumer = tree.port(input);
    let mut fallback = None;
    for (index, producer) in producers.iter().enumerate() {
        if !tree.port(producer.port).matches(consumer) {
            continue;
        }
        if !producer.matched {
            return Some(index);
        }
        fallback.get_or_insert(index);
    }
    fallback
}
