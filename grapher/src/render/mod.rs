mod data;
mod process;

use tracing::debug;
use yw::{Block, BlockId, BlockTree, Workflow};

use crate::graph::{Graph, Node, NodeKind};
use crate::ids::NodeIds;
use crate::view::View;

/// Draw a resolved workflow in the requested view. Never touches the model.
pub fn render(workflow: &Workflow, view: View) -> Graph {
    let ids = NodeIds::new(workflow.tree());
    let graph = match view {
        View::Process => process::render(workflow, &ids),
        View::Data => data::render(workflow, &ids),
        View::Combined => combined(workflow, &ids),
    };
    debug!(
        view = %view,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        clusters = graph.clusters.len(),
        "rendered graph"
    );
    graph
}

/// Process graph with the data graph merged in.
fn combined(workflow: &Workflow, ids: &NodeIds) -> Graph {
    let mut graph = process::render(workflow, ids);
    graph.view = View::Combined;

    let data = data::render(workflow, ids);
    for node in data.nodes {
        match graph.nodes.iter_mut().find(|n| n.id == node.id) {
            // Open ports are plain artifacts once data nodes are drawn.
            Some(existing) if existing.kind == NodeKind::Boundary => existing.kind = node.kind,
            Some(_) => {}
            None => graph.nodes.push(node),
        }
    }
    for edge in data.edges {
        graph.push_edge(edge);
    }
    graph
}

fn graph_name(tree: &BlockTree) -> String {
    tree.block(tree.root()).name.clone()
}

/// Blocks drawn as nodes: every non-root block, plus the root when ports
/// were declared outside any block.
fn drawn_blocks(tree: &BlockTree) -> impl Iterator<Item = (BlockId, &Block)> {
    let root = tree.root();
    let root_has_ports = {
        let block = tree.block(root);
        !(block.in_ports.is_empty() && block.out_ports.is_empty() && block.params.is_empty())
    };
    tree.blocks()
        .filter(move |(id, _)| *id != root || root_has_ports)
}

fn block_node(ids: &NodeIds, id: BlockId, block: &Block, cluster: Option<usize>) -> Node {
    Node {
        id: ids.block(id).to_string(),
        label: block.name.clone(),
        kind: NodeKind::Block,
        cluster,
    }
}
