use yw::{BlockId, ChannelId, Workflow};

use super::{block_node, drawn_blocks, graph_name};
use crate::graph::{Cluster, Edge, Graph, Node, NodeKind};
use crate::ids::NodeIds;
use crate::view::View;

pub(super) fn render(workflow: &Workflow, ids: &NodeIds) -> Graph {
    let tree = workflow.tree();
    let mut graph = Graph::new(graph_name(tree), View::Process);

    // Cluster index for every block that has children.
    let mut clusters: Vec<Option<usize>> = vec![None; tree.block_count()];
    for (id, block) in tree.blocks() {
        if id == tree.root() || block.is_leaf() {
            continue;
        }
        let parent = block.parent.and_then(|p| clusters[p.index()]);
        clusters[id.index()] = Some(graph.clusters.len());
        graph.clusters.push(Cluster {
            id: format!("cluster_{}", ids.block(id)),
            label: block.name.clone(),
            parent,
        });
    }

    for (id, block) in drawn_blocks(tree) {
        let cluster = if block.is_leaf() {
            block.parent.and_then(|p| clusters[p.index()])
        } else {
            clusters[id.index()]
        };
        graph.push_node(block_node(ids, id, block, cluster));
    }

    // One edge per producer/consumer block pair, in order of first channel.
    let mut pairs: Vec<(BlockId, BlockId, Vec<ChannelId>)> = Vec::new();
    for (channel_id, channel) in workflow.resolution().iter() {
        let from = channel.from_block(tree);
        let to = channel.to_block(tree);
        match pairs.iter_mut().find(|(f, t, _)| *f == from && *t == to) {
            Some((_, _, channels)) => channels.push(channel_id),
            None => pairs.push((from, to, vec![channel_id])),
        }
    }

    for (from, to, channels) in pairs {
        let mut keys: Vec<&str> = Vec::new();
        for &channel_id in &channels {
            let key = tree.port(workflow.channel(channel_id).producer).key();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        graph.push_edge(Edge {
            from: ids.block(from).to_string(),
            to: ids.block(to).to_string(),
            label: Some(keys.join(", ")),
            channels,
        });
    }

    for &port_id in workflow.open_inputs() {
        let port = tree.port(port_id);
        graph.push_node(boundary_node(ids.port(port_id), port.key()));
        graph.push_edge(Edge {
            from: ids.port(port_id).to_string(),
            to: ids.block(port.block).to_string(),
            label: None,
            channels: Vec::new(),
        });
    }
    for &port_id in workflow.open_outputs() {
        let port = tree.port(port_id);
        graph.push_node(boundary_node(ids.port(port_id), port.key()));
        graph.push_edge(Edge {
            from: ids.block(port.block).to_string(),
            to: ids.port(port_id).to_string(),
            label: None,
            channels: Vec::new(),
        });
    }

    graph
}

fn boundary_node(id: &str, label: &str) -> Node {
    Node {
        id: id.to_string(),
        label: label.to_string(),
        kind: NodeKind::Boundary,
        cluster: None,
    }
}
