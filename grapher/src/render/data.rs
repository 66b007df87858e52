use yw::{ChannelId, PortId, Workflow};

use super::{block_node, drawn_blocks, graph_name};
use crate::graph::{Edge, Graph, Node, NodeKind};
use crate::ids::NodeIds;
use crate::view::View;

pub(super) fn render(workflow: &Workflow, ids: &NodeIds) -> Graph {
    let tree = workflow.tree();
    let mut graph = Graph::new(graph_name(tree), View::Data);

    for (id, block) in drawn_blocks(tree) {
        graph.push_node(block_node(ids, id, block, None));
    }

    // Each producing port is one artifact, whatever number of consumers.
    let mut artifacts: Vec<(PortId, Vec<ChannelId>)> = Vec::new();
    for (channel_id, channel) in workflow.resolution().iter() {
        match artifacts.iter_mut().find(|(p, _)| *p == channel.producer) {
            Some((_, channels)) => channels.push(channel_id),
            None => artifacts.push((channel.producer, vec![channel_id])),
        }
    }

    for (producer, channels) in artifacts {
        let port = tree.port(producer);
        let artifact = ids.port(producer);
        graph.push_node(artifact_node(artifact, port.key()));
        graph.push_edge(Edge {
            from: ids.block(port.block).to_string(),
            to: artifact.to_string(),
            label: None,
            channels: channels.clone(),
        });
        for channel_id in channels {
            let consumer = tree.port(workflow.channel(channel_id).consumer);
            graph.push_edge(Edge {
                from: artifact.to_string(),
                to: ids.block(consumer.block).to_string(),
                label: None,
                channels: vec![channel_id],
            });
        }
    }

    for &port_id in workflow.open_outputs() {
        let port = tree.port(port_id);
        graph.push_node(artifact_node(ids.port(port_id), port.key()));
        graph.push_edge(Edge {
            from: ids.block(port.block).to_string(),
            to: ids.port(port_id).to_string(),
            label: None,
            channels: Vec::new(),
        });
    }
    for &port_id in workflow.open_inputs() {
        let port = tree.port(port_id);
        graph.push_node(artifact_node(ids.port(port_id), port.key()));
        graph.push_edge(Edge {
            from: ids.port(port_id).to_string(),
            to: ids.block(port.block).to_string(),
            label: None,
            channels: Vec::new(),
        });
    }

    graph
}

fn artifact_node(id: &str, label: &str) -> Node {
    Node {
        id: id.to_string(),
        label: label.to_string(),
        kind: NodeKind::Artifact,
        cluster: None,
    }
}
