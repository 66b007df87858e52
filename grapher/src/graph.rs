use std::collections::BTreeSet;
use std::fmt;

use yw::ChannelId;

use crate::view::View;

/// A rendered graph, ready to be written out as DOT.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    pub name: String,
    pub view: View,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A block (process).
    Block,
    /// A data artifact passed along one or more channels.
    Artifact,
    /// An open port of the whole program, drawn in the process view.
    Boundary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    /// Index into [`Graph::clusters`].
    pub cluster: Option<usize>,
}

/// A subgraph grouping the nodes of a nested block.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    pub parent: Option<usize>,
}

/// A directed edge from producer to consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    /// Channels this edge stands for. Empty for edges to the open boundary.
    pub channels: Vec<ChannelId>,
}

impl Graph {
    pub fn new(name: impl Into<String>, view: View) -> Self {
        Graph {
            name: name.into(),
            view,
            nodes: Vec::new(),
            edges: Vec::new(),
            clusters: Vec::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }

    pub fn edges_between(&self, from: &str, to: &str) -> usize {
        self.edges.iter().filter(|e| e.from == from && e.to == to).count()
    }

    /// Every channel referenced by some edge.
    pub fn channel_ids(&self) -> BTreeSet<ChannelId> {
        self.edges
            .iter()
            .flat_map(|e| e.channels.iter().copied())
            .collect()
    }

    pub(crate) fn push_node(&mut self, node: Node) {
        if self.node(&node.id).is_none() {
            self.nodes.push(node);
        }
    }

    pub(crate) fn push_edge(&mut self, edge: Edge) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Render as Graphviz DOT.
    pub fn to_dot(&self) -> String {
        self.to_string()
    }

    fn write_cluster(&self, f: &mut fmt::Formatter<'_>, index: usize, depth: usize) -> fmt::Result {
        let cluster = &self.clusters[index];
        let pad = "    ".repeat(depth);
        writeln!(f, "{}subgraph {} {{", pad, quote(&cluster.id))?;
        writeln!(f, "{}    label={};", pad, quote(&cluster.label))?;
        self.write_members(f, Some(index), depth + 1)?;
        writeln!(f, "{}}}", pad)
    }

    /// Nodes and nested clusters that belong directly to `cluster`.
    fn write_members(
        &self,
        f: &mut fmt::Formatter<'_>,
        cluster: Option<usize>,
        depth: usize,
    ) -> fmt::Result {
        let pad = "    ".repeat(depth);
        for node in self.nodes.iter().filter(|n| n.cluster == cluster) {
            writeln!(f, "{}{} [{}];", pad, quote(&node.id), node_attributes(node))?;
        }
        for (index, _) in self
            .clusters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.parent == cluster)
        {
            self.write_cluster(f, index, depth)?;
        }
        Ok(())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {} {{", quote(&self.name))?;
        writeln!(f, "    rankdir=LR;")?;
        writeln!(f, "    fontname=Helvetica;")?;
        writeln!(f, "    node [fontname=Helvetica];")?;
        writeln!(f, "    edge [fontname=Helvetica];")?;
        self.write_members(f, None, 1)?;
        for edge in &self.edges {
            write!(f, "    {} -> {}", quote(&edge.from), quote(&edge.to))?;
            if let Some(label) = &edge.label {
                write!(f, " [label={}]", quote(label))?;
            }
            writeln!(f, ";")?;
        }
        writeln!(f, "}}")
    }
}

fn node_attributes(node: &Node) -> String {
    let style = match node.kind {
        NodeKind::Block => "shape=box, style=filled, fillcolor=\"#CCFFCC\"",
        NodeKind::Artifact => "shape=box, style=\"rounded,filled\", fillcolor=\"#FFFFCC\"",
        NodeKind::Boundary => "shape=plaintext",
    };
    format!("label={}, {}", quote(&node.label), style)
}

/// Quote a DOT identifier or label.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
