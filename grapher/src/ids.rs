use std::collections::HashSet;

use yw::{BlockId, BlockTree, PortId};

/// Collision-free node ids for every block and port of a tree.
///
/// Blocks are named by their slash-joined ancestor path, ports by
/// `<block path>#<port name>`. Anything that still collides gets a `~N`
/// suffix, assigned in arena order so the result is deterministic.
#[derive(Debug, Clone)]
pub struct NodeIds {
    blocks: Vec<String>,
    ports: Vec<String>,
}

impl NodeIds {
    pub fn new(tree: &BlockTree) -> Self {
        let mut used = HashSet::new();
        let mut blocks = vec![String::new(); tree.block_count()];

        // The root rarely appears in output, so it yields to real blocks.
        for (id, _) in tree.blocks().filter(|(id, _)| *id != tree.root()) {
            blocks[id.index()] = allocate(&mut used, tree.qualified_name(id));
        }
        blocks[tree.root().index()] = allocate(&mut used, tree.qualified_name(tree.root()));

        let ports = tree
            .ports()
            .map(|(_, port)| {
                allocate(
                    &mut used,
                    format!("{}#{}", tree.qualified_name(port.block), port.name),
                )
            })
            .collect();

        NodeIds { blocks, ports }
    }

    pub fn block(&self, id: BlockId) -> &str {
        &self.blocks[id.index()]
    }

    pub fn port(&self, id: PortId) -> &str {
        &self.ports[id.index()]
    }
}

fn allocate(used: &mut HashSet<String>, base: String) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}~{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
