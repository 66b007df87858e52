pub mod error;
pub mod graph;
pub mod ids;
pub mod render;
pub mod view;

pub use error::GraphError;
pub use graph::{Cluster, Edge, Graph, Node, NodeKind};
pub use render::render;
pub use view::View;
