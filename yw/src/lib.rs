//! Recover workflow structure from annotated source comments.
//!
//! Comments are scanned for `@begin`/`@end` blocks and `@in`/`@out` ports,
//! assembled into a block tree, and resolved into data-flow channels.

pub mod annotation;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;

pub use annotation::{Annotation, Qualifier};
pub use error::{ConfigError, Error, Result};
pub use extract::{CommentLine, CommentMarker, Extraction, Extractor};
pub use model::{
    Block, BlockId, BlockTree, Channel, ChannelId, Direction, Port, PortId, PortKind, PortLink,
    Workflow,
};
pub use parser::{MarkupError, Parsed, Parser};
