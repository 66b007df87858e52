pub mod builder;
pub mod error;
pub mod tag;

use std::io::BufRead;
use std::path::Path;

pub use builder::{BuildState, build_tree};
pub use error::MarkupError;
pub use tag::{PortDecl, Tag, parse_tag};

use crate::error::Error;
use crate::extract::{Extraction, Extractor};
use crate::model::{BlockTree, DEFAULT_ROOT_NAME, Workflow};

/// The result of a full parse: what was extracted and the resolved model.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub extraction: Extraction,
    pub workflow: Workflow,
}

/// Parser entry point: extraction, tree building and resolution in one call.
pub struct Parser {
    extractor: Extractor,
    root_name: String,
}

impl Parser {
    pub fn new(extractor: Extractor) -> Self {
        Parser {
            extractor,
            root_name: DEFAULT_ROOT_NAME.to_string(),
        }
    }

    /// Name of the implicit top-level block.
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn parse_str(&self, source: &str) -> Result<Parsed, Error> {
        self.parse_reader(source.as_bytes())
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Parsed, Error> {
        let extraction = self.extractor.extract(reader)?;
        self.parse_extraction(extraction)
    }

    pub fn parse_path(&self, path: &Path) -> Result<Parsed, Error> {
        let extraction = self.extractor.extract_path(path)?;
        self.parse_extraction(extraction)
    }

    fn parse_extraction(&self, extraction: Extraction) -> Result<Parsed, Error> {
        let tree = self.build(&extraction)?;
        Ok(Parsed {
            workflow: Workflow::new(tree),
            extraction,
        })
    }

    /// Build the block tree without resolving channels.
    pub fn build(&self, extraction: &Extraction) -> Result<BlockTree, MarkupError> {
        build_tree(&extraction.annotations, &self.root_name)
    }
}
