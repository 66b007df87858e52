#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("unknown view `{0}`; expected one of: process, data, combined")]
    UnknownView(String),
}
