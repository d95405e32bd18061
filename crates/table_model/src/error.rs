//! Error types for document model operations

use crate::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid index {index} for document of length {length}")]
    InvalidIndex { index: usize, length: usize },

    #[error("Tree structure error: {0}")]
    InvalidStructure(String),

    #[error("HTML error: {0}")]
    Html(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
