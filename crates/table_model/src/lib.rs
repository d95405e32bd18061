//! Table Model - Arena document tree with table structural node types
//!
//! This crate provides the document model the table editor works on: an
//! arena tree with stable integer handles, the five table node kinds and the
//! host kinds around them, the node registry with its compaction pass, the
//! row/column coordinate model and the HTML codec.

mod node_id;
mod node;
mod selection;
mod tree;
mod registry;
mod error;
pub mod coords;
pub mod html;

pub use node_id::*;
pub use node::*;
pub use selection::*;
pub use tree::*;
pub use registry::*;
pub use error::*;
pub use coords::*;
pub use html::{from_html, to_html};
