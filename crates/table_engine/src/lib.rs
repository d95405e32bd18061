//! Table Engine - Structural table editing on top of a host editor
//!
//! This crate implements the table operations a rich-text editor exposes:
//! inserting tables, inserting and deleting rows and columns, deleting
//! tables, and Tab/Shift+Tab navigation between cells. It reaches the host
//! editor through the [`EditorHost`] trait and ships [`Editor`], an in-memory
//! host.

mod config;
mod editor;
mod error;
mod history;
mod host;
mod menu;
mod navigation;
mod table_commands;

pub use config::*;
pub use editor::*;
pub use error::*;
pub use history::*;
pub use host::*;
pub use menu::*;
pub use navigation::*;
pub use table_commands::*;
