//! In-memory editor host
//!
//! [`Editor`] is a minimal host for the table engine: it owns the document
//! tree, the node registry, a caret/selection and history bookkeeping, and
//! keeps a log of forced re-renders. It has no text attributes and no undo
//! stack.

use crate::{
    ChangeSource, EditOutcome, EditorHost, HistoryState, KeyEvent, KeyHandling, Result,
    TableCommand, TableConfig,
};
use table_model::{DocumentTree, NodeRegistry, Selection};

/// An editor holding one document
#[derive(Debug, Clone)]
pub struct Editor {
    tree: DocumentTree,
    registry: NodeRegistry,
    config: TableConfig,
    /// `None` while the editor does not have focus
    selection: Option<Selection>,
    history: HistoryState,
    renders: Vec<ChangeSource>,
}

impl Editor {
    /// Create an editor with one empty line and default settings
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            tree: DocumentTree::with_empty_paragraph(),
            registry: NodeRegistry::new(),
            config,
            selection: None,
            history: HistoryState::new(),
            renders: Vec::new(),
        }
    }

    /// Load a document from its HTML form
    pub fn from_html(html: &str, config: TableConfig) -> Result<Self> {
        let registry = NodeRegistry::new();
        let tree = table_model::from_html(html, &registry)?;
        Ok(Self {
            tree,
            registry,
            ..Self::with_config(config)
        })
    }

    /// Serialize the document to HTML
    pub fn to_html(&self) -> Result<String> {
        Ok(table_model::to_html(&self.tree, &self.registry)?)
    }

    /// Plain text of the document, one `\n` per line
    pub fn text(&self) -> String {
        self.tree.text_content(self.tree.root())
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Drop focus; table operations become no-ops until a selection is set
    pub fn blur(&mut self) {
        self.selection = None;
    }

    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    /// Sources of every forced re-render so far
    pub fn renders(&self) -> &[ChangeSource] {
        &self.renders
    }

    /// Insert text at a flat index and put the caret after it
    pub fn insert_text(&mut self, index: usize, text: &str) -> Result<()> {
        self.tree.insert_text(index, text)?;
        self.history.record();
        let caret = index + text.chars().count();
        self.set_selection(caret, 0);
        Ok(())
    }

    /// Run a table command against the cursor position
    pub fn execute(&mut self, command: &TableCommand) -> Result<EditOutcome> {
        command.apply(self)
    }

    /// Offer a key press to the table navigation controller
    pub fn handle_key(&mut self, event: KeyEvent) -> Result<KeyHandling> {
        crate::handle_key(self, event)
    }

    fn clamp_selection(&mut self) {
        let length = self.tree.document_length();
        self.selection = self.selection.map(|s| s.clamped(length));
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorHost for Editor {
    fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut DocumentTree {
        &mut self.tree
    }

    fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    fn config(&self) -> &TableConfig {
        &self.config
    }

    fn selection_index(&self) -> Option<usize> {
        self.selection.map(|s| s.index)
    }

    fn set_selection(&mut self, index: usize, length: usize) {
        let doc_length = self.tree.document_length();
        self.selection = Some(Selection::new(index, length).clamped(doc_length));
    }

    fn force_rerender(&mut self, source: ChangeSource) -> Result<()> {
        let repairs = self.registry.compact(&mut self.tree)?;
        if repairs > 0 {
            tracing::trace!(repairs, "compaction before re-render");
        }
        self.renders.push(source);
        self.clamp_selection();
        Ok(())
    }

    fn suspend_history(&mut self) {
        self.history.suspend();
    }

    fn resume_history(&mut self) {
        self.history.resume();
    }

    fn delete_range(&mut self, index: usize, length: usize) -> Result<()> {
        self.tree.delete_range(index, length, &self.registry)?;
        self.history.record();
        self.clamp_selection();
        Ok(())
    }
}
