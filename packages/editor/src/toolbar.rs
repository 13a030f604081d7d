//! Read-only summary of the selection for host toolbars

use crate::editor::Editor;
use crate::history::HistoryManager;
use crate::node::{Alignment, BlockType, NodeData, TextFormat};
use crate::state::EditorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolbarState {
    /// Flags active for the whole selection
    pub format: TextFormat,
    /// Alignment of the block holding the anchor
    pub alignment: Option<Alignment>,
    /// Type of the block holding the anchor; list items report their list
    pub block_type: Option<BlockType>,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl ToolbarState {
    pub fn from_state(state: &EditorState, history: &HistoryManager) -> Self {
        let mut toolbar = ToolbarState {
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
            ..Default::default()
        };

        let Some(selection) = state.selection() else {
            return toolbar;
        };

        for flag in TextFormat::all().iter() {
            if selection.has_format(state, flag) {
                toolbar.format |= flag;
            }
        }

        if let Some(block) = state.nearest_block(selection.anchor.key).and_then(|key| state.node(key)) {
            toolbar.alignment = block.align();
            toolbar.block_type = match block.data() {
                NodeData::ListItem(_) => block
                    .parent()
                    .and_then(|list| state.node(list))
                    .and_then(|list| list.block_type()),
                _ => block.block_type(),
            };
        }

        toolbar
    }

    pub fn is_active(&self, format: TextFormat) -> bool {
        self.format.contains(format)
    }
}

impl Editor {
    pub fn toolbar_state(&self) -> ToolbarState {
        ToolbarState::from_state(&self.state(), self.history())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::node::ListType;

    #[test]
    fn test_reports_pending_format_and_block() {
        let mut editor = Editor::default();
        editor.dispatch(Command::ToggleFormat(TextFormat::ITALIC)).unwrap();
        editor.dispatch(Command::InsertText("Hi".into())).unwrap();

        let toolbar = editor.toolbar_state();
        assert!(toolbar.is_active(TextFormat::ITALIC));
        assert!(!toolbar.is_active(TextFormat::BOLD));
        assert_eq!(toolbar.alignment, Some(Alignment::Left));
        assert_eq!(toolbar.block_type, Some(BlockType::Paragraph));
        assert!(toolbar.can_undo);
        assert!(!toolbar.can_redo);
    }

    #[test]
    fn test_list_items_report_their_list() {
        let mut editor = Editor::default();
        editor.dispatch(Command::InsertText("item".into())).unwrap();
        editor.dispatch(Command::InsertList(ListType::Bullet)).unwrap();

        assert_eq!(
            editor.toolbar_state().block_type,
            Some(BlockType::List(ListType::Bullet))
        );
    }
}
