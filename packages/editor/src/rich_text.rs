//! Default handlers for the editing commands
//!
//! Each handler validates its payload, then runs the matching
//! [`mutations`](crate::mutations) operation in a single update.

use crate::commands::{Command, CommandKind, CommandPriority, CommandRegistration};
use crate::editor::Editor;
use crate::errors::EditorError;
use crate::mutations;
use crate::node::DecoratorPayload;
use crate::transaction::UpdateTag;

/// Register the rich-text handlers at editor priority
pub fn register_rich_text(editor: &mut Editor) -> Vec<CommandRegistration> {
    let mut registrations = Vec::new();
    let mut register = |kind, handler: fn(&mut Editor, &Command) -> Result<bool, EditorError>| {
        registrations.push(editor.register_command(kind, CommandPriority::Editor, handler));
    };

    register(CommandKind::InsertText, insert_text);
    register(CommandKind::DeleteBackward, |editor, _| {
        editor.update(mutations::delete_backward)?;
        Ok(true)
    });
    register(CommandKind::InsertParagraph, |editor, _| {
        editor.update(mutations::insert_paragraph)?;
        Ok(true)
    });
    register(CommandKind::ToggleFormat, |editor, command| {
        let Command::ToggleFormat(flag) = command else {
            return Ok(false);
        };
        if flag.is_empty() {
            return Err(EditorError::invalid_payload("toggle-format", "no format flag given"));
        }
        let flag = *flag;
        editor.update(move |tx| mutations::toggle_format(tx, flag))?;
        Ok(true)
    });
    register(CommandKind::SetAlignment, |editor, command| {
        let Command::SetAlignment(align) = command else {
            return Ok(false);
        };
        let align = *align;
        editor.update(move |tx| mutations::set_alignment(tx, align))?;
        Ok(true)
    });
    register(CommandKind::SetBlockType, |editor, command| {
        let Command::SetBlockType(block_type) = command else {
            return Ok(false);
        };
        let block_type = *block_type;
        editor.update(move |tx| mutations::set_block_type(tx, block_type))?;
        Ok(true)
    });
    register(CommandKind::InsertList, |editor, command| {
        let Command::InsertList(list_type) = command else {
            return Ok(false);
        };
        let list_type = *list_type;
        editor.update(move |tx| mutations::insert_list(tx, list_type))?;
        Ok(true)
    });
    register(CommandKind::RemoveList, |editor, _| {
        editor.update(mutations::remove_list)?;
        Ok(true)
    });
    register(CommandKind::InsertDecorator, insert_decorator);
    register(CommandKind::DuplicateBlock, |editor, _| {
        editor.update(mutations::duplicate_block)?;
        Ok(true)
    });

    registrations
}

/// Newlines become paragraph breaks. A single character is low
/// significance so typing bursts coalesce in history.
fn insert_text(editor: &mut Editor, command: &Command) -> Result<bool, EditorError> {
    let Command::InsertText(text) = command else {
        return Ok(false);
    };

    let tag = if text.chars().count() == 1 && text != "\n" {
        UpdateTag::low()
    } else {
        UpdateTag::high()
    };
    let text = text.clone();
    editor.update_with(tag, move |tx| {
        for (ix, line) in text.split('\n').enumerate() {
            if ix > 0 {
                mutations::insert_paragraph(tx)?;
            }
            mutations::insert_text(tx, line)?;
        }
        Ok(())
    })?;
    Ok(true)
}

fn insert_decorator(editor: &mut Editor, command: &Command) -> Result<bool, EditorError> {
    let Command::InsertDecorator(payload) = command else {
        return Ok(false);
    };

    match payload {
        DecoratorPayload::Image(image) => {
            if image.src.trim().is_empty() {
                return Err(EditorError::invalid_payload("insert-decorator", "image src must not be empty"));
            }
        }
    }

    let payload = payload.clone();
    editor.update(move |tx| mutations::insert_decorator(tx, payload))?;
    Ok(true)
}
