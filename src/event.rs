//! Menu event handling.

use crate::command::Command;
use crate::menu::{
    FOCUS_PREFIX, ID_CLEAR_HISTORY, ID_PAUSE, ID_QUIT, ID_RESET, ID_SKIP, ID_START, ID_STRICT,
    TAG_PREFIX, TODO_PREFIX,
};
use crate::models::{Tag, TimerState, TodoItem};

/// What a menu click asks the tray application to do.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// Nothing to do (info lines, unknown ids).
    Continue,
    /// User requested quit.
    Quit,
    /// Forward to the session controller.
    Send(Command),
    /// Strict-mode checkbox flipped; carries the new value.
    StrictChanged(bool),
    /// Flip completion of the todo at this index.
    ToggleTodo(usize),
}

/// Everything a menu click can depend on besides its id.
pub struct EventContext<'a> {
    pub state: &'a TimerState,
    pub strict_mode: bool,
    pub todos: &'a [TodoItem],
}

/// Maps a clicked menu item id to the action it stands for.
pub fn handle_menu_event(id: &str, ctx: &EventContext<'_>) -> EventResult {
    match id {
        ID_START => EventResult::Send(Command::Start),
        ID_PAUSE => EventResult::Send(Command::Pause),
        ID_RESET => EventResult::Send(Command::Reset {
            strict_mode: ctx.strict_mode,
        }),
        ID_SKIP => EventResult::Send(Command::Skip),
        ID_STRICT => EventResult::StrictChanged(!ctx.strict_mode),
        ID_CLEAR_HISTORY => EventResult::Send(Command::ClearHistory),
        ID_QUIT => EventResult::Quit,
        _ => handle_list_item(id, ctx).unwrap_or(EventResult::Continue),
    }
}

/// Handles items of the tag and todo submenus.
fn handle_list_item(id: &str, ctx: &EventContext<'_>) -> Option<EventResult> {
    if let Some(label) = id.strip_prefix(TAG_PREFIX) {
        let tag: Tag = label.parse().unwrap_or_default();
        return Some(EventResult::Send(Command::SetTask {
            task: ctx.state.current_task.clone(),
            tag,
        }));
    }

    if let Some(index) = id.strip_prefix(TODO_PREFIX) {
        let index = index.parse::<usize>().ok()?;
        return (index < ctx.todos.len()).then_some(EventResult::ToggleTodo(index));
    }

    if let Some(index) = id.strip_prefix(FOCUS_PREFIX) {
        let todo = ctx.todos.get(index.parse::<usize>().ok()?)?;
        return Some(EventResult::Send(Command::SetTask {
            task: todo.text.clone(),
            tag: ctx.state.current_tag.clone(),
        }));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todos() -> Vec<TodoItem> {
        vec![TodoItem::new("Write report"), TodoItem::new("Call Bob")]
    }

    fn resolve(id: &str, strict_mode: bool) -> EventResult {
        let state = TimerState {
            current_task: "Inbox".to_string(),
            current_tag: Tag::Study,
            ..TimerState::default()
        };
        let todos = todos();
        let ctx = EventContext {
            state: &state,
            strict_mode,
            todos: &todos,
        };
        handle_menu_event(id, &ctx)
    }

    #[test]
    fn test_controls() {
        assert_eq!(resolve(ID_START, false), EventResult::Send(Command::Start));
        assert_eq!(resolve(ID_PAUSE, false), EventResult::Send(Command::Pause));
        assert_eq!(resolve(ID_SKIP, false), EventResult::Send(Command::Skip));
        assert_eq!(
            resolve(ID_CLEAR_HISTORY, false),
            EventResult::Send(Command::ClearHistory)
        );
        assert_eq!(resolve(ID_QUIT, false), EventResult::Quit);
    }

    #[test]
    fn test_reset_carries_strict_mode() {
        assert_eq!(
            resolve(ID_RESET, true),
            EventResult::Send(Command::Reset { strict_mode: true })
        );
        assert_eq!(
            resolve(ID_RESET, false),
            EventResult::Send(Command::Reset { strict_mode: false })
        );
        assert_eq!(resolve(ID_STRICT, false), EventResult::StrictChanged(true));
    }

    #[test]
    fn test_tag_keeps_current_task() {
        assert_eq!(
            resolve("tag_Other", false),
            EventResult::Send(Command::SetTask {
                task: "Inbox".to_string(),
                tag: Tag::Other,
            })
        );
    }

    #[test]
    fn test_focus_sets_todo_as_task() {
        assert_eq!(
            resolve("focus_1", false),
            EventResult::Send(Command::SetTask {
                task: "Call Bob".to_string(),
                tag: Tag::Study,
            })
        );
        assert_eq!(resolve("focus_7", false), EventResult::Continue);
    }

    #[test]
    fn test_todo_toggle() {
        assert_eq!(resolve("todo_0", false), EventResult::ToggleTodo(0));
        assert_eq!(resolve("todo_2", false), EventResult::Continue);
        assert_eq!(resolve("todo_x", false), EventResult::Continue);
    }

    #[test]
    fn test_info_lines_do_nothing() {
        assert_eq!(resolve("status", false), EventResult::Continue);
        assert_eq!(resolve("progress", false), EventResult::Continue);
    }
}
