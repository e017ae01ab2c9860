//! Menu building and updating for the tray dropdown.

use crate::models::{RunStatus, Settings, Tag, TimerState, TodoItem, SESSIONS_PER_CYCLE};
use crate::timer::format_time;
use muda::accelerator::Accelerator;
use muda::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem, Submenu};
use thiserror::Error;

// Menu item IDs as constants
pub const ID_STATUS: &str = "status";
pub const ID_SESSION: &str = "session";
pub const ID_PROGRESS: &str = "progress";
pub const ID_TASK: &str = "task";
pub const ID_SPROUTS: &str = "sprouts";
pub const ID_START: &str = "start";
pub const ID_PAUSE: &str = "pause";
pub const ID_RESET: &str = "reset";
pub const ID_SKIP: &str = "skip";
pub const ID_STRICT: &str = "strict";
pub const ID_CLEAR_HISTORY: &str = "clear_history";
pub const ID_QUIT: &str = "quit";

/// Prefix of the tag picker items, followed by the tag label.
pub const TAG_PREFIX: &str = "tag_";
/// Prefix of the todo check items, followed by the list index.
pub const TODO_PREFIX: &str = "todo_";
/// Prefix of the "focus on" items, followed by the list index.
pub const FOCUS_PREFIX: &str = "focus_";

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Menu error: {0}")]
    Muda(#[from] muda::Error),
}

/// Holds references to menu items that need dynamic updates.
pub struct MenuItems {
    pub status: MenuItem,
    pub session: MenuItem,
    pub progress: MenuItem,
    pub task: MenuItem,
    pub sprouts: MenuItem,
    pub start: MenuItem,
    pub pause: MenuItem,
    pub strict: CheckMenuItem,
    pub tag_checks: Vec<(Tag, CheckMenuItem)>,
    todos_menu: Submenu,
    todo_checks: Vec<CheckMenuItem>,
    focus_menu: Submenu,
    focus_items: Vec<MenuItem>,
    shown_todos: Option<Vec<TodoItem>>,
}

/// Builds the complete menu structure.
pub fn build_menu(
    state: &TimerState,
    settings: &Settings,
    todos: &[TodoItem],
    sprouts_today: u32,
) -> Result<(Menu, MenuItems), MenuError> {
    let menu = Menu::new();

    // Info lines (disabled)
    let status = info_item(ID_STATUS, format_status(state));
    let session = info_item(ID_SESSION, format_session(state));
    let progress = info_item(ID_PROGRESS, format_progress(state));
    let task = info_item(ID_TASK, format_task(state));
    menu.append(&status)?;
    menu.append(&session)?;
    menu.append(&progress)?;
    menu.append(&task)?;

    menu.append(&PredefinedMenuItem::separator())?;

    let sprouts = info_item(ID_SPROUTS, format_sprouts(sprouts_today));
    menu.append(&sprouts)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Control buttons
    let start = MenuItem::with_id(
        MenuId::new(ID_START),
        start_label(state),
        !state.is_running,
        None::<Accelerator>,
    );
    let pause = MenuItem::with_id(
        MenuId::new(ID_PAUSE),
        "⏸  Pause",
        state.is_running,
        None::<Accelerator>,
    );
    let reset = MenuItem::with_id(MenuId::new(ID_RESET), "↺  Reset", true, None::<Accelerator>);
    let skip = MenuItem::with_id(MenuId::new(ID_SKIP), "⏭  Skip", true, None::<Accelerator>);
    menu.append(&start)?;
    menu.append(&pause)?;
    menu.append(&reset)?;
    menu.append(&skip)?;

    let strict = CheckMenuItem::with_id(
        MenuId::new(ID_STRICT),
        "Strict Mode",
        true,
        settings.strict_mode,
        None::<Accelerator>,
    );
    menu.append(&strict)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Tag picker
    let tag_menu = Submenu::new("Tag", true);
    let mut tag_checks = Vec::new();
    for tag in Tag::reserved() {
        let item = CheckMenuItem::with_id(
            MenuId::new(format!("{}{}", TAG_PREFIX, tag.as_str())),
            tag.as_str(),
            true,
            tag == state.current_tag,
            None::<Accelerator>,
        );
        tag_menu.append(&item)?;
        tag_checks.push((tag, item));
    }
    menu.append(&tag_menu)?;

    let todos_menu = Submenu::new("Todos", true);
    let focus_menu = Submenu::new("Focus On", true);
    menu.append(&todos_menu)?;
    menu.append(&focus_menu)?;

    menu.append(&PredefinedMenuItem::separator())?;

    let clear = MenuItem::with_id(
        MenuId::new(ID_CLEAR_HISTORY),
        "Clear History",
        true,
        None::<Accelerator>,
    );
    menu.append(&clear)?;

    let quit = MenuItem::with_id(MenuId::new(ID_QUIT), "Quit FocusFlow", true, None::<Accelerator>);
    menu.append(&quit)?;

    let mut items = MenuItems {
        status,
        session,
        progress,
        task,
        sprouts,
        start,
        pause,
        strict,
        tag_checks,
        todos_menu,
        todo_checks: Vec::new(),
        focus_menu,
        focus_items: Vec::new(),
        shown_todos: None,
    };
    items.set_todos(todos)?;

    Ok((menu, items))
}

fn info_item(id: &str, text: String) -> MenuItem {
    MenuItem::with_id(MenuId::new(id), text, false, None::<Accelerator>)
}

impl MenuItems {
    /// Updates the menu items based on the current state.
    pub fn update(&self, state: &TimerState, sprouts_today: u32) {
        self.status.set_text(format_status(state));
        self.session.set_text(format_session(state));
        self.progress.set_text(format_progress(state));
        self.task.set_text(format_task(state));
        self.sprouts.set_text(format_sprouts(sprouts_today));

        self.start.set_text(start_label(state));
        self.start.set_enabled(!state.is_running);
        self.pause.set_enabled(state.is_running);

        self.select_tag(&state.current_tag);
    }

    /// Checks exactly the item of `selected`. muda flips a check item on
    /// click, so this also restores a re-clicked current tag.
    pub fn select_tag(&self, selected: &Tag) {
        sync_tag_checks(&self.tag_checks, selected);
    }

    /// Rebuilds the todo submenus when the list differs from the one shown.
    pub fn set_todos(&mut self, todos: &[TodoItem]) -> Result<(), MenuError> {
        if self.shown_todos.as_deref() == Some(todos) {
            return Ok(());
        }

        for item in self.todo_checks.drain(..) {
            self.todos_menu.remove(&item)?;
        }
        for item in self.focus_items.drain(..) {
            self.focus_menu.remove(&item)?;
        }

        for (index, todo) in todos.iter().enumerate() {
            let check = CheckMenuItem::with_id(
                MenuId::new(format!("{}{}", TODO_PREFIX, index)),
                &todo.text,
                true,
                todo.completed,
                None::<Accelerator>,
            );
            self.todos_menu.append(&check)?;
            self.todo_checks.push(check);

            if !todo.completed {
                let focus = MenuItem::with_id(
                    MenuId::new(format!("{}{}", FOCUS_PREFIX, index)),
                    &todo.text,
                    true,
                    None::<Accelerator>,
                );
                self.focus_menu.append(&focus)?;
                self.focus_items.push(focus);
            }
        }

        self.todos_menu.set_enabled(!self.todo_checks.is_empty());
        self.focus_menu.set_enabled(!self.focus_items.is_empty());
        self.shown_todos = Some(todos.to_vec());
        Ok(())
    }

    pub fn todos(&self) -> &[TodoItem] {
        self.shown_todos.as_deref().unwrap_or_default()
    }
}

fn sync_tag_checks(checks: &[(Tag, CheckMenuItem)], selected: &Tag) {
    for (tag, check) in checks {
        check.set_checked(tag == selected);
    }
}

fn start_label(state: &TimerState) -> &'static str {
    match state.status() {
        RunStatus::Paused => "▶  Resume",
        RunStatus::Idle | RunStatus::Running => "▶  Start",
    }
}

/// Formats the status line for the menu.
pub fn format_status(state: &TimerState) -> String {
    let time = format_time(state.time_remaining);
    let label = state.session_type.label();
    match state.status() {
        RunStatus::Running => format!("⏱  {} - {}", label, time),
        RunStatus::Paused => format!("⏸  {} - {} (paused)", label, time),
        RunStatus::Idle => format!("{} - {}", label, time),
    }
}

/// Formats the cycle position and status text, e.g. `Session 2/4 · Stay focused!`.
pub fn format_session(state: &TimerState) -> String {
    format!(
        "Session {}/{} · {}",
        state.session_number(),
        SESSIONS_PER_CYCLE,
        state.status_text()
    )
}

/// Formats the progress bar for the menu.
pub fn format_progress(state: &TimerState) -> String {
    let pct = state.progress_percent().clamp(0.0, 1.0);
    let filled = (pct * 20.0).round() as usize;
    let empty = 20 - filled;
    format!(
        "{}{}  {}%",
        "█".repeat(filled),
        "░".repeat(empty),
        (pct * 100.0).round() as u32
    )
}

pub fn format_task(state: &TimerState) -> String {
    if state.current_task.is_empty() {
        format!("No task [{}]", state.current_tag)
    } else {
        format!("{} [{}]", state.current_task, state.current_tag)
    }
}

/// Formats today's sprouts for the menu.
pub fn format_sprouts(count: u32) -> String {
    if count == 0 {
        return "Today: —  0 sprouts".to_string();
    }

    let sprouts = "🌱".repeat(count.min(10) as usize);
    let extra = if count > 10 {
        format!("+{}", count - 10)
    } else {
        String::new()
    };
    format!("Today: {}{}  {}", sprouts, extra, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionType;

    fn running(session_type: SessionType, remaining: u32, total: u32) -> TimerState {
        TimerState {
            is_running: true,
            session_type,
            time_remaining: remaining,
            total_time: total,
            ..TimerState::default()
        }
    }

    #[test]
    fn test_format_status_idle() {
        let state = TimerState::default();
        assert_eq!(format_status(&state), "Work Session - 25:00");
    }

    #[test]
    fn test_format_status_running() {
        let state = running(SessionType::Work, 1432, 1500);
        assert_eq!(format_status(&state), "⏱  Work Session - 23:52");
    }

    #[test]
    fn test_format_status_paused() {
        let state = TimerState {
            is_paused: true,
            time_remaining: 600,
            ..TimerState::default()
        };
        assert_eq!(format_status(&state), "⏸  Work Session - 10:00 (paused)");
    }

    #[test]
    fn test_format_status_long_break() {
        let state = running(SessionType::LongBreak, 600, 900);
        assert_eq!(format_status(&state), "⏱  Long Break - 10:00");
    }

    #[test]
    fn test_format_session() {
        let mut state = running(SessionType::Work, 100, 1500);
        state.work_sessions_completed = 5;
        assert_eq!(format_session(&state), "Session 2/4 · Stay focused!");

        let idle = TimerState::default();
        assert_eq!(format_session(&idle), "Session 1/4 · Ready to focus");
    }

    #[test]
    fn test_format_progress_idle() {
        let state = TimerState::default();
        assert_eq!(format_progress(&state), "░░░░░░░░░░░░░░░░░░░░  0%");
    }

    #[test]
    fn test_format_progress_half() {
        let state = running(SessionType::Work, 750, 1500);
        assert_eq!(format_progress(&state), "██████████░░░░░░░░░░  50%");
    }

    #[test]
    fn test_format_progress_complete() {
        let state = running(SessionType::Work, 0, 1500);
        assert_eq!(format_progress(&state), "████████████████████  100%");
    }

    #[test]
    fn test_format_task() {
        let mut state = TimerState::default();
        assert_eq!(format_task(&state), "No task [Work]");
        state.current_task = "Write report".to_string();
        state.current_tag = Tag::Custom("Admin".to_string());
        assert_eq!(format_task(&state), "Write report [Admin]");
    }

    #[test]
    fn test_format_sprouts_empty() {
        assert_eq!(format_sprouts(0), "Today: —  0 sprouts");
    }

    #[test]
    fn test_format_sprouts() {
        assert_eq!(format_sprouts(3), "Today: 🌱🌱🌱  3");
    }

    #[test]
    fn test_format_sprouts_many() {
        let result = format_sprouts(14);
        assert!(result.contains("+4"));
        assert!(result.ends_with("14"));
    }

    #[test]
    fn test_start_label() {
        let paused = TimerState {
            is_paused: true,
            ..TimerState::default()
        };
        assert_eq!(start_label(&paused), "▶  Resume");
        assert_eq!(start_label(&TimerState::default()), "▶  Start");
    }

    #[test]
    fn test_reclicked_tag_stays_checked() {
        let checks: Vec<(Tag, CheckMenuItem)> = Tag::reserved()
            .into_iter()
            .map(|tag| {
                let item = CheckMenuItem::new(tag.as_str(), true, tag == Tag::Work, None);
                (tag, item)
            })
            .collect();

        // A click on the already selected tag unchecks it
        checks[0].1.set_checked(false);
        sync_tag_checks(&checks, &Tag::Work);

        let checked: Vec<bool> = checks.iter().map(|(_, item)| item.is_checked()).collect();
        assert_eq!(checked, vec![true, false, false]);

        sync_tag_checks(&checks, &Tag::Study);
        assert!(!checks[0].1.is_checked());
        assert!(checks[1].1.is_checked());
    }
}
