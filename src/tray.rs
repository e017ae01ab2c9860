//! Tray icon management for the menubar.

use crate::badge::{Badge, BadgeColor};
use crate::menu::{self, MenuError, MenuItems};
use crate::models::{Tag, TimerState};
use crate::persistence::{Database, StoreExt};
use crate::timer::format_time;
use crate::todos;
use crate::view::Render;
use chrono::Local;
use thiserror::Error;
use tracing::warn;
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

#[derive(Error, Debug)]
pub enum TrayError {
    #[error("Failed to load icon: {0}")]
    IconLoad(#[from] tray_icon::BadIcon),
    #[error("Failed to create tray icon: {0}")]
    Build(#[from] tray_icon::Error),
    #[error(transparent)]
    Menu(#[from] MenuError),
}

const ICON_SIZE: u32 = 22;

/// Draws a filled disc in `color` (22x22, standard macOS tray icon size).
pub fn icon_rgba(color: BadgeColor) -> Vec<u8> {
    let size = ICON_SIZE;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);

    let center = size as f32 / 2.0;
    let radius = (size as f32 / 2.0) - 2.0;

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let distance = (dx * dx + dy * dy).sqrt();

            let alpha = if distance <= radius {
                255
            } else if distance <= radius + 1.0 {
                // Anti-aliased edge
                ((radius + 1.0 - distance) * 255.0) as u8
            } else {
                0
            };
            if alpha == 0 {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
            } else {
                rgba.extend_from_slice(&[color.r, color.g, color.b, alpha]);
            }
        }
    }
    rgba
}

pub fn badge_icon(color: BadgeColor) -> Result<Icon, TrayError> {
    Icon::from_rgba(icon_rgba(color), ICON_SIZE, ICON_SIZE).map_err(TrayError::IconLoad)
}

/// The tray icon and its dropdown, rendered from timer state.
///
/// Holds its own read connection to the store for the sprout count and the
/// todo list, which are not part of the timer state.
pub struct TrayView {
    tray: TrayIcon,
    items: MenuItems,
    store: Database,
    strict_mode: bool,
    color: Option<BadgeColor>,
}

impl TrayView {
    pub fn new(store: Database) -> Result<Self, TrayError> {
        let settings = store.load_settings().unwrap_or_else(|e| {
            warn!("Failed to load settings: {}", e);
            Default::default()
        });
        let state = store
            .load_timer_state()
            .ok()
            .flatten()
            .unwrap_or_else(|| TimerState::new(&settings));
        let todos = todos::list(&store).unwrap_or_default();
        let sprouts_today = sprouts_today(&store);

        let (built_menu, items) = menu::build_menu(&state, &settings, &todos, sprouts_today)?;
        let badge = Badge::for_state(&state);

        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(built_menu))
            .with_icon(badge_icon(badge.color)?)
            .with_title(&badge.text)
            .with_tooltip(tooltip(&state))
            .build()?;

        Ok(Self {
            tray,
            items,
            store,
            strict_mode: settings.strict_mode,
            color: Some(badge.color),
        })
    }

    pub fn items(&self) -> &MenuItems {
        &self.items
    }

    pub fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Records the strict-mode toggle as the new default in the settings.
    pub fn set_strict_mode(&mut self, strict_mode: bool) {
        self.strict_mode = strict_mode;
        self.items.strict.set_checked(strict_mode);

        let result = self.store.load_settings().and_then(|mut settings| {
            settings.strict_mode = strict_mode;
            self.store.save_settings(&settings)
        });
        if let Err(e) = result {
            warn!("Failed to save strict mode: {}", e);
        }
    }

    pub fn select_tag(&self, tag: &Tag) {
        self.items.select_tag(tag);
    }

    pub fn toggle_todo(&mut self, index: usize) {
        if let Err(e) = todos::toggle(&self.store, index) {
            warn!("Failed to toggle todo: {}", e);
        }
        self.refresh_todos();
    }

    /// Shows badge text as the tray title and recolors the icon on change.
    pub fn show_badge(&mut self, badge: &Badge) {
        self.tray.set_title(Some(&badge.text));

        if self.color != Some(badge.color) {
            match badge_icon(badge.color) {
                Ok(icon) => {
                    if let Err(e) = self.tray.set_icon(Some(icon)) {
                        warn!("Failed to set tray icon: {}", e);
                    }
                    self.color = Some(badge.color);
                }
                Err(e) => warn!("{}", e),
            }
        }
    }

    fn refresh_todos(&mut self) {
        match todos::list(&self.store) {
            Ok(todos) => {
                if let Err(e) = self.items.set_todos(&todos) {
                    warn!("Failed to update todo menu: {}", e);
                }
            }
            Err(e) => warn!("Failed to load todos: {}", e),
        }
    }
}

impl Render for TrayView {
    fn render(&mut self, state: &TimerState) {
        self.items.update(state, sprouts_today(&self.store));
        if let Err(e) = self.tray.set_tooltip(Some(tooltip(state))) {
            warn!("Failed to set tooltip: {}", e);
        }
        self.refresh_todos();
    }

    fn report_error(&mut self, error: &str) {
        warn!("Command rejected: {}", error);
    }
}

fn sprouts_today(store: &Database) -> u32 {
    match store.load_sprouts() {
        Ok(sprouts) => sprouts.on(Local::now().date_naive()),
        Err(e) => {
            warn!("Failed to load sprouts: {}", e);
            0
        }
    }
}

fn tooltip(state: &TimerState) -> String {
    format!(
        "FocusFlow - {} {}",
        state.session_type.label(),
        format_time(state.time_remaining)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionType;

    fn pixel(rgba: &[u8], x: u32, y: u32) -> &[u8] {
        let idx = ((y * ICON_SIZE + x) * 4) as usize;
        &rgba[idx..idx + 4]
    }

    #[test]
    fn test_icon_is_colored_disc() {
        let rgba = icon_rgba(BadgeColor::WORK);
        assert_eq!(rgba.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
        assert_eq!(pixel(&rgba, 11, 11), &[0xEF, 0x44, 0x44, 255]);
        assert_eq!(pixel(&rgba, 0, 0), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_break_icon_color() {
        let rgba = icon_rgba(BadgeColor::BREAK);
        assert_eq!(pixel(&rgba, 11, 11), &[0x10, 0xB9, 0x81, 255]);
    }

    #[test]
    fn test_badge_icon() {
        assert!(badge_icon(BadgeColor::WORK).is_ok());
    }

    #[test]
    fn test_tooltip() {
        let state = TimerState {
            session_type: SessionType::ShortBreak,
            time_remaining: 125,
            ..TimerState::default()
        };
        assert_eq!(tooltip(&state), "FocusFlow - Short Break 02:05");
    }
}
