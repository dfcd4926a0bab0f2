//! User controls: window input, sort-key selector, direction selector
//!
//! Edits are staged here and only reach [`DashboardSettings`] on apply.

use super::config::{parse_window, DashboardSettings};
use super::sort::{SortDirection, SortKey, SortPreference};

/// Longest window input accepted, in digits
const MAX_WINDOW_DIGITS: usize = 7;

/// Control holding keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Window,
    SortKey,
    Direction,
}

impl Field {
    pub fn next(self) -> Self {
        match self {
            Field::Window => Field::SortKey,
            Field::SortKey => Field::Direction,
            Field::Direction => Field::Window,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Field::Window => Field::Direction,
            Field::SortKey => Field::Window,
            Field::Direction => Field::SortKey,
        }
    }
}

/// Staged control values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlForm {
    window_input: String,
    sort_key: SortKey,
    direction: SortDirection,
    focus: Field,
}

impl ControlForm {
    /// Form showing the current settings
    pub fn from_settings(settings: &DashboardSettings) -> Self {
        Self {
            window_input: settings.window_seconds.to_string(),
            sort_key: settings.sort.key,
            direction: settings.sort.direction,
            focus: Field::default(),
        }
    }

    pub fn window_input(&self) -> &str {
        &self.window_input
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn sort_preference(&self) -> SortPreference {
        SortPreference::new(self.sort_key, self.direction)
    }

    /// Settings the form would apply; bad window input falls back to the default
    pub fn to_settings(&self) -> DashboardSettings {
        DashboardSettings {
            window_seconds: parse_window(&self.window_input),
            sort: self.sort_preference(),
        }
    }

    /// Show applied settings, normalising the window text
    pub fn sync(&mut self, settings: &DashboardSettings) {
        self.window_input = settings.window_seconds.to_string();
        self.sort_key = settings.sort.key;
        self.direction = settings.sort.direction;
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Type a character into the window input; returns whether it was accepted
    pub fn push_char(&mut self, c: char) -> bool {
        if self.focus != Field::Window || !c.is_ascii_digit() || self.window_input.len() >= MAX_WINDOW_DIGITS {
            return false;
        }
        self.window_input.push(c);
        true
    }

    pub fn backspace(&mut self) -> bool {
        self.focus == Field::Window && self.window_input.pop().is_some()
    }

    /// Cycle the focused selector forward
    pub fn select_next(&mut self) -> bool {
        match self.focus {
            Field::Window => false,
            Field::SortKey => {
                self.sort_key = self.sort_key.next();
                true
            }
            Field::Direction => {
                self.direction = self.direction.toggle();
                true
            }
        }
    }

    /// Cycle the focused selector backward
    pub fn select_prev(&mut self) -> bool {
        match self.focus {
            Field::Window => false,
            Field::SortKey => {
                self.sort_key = self.sort_key.prev();
                true
            }
            Field::Direction => {
                self.direction = self.direction.toggle();
                true
            }
        }
    }
}
