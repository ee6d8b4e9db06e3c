use crate::model::Theme;
use crate::persisted::Persisted;
use crate::storage::{Store, THEME_KEY};
use tracing::debug;

/// Process-wide light/dark flag persisted under the `theme` slot.
pub struct ThemeController {
    theme: Persisted<Theme>,
}

impl ThemeController {
    pub fn load(store: Store) -> Self {
        Self {
            theme: Persisted::load(store, THEME_KEY, Theme::default()),
        }
    }

    pub fn theme(&self) -> Theme {
        *self.theme
    }

    pub fn toggle(&mut self) -> Theme {
        let next = self.theme.toggled();
        *self.theme.get_mut() = next;
        self.theme.save();
        debug!(?next, "theme toggled");
        next
    }
}
