use crate::feed::{Feed, PageRequest};
use crate::model::{Filter, TaskId, Theme};
use crate::storage::Store;
use crate::tasks::TaskList;
use crate::theme::ThemeController;
use ratatui::widgets::ListState;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Tab {
    Tasks,
    Posts,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum InputMode {
    Normal,
    Creating,
    Searching,
}

pub struct AppState {
    pub tasks: TaskList,
    pub feed: Feed,
    pub theme: ThemeController,
    pub tab: Tab,
    pub task_state: ListState,
    pub post_state: ListState,
    pub message: String,
    pub mode: InputMode,
    pub input_buffer: String,
    pub cursor_position: usize,
    /// Posts that fit in the list area, measured on the last draw.
    pub post_rows: usize,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        let mut t_state = ListState::default();
        t_state.select(Some(0));
        let mut p_state = ListState::default();
        p_state.select(Some(0));
        Self {
            tasks: TaskList::load(store.clone()),
            feed: Feed::new(),
            theme: ThemeController::load(store),
            tab: Tab::Tasks,
            task_state: t_state,
            post_state: p_state,
            message: "Tab: View | a: Add | /: Search | t: Theme | q: Quit".to_string(),
            mode: InputMode::Normal,
            input_buffer: String::new(),
            cursor_position: 0,
            post_rows: 0,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme.theme()
    }

    // --- Input line ---

    pub fn move_cursor_left(&mut self) {
        let cursor_moved_left = self.cursor_position.saturating_sub(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_left);
    }
    pub fn move_cursor_right(&mut self) {
        let cursor_moved_right = self.cursor_position.saturating_add(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_right);
    }
    pub fn enter_char(&mut self, new_char: char) {
        let byte_index = self.byte_index();
        self.input_buffer.insert(byte_index, new_char);
        self.move_cursor_right();
        self.sync_search();
    }
    pub fn delete_char(&mut self) {
        if self.cursor_position != 0 {
            let current_index = self.cursor_position;
            let from_left_to_current_index = current_index - 1;
            let before_char_to_delete = self.input_buffer.chars().take(from_left_to_current_index);
            let after_char_to_delete = self.input_buffer.chars().skip(current_index);
            self.input_buffer = before_char_to_delete.chain(after_char_to_delete).collect();
            self.move_cursor_left();
            self.sync_search();
        }
    }
    pub fn reset_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }
    fn clamp_cursor(&self, new_cursor_pos: usize) -> usize {
        new_cursor_pos.clamp(0, self.input_buffer.chars().count())
    }
    fn byte_index(&self) -> usize {
        self.input_buffer
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.cursor_position)
            .unwrap_or(self.input_buffer.len())
    }
    fn sync_search(&mut self) {
        if self.mode == InputMode::Searching {
            self.feed.set_search_query(self.input_buffer.clone());
            self.post_state.select(Some(0));
        }
    }

    // --- Modes ---

    pub fn start_creating(&mut self) {
        self.tab = Tab::Tasks;
        self.mode = InputMode::Creating;
        self.reset_input();
    }

    pub fn start_searching(&mut self) {
        self.tab = Tab::Posts;
        self.mode = InputMode::Searching;
        self.input_buffer = self.feed.search_query().to_string();
        self.cursor_position = self.input_buffer.chars().count();
    }

    /// Enter in the input line. Creating: adds the task, keeping the text if
    /// it was blank. Searching: leaves the query in place.
    pub fn submit_input(&mut self) {
        match self.mode {
            InputMode::Creating => {
                if self.tasks.add_task(&self.input_buffer).is_some() {
                    self.reset_input();
                    self.mode = InputMode::Normal;
                    self.message = format!("Added. {} active", self.tasks.active_count());
                }
            }
            InputMode::Searching => {
                self.mode = InputMode::Normal;
                self.reset_input();
            }
            InputMode::Normal => {}
        }
    }

    /// Esc in the input line. Cancelling a search clears the query.
    pub fn cancel_input(&mut self) {
        if self.mode == InputMode::Searching {
            self.feed.set_search_query("");
        }
        self.mode = InputMode::Normal;
        self.reset_input();
    }

    // --- Tasks ---

    pub fn selected_task_id(&self) -> Option<TaskId> {
        let idx = self.task_state.selected()?;
        self.tasks.visible_tasks().get(idx).map(|t| t.id)
    }

    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_task_id() {
            self.tasks.toggle_task(id);
            self.clamp_task_selection();
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_task_id() {
            self.tasks.delete_task(id);
            self.message = "Deleted.".to_string();
            self.clamp_task_selection();
        }
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.tasks.set_filter(filter);
        self.task_state.select(Some(0));
        self.message = format!("Filter: {filter}");
    }

    fn clamp_task_selection(&mut self) {
        let len = self.tasks.visible_tasks().len();
        let sel = self.task_state.selected().unwrap_or(0);
        if len == 0 {
            self.task_state.select(Some(0));
        } else if sel >= len {
            self.task_state.select(Some(len - 1));
        }
    }

    // --- Posts ---

    /// The viewport signal: the end of the filtered list is on screen.
    pub fn sentinel_visible(&self) -> bool {
        sentinel_in_view(
            self.post_state.offset(),
            self.post_rows,
            self.feed.filtered_len(),
        )
    }

    /// Polled once per frame on the Posts tab.
    pub fn poll_sentinel(&mut self) -> Option<PageRequest> {
        if self.tab == Tab::Posts && self.feed.sentinel_armed() && self.sentinel_visible() {
            return self.feed.on_sentinel_visible();
        }
        None
    }

    // --- Navigation ---

    fn focused_len(&self) -> usize {
        match self.tab {
            Tab::Tasks => self.tasks.visible_tasks().len(),
            Tab::Posts => self.feed.filtered_len(),
        }
    }

    fn focused_state(&mut self) -> &mut ListState {
        match self.tab {
            Tab::Tasks => &mut self.task_state,
            Tab::Posts => &mut self.post_state,
        }
    }

    pub fn next(&mut self) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let state = self.focused_state();
        let i = match state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let state = self.focused_state();
        let i = match state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn jump_forward(&mut self, step: usize) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let state = self.focused_state();
        let current = state.selected().unwrap_or(0);
        // Clamp to the last item (don't wrap around like next())
        state.select(Some((current + step).min(len - 1)));
    }

    pub fn jump_backward(&mut self, step: usize) {
        if self.focused_len() == 0 {
            return;
        }
        let state = self.focused_state();
        let current = state.selected().unwrap_or(0);
        state.select(Some(current.saturating_sub(step)));
    }

    pub fn toggle_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Tasks => Tab::Posts,
            Tab::Posts => Tab::Tasks,
        }
    }
}

/// True when the last item (or the empty list) is inside the viewport.
pub fn sentinel_in_view(offset: usize, rows: usize, len: usize) -> bool {
    rows > 0 && offset + rows >= len
}
