use crate::model::{Filter, Task, TaskId};
use crate::persisted::Persisted;
use crate::storage::{Store, TASKS_KEY};
use chrono::Utc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// Nothing has been added yet.
    NoTasks,
    /// Tasks exist but none pass the current filter.
    NoMatches,
}

/// The task list: insertion-ordered tasks persisted under the `tasks` slot,
/// plus a transient display filter.
///
/// Every method that changes the task sequence writes it through to the
/// store before returning.
pub struct TaskList {
    tasks: Persisted<Vec<Task>>,
    filter: Filter,
}

impl TaskList {
    pub fn load(store: Store) -> Self {
        let tasks = Persisted::load(store, TASKS_KEY, Vec::new());
        debug!(count = tasks.len(), "task list loaded");
        Self {
            tasks,
            filter: Filter::default(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Appends a task with the trimmed `text`. Blank input is ignored and
    /// yields `None`, as does a list whose newest id leaves no room for a
    /// larger one. The caller clears its input buffer on `Some`.
    pub fn add_task(&mut self, text: &str) -> Option<TaskId> {
        self.add_task_at(text, Utc::now().timestamp_millis())
    }

    pub(crate) fn add_task_at(&mut self, text: &str, now_millis: i64) -> Option<TaskId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let newest = self.tasks.iter().map(|t| t.id).max();
        let Some(id) = next_id(now_millis, newest) else {
            warn!(?newest, "task ids exhausted, not adding");
            return None;
        };
        self.tasks.get_mut().push(Task::new(id, text));
        self.save();
        debug!(id, "task added");
        Some(id)
    }

    pub fn toggle_task(&mut self, id: TaskId) -> bool {
        let Some(task) = self.tasks.get_mut().iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle: no such task");
            return false;
        };
        task.completed = !task.completed;
        self.save();
        true
    }

    pub fn delete_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.get_mut().retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!(id, "delete: no such task");
            return false;
        }
        self.save();
        true
    }

    /// In-memory only; the filter is never persisted.
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| self.filter.matches(t)).collect()
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.tasks.is_empty() {
            Some(EmptyState::NoTasks)
        } else if !self.tasks.iter().any(|t| self.filter.matches(t)) {
            Some(EmptyState::NoMatches)
        } else {
            None
        }
    }

    fn save(&self) {
        self.tasks.save();
    }
}

/// Timestamp ids, bumped past the newest existing id when the clock has not
/// moved on (same millisecond, or a clock that went backwards). `None` when
/// the newest id is already `i64::MAX`.
fn next_id(now_millis: i64, newest: Option<TaskId>) -> Option<TaskId> {
    match newest {
        Some(newest) if newest >= now_millis => newest.checked_add(1),
        _ => Some(now_millis),
    }
}
