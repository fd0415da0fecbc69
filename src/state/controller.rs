use crate::models::{next_checklist_item_id, ChecklistItem, Note, NoteFields, NotePatch};
use crate::state::debounce::{changed_fields, EditDebouncer};
use crate::state::guard::TypingGuard;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Selection {
    #[default]
    None,
    Note(String),
}

/// In-progress title/content for the selected note, with its guard and
/// debounce state. Reset whenever the selection changes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct EditBuffer {
    pub note_id: String,
    pub title: String,
    pub content: String,
    pub guard: TypingGuard,
    pub debouncer: EditDebouncer,
}

/// Field updates to send for one note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PendingCommit {
    pub note_id: String,
    pub patches: Vec<NotePatch>,
}

/// Synchronous state of the notes view.
///
/// Every handler is a plain transition over this record and takes the
/// current time explicitly; remote calls are returned to the caller, never
/// made from here.
#[derive(Clone, Debug, Default)]
pub(crate) struct NotesController {
    notes: Vec<Note>,
    loaded: bool,
    selection: Selection,
    buffer: EditBuffer,
    checklist_input: String,
    fatal_error: Option<String>,
}

impl NotesController {
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_id(&self) -> Option<&str> {
        match self.selection() {
            Selection::Note(id) => Some(id.as_str()),
            Selection::None => None,
        }
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.selected_id().and_then(|id| self.note(id))
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn checklist_input(&self) -> &str {
        &self.checklist_input
    }

    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.as_deref()
    }

    /// Earliest time a timer must fire to expire `typing` or commit edits.
    pub fn next_deadline_ms(&self) -> Option<i64> {
        match (
            self.buffer.guard.deadline_ms(),
            self.buffer.debouncer.deadline_ms(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn pending_edits(&self) -> Option<PendingCommit> {
        let note = self.note(&self.buffer.note_id)?;
        let patches = changed_fields(
            &self.buffer.title,
            &self.buffer.content,
            &note.title,
            &note.content,
        );
        if patches.is_empty() {
            None
        } else {
            Some(PendingCommit {
                note_id: note.id.clone(),
                patches,
            })
        }
    }

    fn is_dirty(&self) -> bool {
        self.pending_edits().is_some()
    }

    fn reschedule(&mut self, now_ms: i64) {
        let dirty = self.is_dirty();
        let composing = self.buffer.guard.is_composing();
        self.buffer.debouncer.on_change(dirty, composing, now_ms);
    }

    /// Replaces the cache with a delivered snapshot. The selected note's
    /// title/content are copied into the buffer only when the guard allows.
    /// Returns whether the buffer was overwritten.
    pub fn apply_snapshot(&mut self, notes: Vec<Note>, now_ms: i64) -> bool {
        self.loaded = true;
        self.fatal_error = None;
        self.notes = notes;

        if !self.buffer.guard.allows_overwrite() {
            return false;
        }
        let Some(note) = self.selected_note() else {
            return false;
        };
        let (title, content) = (note.title.clone(), note.content.clone());

        let changed = self.buffer.title != title || self.buffer.content != content;
        self.buffer.title = title;
        self.buffer.content = content;
        self.reschedule(now_ms);
        changed
    }

    pub fn subscription_failed(&mut self, message: String) {
        self.fatal_error = Some(message);
    }

    /// Selects `id`, resetting the buffer, flags and checklist entry.
    /// Returns unsaved edits of the previously selected note so they can be
    /// committed instead of dropped.
    pub fn select(&mut self, id: &str) -> Option<PendingCommit> {
        let pending = self.pending_edits();
        self.select_without_flush(Selection::Note(id.to_string()));
        pending
    }

    fn select_without_flush(&mut self, selection: Selection) {
        let (note_id, title, content) = match &selection {
            Selection::Note(id) => {
                let (title, content) = self
                    .note(id)
                    .map(|n| (n.title.clone(), n.content.clone()))
                    .unwrap_or_default();
                (id.clone(), title, content)
            }
            Selection::None => Default::default(),
        };

        self.selection = selection;
        self.buffer = EditBuffer {
            note_id,
            title,
            content,
            ..Default::default()
        };
        self.checklist_input.clear();
    }

    pub fn title_input(&mut self, value: String, now_ms: i64) {
        if self.selected_id().is_none() {
            return;
        }
        self.buffer.title = value;
        self.buffer.guard.keystroke(now_ms);
        self.reschedule(now_ms);
    }

    pub fn content_input(&mut self, value: String, now_ms: i64) {
        if self.selected_id().is_none() {
            return;
        }
        self.buffer.content = value;
        self.buffer.guard.keystroke(now_ms);
        self.reschedule(now_ms);
    }

    /// A partial character must never be committed, so any pending commit
    /// is dropped until the composition ends.
    pub fn composition_start(&mut self) {
        self.buffer.guard.composition_start();
        self.buffer.debouncer.cancel();
    }

    pub fn composition_end(&mut self, now_ms: i64) {
        self.buffer.guard.composition_end(now_ms);
        self.reschedule(now_ms);
    }

    /// Advances timers. Returns the edits to commit when the quiet window
    /// has elapsed.
    pub fn tick(&mut self, now_ms: i64) -> Option<PendingCommit> {
        self.buffer.guard.expire(now_ms);
        if self.buffer.guard.is_composing() {
            return None;
        }
        if !self.buffer.debouncer.fire(now_ms) {
            return None;
        }
        self.pending_edits()
    }

    /// Confirms a committed field in the cache.
    pub fn commit_succeeded(&mut self, note_id: &str, patch: &NotePatch) {
        if let Some(note) = self.notes.iter_mut().find(|n| n.id == note_id) {
            patch.apply_to(note);
        }
    }

    pub fn set_checklist_input(&mut self, value: String) {
        self.checklist_input = value;
    }

    fn rewrite_todos(
        &mut self,
        note_id: &str,
        f: impl FnOnce(&mut Vec<ChecklistItem>) -> bool,
    ) -> Option<NotePatch> {
        let note = self.notes.iter_mut().find(|n| n.id == note_id)?;
        let mut todos = note.todos.clone();
        if !f(&mut todos) {
            return None;
        }
        note.todos = todos.clone();
        Some(NotePatch::Todos(todos))
    }

    /// Appends the trimmed checklist entry text to `note_id`, optimistically.
    pub fn add_item(&mut self, note_id: &str, now_ms: i64) -> Option<NotePatch> {
        let text = self.checklist_input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.rewrite_todos(note_id, |todos| {
            let id = next_checklist_item_id(todos, now_ms);
            todos.push(ChecklistItem {
                id,
                text,
                completed: false,
            });
            true
        })
    }

    /// Entry text is kept until the add is confirmed so a failed add can be retried.
    pub fn item_added(&mut self, note_id: &str) {
        if self.selected_id() == Some(note_id) {
            self.checklist_input.clear();
        }
    }

    pub fn toggle_item(&mut self, note_id: &str, item_id: &str) -> Option<NotePatch> {
        self.rewrite_todos(note_id, |todos| {
            let Some(item) = todos.iter_mut().find(|i| i.id == item_id) else {
                return false;
            };
            item.completed = !item.completed;
            true
        })
    }

    pub fn delete_item(&mut self, note_id: &str, item_id: &str) -> Option<NotePatch> {
        self.rewrite_todos(note_id, |todos| {
            let before = todos.len();
            todos.retain(|i| i.id != item_id);
            todos.len() != before
        })
    }

    /// Caches a freshly created note at the front and selects it. A
    /// successful create also leaves the error screen.
    pub fn note_created(&mut self, id: String, fields: NoteFields) -> Option<PendingCommit> {
        self.fatal_error = None;
        if self.note(&id).is_none() {
            self.notes.insert(0, fields.into_note(id.clone()));
        }
        self.select(&id)
    }

    /// Drops a deleted note. If it was selected, the first remaining note
    /// becomes selected, or nothing when none remain.
    pub fn note_deleted(&mut self, id: &str) {
        self.notes.retain(|n| n.id != id);
        if self.selected_id() != Some(id) {
            return;
        }
        let next = match self.notes.first() {
            Some(n) => Selection::Note(n.id.clone()),
            None => Selection::None,
        };
        self.select_without_flush(next);
    }
}
