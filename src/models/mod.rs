use serde::{Deserialize, Serialize};

/// A note as cached on the client.
///
/// Owned by the remote store; the `id` is assigned by the store on creation
/// and is not part of the persisted document body.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub todos: Vec<ChecklistItem>,
    /// ISO-8601 creation timestamp, kept as delivered by the store.
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// Persisted document shape of a note (everything except the id).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NoteFields {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub todos: Vec<ChecklistItem>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl NoteFields {
    /// An empty note stamped with `created_at`.
    pub fn empty(created_at: String) -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            todos: vec![],
            created_at,
        }
    }

    pub fn into_note(self, id: String) -> Note {
        Note {
            id,
            title: self.title,
            content: self.content,
            todos: self.todos,
            created_at: self.created_at,
        }
    }
}

/// A single-field update. The store has no partial-item primitive, so a
/// checklist change always rewrites the whole `todos` array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum NotePatch {
    Title(String),
    Content(String),
    Todos(Vec<ChecklistItem>),
}

impl NotePatch {
    /// Field path as persisted in the document.
    pub fn field_path(&self) -> &'static str {
        match self {
            NotePatch::Title(_) => "title",
            NotePatch::Content(_) => "content",
            NotePatch::Todos(_) => "todos",
        }
    }

    pub fn apply_to(&self, note: &mut Note) {
        match self {
            NotePatch::Title(v) => note.title = v.clone(),
            NotePatch::Content(v) => note.content = v.clone(),
            NotePatch::Todos(v) => note.todos = v.clone(),
        }
    }
}

/// Time-based checklist item id, bumped until it is unique within `existing`.
pub(crate) fn next_checklist_item_id(existing: &[ChecklistItem], now_ms: i64) -> String {
    let mut candidate = now_ms;
    loop {
        let id = candidate.to_string();
        if !existing.iter().any(|item| item.id == id) {
            return id;
        }
        candidate = candidate.saturating_add(1);
    }
}
