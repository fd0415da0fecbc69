pub(crate) mod controller;
pub(crate) mod debounce;
pub(crate) mod guard;
pub(crate) mod note_sync;
pub(crate) mod projector;

pub(crate) use controller::NotesController;
pub(crate) use note_sync::NoteSync;
pub(crate) use projector::{project, NoteSection};

use crate::store::FirestoreStore;
use leptos::prelude::*;

/// The notes view's sync controller, as shared through context.
pub(crate) type AppSync = NoteSync<FirestoreStore>;

/// Context handle for the view. The controller holds `Rc`s, so it lives in
/// local storage; `changed` fires after every state transition.
#[derive(Clone, Copy)]
pub(crate) struct SyncContext {
    pub sync: StoredValue<AppSync, LocalStorage>,
    pub changed: Trigger,
}

impl SyncContext {
    /// Reads controller state and subscribes the caller to changes.
    pub fn track<R>(&self, f: impl FnOnce(&NotesController) -> R) -> R {
        self.changed.track();
        self.sync.with_value(|s| s.read(f))
    }

    pub fn with<R>(&self, f: impl FnOnce(&AppSync) -> R) -> R {
        self.sync.with_value(f)
    }

    /// Clones the controller out for an async task.
    pub fn handle(&self) -> AppSync {
        self.sync.get_value()
    }
}
