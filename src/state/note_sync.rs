use crate::models::{Note, NoteFields, NotePatch};
use crate::state::controller::{NotesController, PendingCommit};
use crate::store::{RemoteStore, StoreError, StoreResult, Subscription};
use crate::util::iso_timestamp;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Raises a blocking, user-visible notification.
pub(crate) type Notifier = Rc<dyn Fn(&str)>;
/// Current time in epoch milliseconds.
pub(crate) type Clock = Rc<dyn Fn() -> i64>;

/// Note sync controller: drives [`NotesController`] against a [`RemoteStore`].
///
/// Responsibilities:
/// - live subscription -> snapshot reconciliation
/// - debounced title/content commits (one update per changed field)
/// - create/delete and checklist read-modify-write
/// - surfacing every failed call through the notifier
///
/// Non-responsibilities:
/// - timers (the view arms one timeout at [`NoteSync::next_deadline_ms`])
///
/// The controller is never borrowed across an await, so snapshots and input
/// events may interleave with in-flight calls.
pub(crate) struct NoteSync<S: RemoteStore> {
    store: Rc<S>,
    state: Rc<RefCell<NotesController>>,
    in_flight: Rc<Cell<usize>>,
    clock: Clock,
    notify: Notifier,
    on_change: Rc<dyn Fn()>,
}

impl<S: RemoteStore> Clone for NoteSync<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            state: self.state.clone(),
            in_flight: self.in_flight.clone(),
            clock: self.clock.clone(),
            notify: self.notify.clone(),
            on_change: self.on_change.clone(),
        }
    }
}

impl<S: RemoteStore + 'static> NoteSync<S> {
    pub fn new(store: S, clock: Clock, notify: Notifier, on_change: Rc<dyn Fn()>) -> Self {
        Self {
            store: Rc::new(store),
            state: Rc::new(RefCell::new(NotesController::default())),
            in_flight: Rc::new(Cell::new(0)),
            clock,
            notify,
            on_change,
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&NotesController) -> R) -> R {
        f(&self.state.borrow())
    }

    fn update<R>(&self, f: impl FnOnce(&mut NotesController) -> R) -> R {
        let out = f(&mut self.state.borrow_mut());
        (self.on_change)();
        out
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    fn fail(&self, ctx: &str, e: StoreError) {
        log::error!("{ctx} ({} error): {e}", e.kind);
        (self.notify)(&format!("{ctx}: {e}"));
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.get() > 0
    }

    pub fn next_deadline_ms(&self) -> Option<i64> {
        self.read(|c| c.next_deadline_ms())
    }

    /// Opens the live view. The subscription lasts as long as the handle.
    pub fn subscribe(&self) -> Subscription {
        let s2 = self.clone();
        let on_snapshot = move |result: StoreResult<Vec<Note>>| match result {
            Ok(notes) => {
                let now = s2.now();
                if s2.update(|c| c.apply_snapshot(notes, now)) {
                    log::debug!("snapshot applied to edit buffer");
                }
            }
            Err(e) => {
                log::error!("note subscription failed ({} error): {e}", e.kind);
                s2.update(|c| c.subscription_failed(e.to_string()));
            }
        };
        self.store.subscribe(Box::new(on_snapshot))
    }

    async fn tracked<T>(
        &self,
        fut: impl std::future::Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        self.in_flight.set(self.in_flight.get() + 1);
        (self.on_change)();
        let out = fut.await;
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
        (self.on_change)();
        out
    }

    async fn commit(&self, pending: PendingCommit) {
        for patch in pending.patches {
            log::debug!("commit {} on {}", patch.field_path(), pending.note_id);
            match self
                .tracked(self.store.update(&pending.note_id, &patch))
                .await
            {
                Ok(()) => self.update(|c| c.commit_succeeded(&pending.note_id, &patch)),
                Err(e) => self.fail("Failed to save note", e),
            }
        }
    }

    pub fn title_input(&self, value: String) {
        let now = self.now();
        self.update(|c| c.title_input(value, now));
    }

    pub fn content_input(&self, value: String) {
        let now = self.now();
        self.update(|c| c.content_input(value, now));
    }

    pub fn composition_start(&self) {
        self.update(|c| c.composition_start());
    }

    pub fn composition_end(&self) {
        let now = self.now();
        self.update(|c| c.composition_end(now));
    }

    pub fn set_checklist_input(&self, value: String) {
        self.update(|c| c.set_checklist_input(value));
    }

    /// Timer callback: expires typing and commits edits whose window elapsed.
    pub async fn tick(&self) {
        let now = self.now();
        if let Some(pending) = self.update(|c| c.tick(now)) {
            self.commit(pending).await;
        }
    }

    pub async fn select(&self, note_id: &str) {
        if let Some(pending) = self.update(|c| c.select(note_id)) {
            self.commit(pending).await;
        }
    }

    pub async fn create_note(&self) {
        let fields = NoteFields::empty(iso_timestamp(self.now()));
        match self.tracked(self.store.create(&fields)).await {
            Ok(id) => {
                log::info!("created note {id}");
                if let Some(pending) = self.update(|c| c.note_created(id, fields)) {
                    self.commit(pending).await;
                }
            }
            Err(e) => self.fail("Failed to create note", e),
        }
    }

    pub async fn delete_note(&self, note_id: &str) {
        match self.tracked(self.store.delete(note_id)).await {
            Ok(()) => {
                log::info!("deleted note {note_id}");
                self.update(|c| c.note_deleted(note_id));
            }
            Err(e) => self.fail("Failed to delete note", e),
        }
    }

    async fn write_todos(&self, note_id: &str, patch: Option<NotePatch>) -> bool {
        let Some(patch) = patch else {
            return false;
        };
        match self.tracked(self.store.update(note_id, &patch)).await {
            Ok(()) => true,
            Err(e) => {
                self.fail("Failed to update checklist", e);
                false
            }
        }
    }

    pub async fn add_item(&self, note_id: &str) {
        let now = self.now();
        let patch = self.update(|c| c.add_item(note_id, now));
        if self.write_todos(note_id, patch).await {
            self.update(|c| c.item_added(note_id));
        }
    }

    pub async fn toggle_item(&self, note_id: &str, item_id: &str) {
        let patch = self.update(|c| c.toggle_item(note_id, item_id));
        self.write_todos(note_id, patch).await;
    }

    pub async fn delete_item(&self, note_id: &str, item_id: &str) {
        let patch = self.update(|c| c.delete_item(note_id, item_id));
        self.write_todos(note_id, patch).await;
    }
}
