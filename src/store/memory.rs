use crate::models::{Note, NoteFields, NotePatch};
use crate::store::{
    RemoteStore, SnapshotHandler, StoreError, StoreErrorKind, StoreResult, Subscription,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Create(NoteFields),
    Update(String, NotePatch),
    Delete(String),
}

#[derive(Default)]
struct Inner {
    notes: Vec<Note>,
    next_id: u64,
    next_sub: u64,
    subscribers: Vec<(u64, SnapshotHandler)>,
    calls: Vec<Call>,
    fail_next: Option<String>,
    fail_subscribe: Option<String>,
}

/// In-process store for tests. Mutations apply immediately but snapshots are
/// only pushed when the test calls [`MemoryStore::push_snapshot`], so tests
/// control exactly when the echo arrives.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryStore {
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().notes = notes;
        store
    }

    /// Fails the next create/update/delete with `message`.
    pub fn fail_next(&self, message: &str) {
        self.inner.borrow_mut().fail_next = Some(message.to_string());
    }

    pub fn fail_subscribe(&self, message: &str) {
        self.inner.borrow_mut().fail_subscribe = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Simulates a write from another session.
    pub fn write_remote(&self, note_id: &str, patch: NotePatch) {
        let mut inner = self.inner.borrow_mut();
        if let Some(note) = inner.notes.iter_mut().find(|n| n.id == note_id) {
            patch.apply_to(note);
        }
    }

    fn ordered(&self) -> Vec<Note> {
        let mut notes = self.inner.borrow().notes.clone();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes
    }

    /// Delivers the current collection to every subscriber.
    pub fn push_snapshot(&self) {
        let snapshot = self.ordered();
        let mut subs = std::mem::take(&mut self.inner.borrow_mut().subscribers);
        for (_, handler) in subs.iter_mut() {
            handler(Ok(snapshot.clone()));
        }
        let mut inner = self.inner.borrow_mut();
        subs.append(&mut inner.subscribers);
        inner.subscribers = subs;
    }

    fn record(&self, call: Call) -> StoreResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(call);
        match inner.fail_next.take() {
            Some(message) => Err(StoreError {
                kind: StoreErrorKind::Network,
                message,
            }),
            None => Ok(()),
        }
    }
}

impl RemoteStore for MemoryStore {
    fn subscribe(&self, mut on_snapshot: SnapshotHandler) -> Subscription {
        let failure = self.inner.borrow_mut().fail_subscribe.take();
        if let Some(message) = failure {
            on_snapshot(Err(StoreError {
                kind: StoreErrorKind::Http,
                message,
            }));
            return Subscription::new(|| {});
        }

        on_snapshot(Ok(self.ordered()));

        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_sub += 1;
            let id = inner.next_sub;
            inner.subscribers.push((id, on_snapshot));
            id
        };

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }

    async fn create(&self, fields: &NoteFields) -> StoreResult<String> {
        self.record(Call::Create(fields.clone()))?;
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = format!("note-{}", inner.next_id);
        inner.notes.push(fields.clone().into_note(id.clone()));
        Ok(id)
    }

    async fn update(&self, note_id: &str, patch: &NotePatch) -> StoreResult<()> {
        self.record(Call::Update(note_id.to_string(), patch.clone()))?;
        let mut inner = self.inner.borrow_mut();
        if let Some(note) = inner.notes.iter_mut().find(|n| n.id == note_id) {
            patch.apply_to(note);
        }
        Ok(())
    }

    async fn delete(&self, note_id: &str) -> StoreResult<()> {
        self.record(Call::Delete(note_id.to_string()))?;
        self.inner.borrow_mut().notes.retain(|n| n.id != note_id);
        Ok(())
    }
}
