mod firestore;
#[cfg(test)]
pub(crate) mod memory;
mod value;

pub(crate) use firestore::FirestoreStore;

use crate::models::{Note, NoteFields, NotePatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum StoreErrorKind {
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    pub(crate) fn network(e: reqwest::Error) -> Self {
        Self {
            kind: StoreErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: StoreErrorKind::Parse,
            message: e.to_string(),
        }
    }

    pub(crate) fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: StoreErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// Called with every delivered snapshot, or with the error that stopped one.
pub(crate) type SnapshotHandler = Box<dyn FnMut(StoreResult<Vec<Note>>)>;

/// A live subscription. Dropping the handle unsubscribes.
pub(crate) struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

/// The hosted document store holding the `notes` collection.
///
/// Snapshots are the full collection ordered newest first by `createdAt`.
#[allow(async_fn_in_trait)]
pub(crate) trait RemoteStore {
    fn subscribe(&self, on_snapshot: SnapshotHandler) -> Subscription;

    /// Creates a document and returns its store-assigned id.
    async fn create(&self, fields: &NoteFields) -> StoreResult<String>;

    async fn update(&self, note_id: &str, patch: &NotePatch) -> StoreResult<()>;

    async fn delete(&self, note_id: &str) -> StoreResult<()>;
}
