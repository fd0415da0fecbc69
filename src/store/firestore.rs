use crate::config::StoreConfig;
use crate::models::{Note, NoteFields, NotePatch};
use crate::store::value::{self, Document, RunQueryItem};
use crate::store::{RemoteStore, SnapshotHandler, StoreError, StoreResult, Subscription};
use leptos::task::spawn_local;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

const COLLECTION: &str = "notes";
const POLL_INTERVAL_MS: i32 = 2000;

/// Firestore over its REST API.
///
/// REST has no push channel, so the subscription re-runs the ordered query
/// on an interval and only delivers listings that changed. Clones share the
/// write generation, so a listing fetched before one of this client's own
/// writes completed is never delivered.
#[derive(Clone)]
pub(crate) struct FirestoreStore {
    config: StoreConfig,
    client: reqwest::Client,
    poll_interval_ms: i32,
    generation: Rc<Cell<u64>>,
}

impl FirestoreStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            poll_interval_ms: POLL_INTERVAL_MS,
            generation: Rc::new(Cell::new(0)),
        }
    }

    /// Marks every listing requested before now as stale.
    fn record_write(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.config.documents_url(), COLLECTION)
    }

    fn document_url(&self, note_id: &str) -> String {
        format!("{}/{}", self.collection_url(), urlencoding::encode(note_id))
    }

    /// Appends the API key (if any) to a URL that may already carry a query.
    fn with_key(&self, url: String) -> String {
        if self.config.api_key.is_empty() {
            return url;
        }
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}key={}", urlencoding::encode(&self.config.api_key))
    }

    async fn check(res: reqwest::Response, ctx: &str) -> StoreResult<reqwest::Response> {
        if res.status().is_success() {
            Ok(res)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(StoreError::http(status, body, ctx))
        }
    }

    /// Full collection, newest first by `createdAt`.
    pub async fn fetch_notes(&self) -> StoreResult<Vec<Note>> {
        let url = self.with_key(format!("{}:runQuery", self.config.documents_url()));
        let body = serde_json::json!({
            "structuredQuery": {
                "from": [{ "collectionId": COLLECTION }],
                "orderBy": [{
                    "field": { "fieldPath": "createdAt" },
                    "direction": "DESCENDING"
                }]
            }
        });

        let res = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(StoreError::network)?;
        let res = Self::check(res, "Failed to list notes").await?;
        let items: Vec<RunQueryItem> = res.json().await.map_err(StoreError::parse)?;
        value::decode_query(&items)
    }
}

/// What to do with a finished listing request.
#[derive(Debug, PartialEq)]
enum PollOutcome {
    Deliver(StoreResult<Vec<Note>>),
    /// Cancelled, or the same listing as last delivered.
    Ignore,
    /// A write finished while the request was out; the listing may predate it.
    Refetch,
}

/// Bookkeeping for one polling subscription, free of timers and I/O.
struct PollState {
    generation: Rc<Cell<u64>>,
    last: RefCell<Option<Vec<Note>>>,
    in_flight: Cell<bool>,
    cancelled: Cell<bool>,
}

impl PollState {
    fn new(generation: Rc<Cell<u64>>) -> Self {
        Self {
            generation,
            last: RefCell::new(None),
            in_flight: Cell::new(false),
            cancelled: Cell::new(false),
        }
    }

    /// Starts a request unless one is already out or polling has stopped.
    /// Returns the write generation the request was started at.
    fn begin(&self) -> Option<u64> {
        if self.cancelled.get() || self.in_flight.get() {
            return None;
        }
        self.in_flight.set(true);
        Some(self.generation.get())
    }

    fn finish(&self, started_at: u64, result: StoreResult<Vec<Note>>) -> PollOutcome {
        self.in_flight.set(false);
        if self.cancelled.get() {
            return PollOutcome::Ignore;
        }

        match result {
            Ok(notes) => {
                if self.generation.get() != started_at {
                    return PollOutcome::Refetch;
                }
                if self.last.borrow().as_ref() == Some(&notes) {
                    return PollOutcome::Ignore;
                }
                *self.last.borrow_mut() = Some(notes.clone());
                PollOutcome::Deliver(Ok(notes))
            }
            Err(e) => {
                self.cancelled.set(true);
                PollOutcome::Deliver(Err(e))
            }
        }
    }

    fn cancel(&self) {
        self.cancelled.set(true);
    }
}

struct Poller {
    store: FirestoreStore,
    state: PollState,
    on_snapshot: RefCell<SnapshotHandler>,
}

impl Poller {
    fn poll(this: &Rc<Self>) {
        let Some(started_at) = this.state.begin() else {
            return;
        };

        let p = this.clone();
        spawn_local(async move {
            let result = p.store.fetch_notes().await;
            match p.state.finish(started_at, result) {
                PollOutcome::Deliver(Ok(notes)) => {
                    log::debug!("snapshot: {} notes", notes.len());
                    let mut handler = p.on_snapshot.borrow_mut();
                    (*handler)(Ok(notes));
                }
                PollOutcome::Deliver(Err(e)) => {
                    log::error!("subscription stopped ({} error): {e}", e.kind);
                    let mut handler = p.on_snapshot.borrow_mut();
                    (*handler)(Err(e));
                }
                PollOutcome::Refetch => {
                    log::debug!("listing raced a local write, fetching again");
                    Poller::poll(&p);
                }
                PollOutcome::Ignore => {}
            }
        });
    }
}

impl RemoteStore for FirestoreStore {
    fn subscribe(&self, on_snapshot: SnapshotHandler) -> Subscription {
        let poller = Rc::new(Poller {
            store: self.clone(),
            state: PollState::new(self.generation.clone()),
            on_snapshot: RefCell::new(on_snapshot),
        });
        Poller::poll(&poller);

        let Some(win) = web_sys::window() else {
            return Subscription::new(move || poller.state.cancel());
        };

        let p2 = poller.clone();
        let cb = Closure::wrap(Box::new(move || {
            Poller::poll(&p2);
        }) as Box<dyn FnMut()>);

        let tid = win
            .set_interval_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                self.poll_interval_ms,
            )
            .unwrap_or(0);

        Subscription::new(move || {
            poller.state.cancel();
            if let Some(win) = web_sys::window() {
                win.clear_interval_with_handle(tid);
            }
            drop(cb);
        })
    }

    async fn create(&self, fields: &NoteFields) -> StoreResult<String> {
        let url = self.with_key(self.collection_url());
        let res = self
            .client
            .post(url)
            .json(&value::encode_fields(fields))
            .send()
            .await
            .map_err(StoreError::network)?;
        let res = Self::check(res, "Failed to create note").await?;
        self.record_write();
        let doc: Document = res.json().await.map_err(StoreError::parse)?;
        value::document_id(&doc.name)
    }

    async fn update(&self, note_id: &str, patch: &NotePatch) -> StoreResult<()> {
        let url = self.with_key(format!(
            "{}?updateMask.fieldPaths={}&currentDocument.exists=true",
            self.document_url(note_id),
            patch.field_path()
        ));
        let res = self
            .client
            .patch(url)
            .json(&value::encode_patch(patch))
            .send()
            .await
            .map_err(StoreError::network)?;
        Self::check(res, "Failed to update note").await?;
        self.record_write();
        Ok(())
    }

    async fn delete(&self, note_id: &str) -> StoreResult<()> {
        let url = self.with_key(self.document_url(note_id));
        let res = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(StoreError::network)?;
        Self::check(res, "Failed to delete note").await?;
        self.record_write();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_key: &str) -> FirestoreStore {
        FirestoreStore::new(StoreConfig {
            api_key: api_key.to_string(),
            project_id: "demo".to_string(),
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_document_url_encodes_id() {
        assert_eq!(
            store("").document_url("a b"),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents/notes/a%20b"
        );
    }

    #[test]
    fn test_with_key_appends_to_existing_query() {
        let s = store("k1");
        assert_eq!(s.with_key("u".to_string()), "u?key=k1");
        assert_eq!(s.with_key("u?a=1".to_string()), "u?a=1&key=k1");
    }

    #[test]
    fn test_with_key_skips_missing_key() {
        assert_eq!(store("").with_key("u".to_string()), "u");
    }

    fn note(id: &str, title: &str) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: String::new(),
            todos: vec![],
            created_at: "2024-05-01T10:00:00.000Z".to_string(),
        }
    }

    fn poll_state(store: &FirestoreStore) -> PollState {
        PollState::new(store.generation.clone())
    }

    #[test]
    fn test_poll_delivers_only_changed_listings() {
        let s = store("");
        let state = poll_state(&s);

        let started = state.begin().expect("idle");
        assert_eq!(
            state.finish(started, Ok(vec![note("a", "A")])),
            PollOutcome::Deliver(Ok(vec![note("a", "A")]))
        );

        let started = state.begin().expect("idle");
        assert_eq!(state.finish(started, Ok(vec![note("a", "A")])), PollOutcome::Ignore);

        let started = state.begin().expect("idle");
        assert_eq!(
            state.finish(started, Ok(vec![note("a", "A2")])),
            PollOutcome::Deliver(Ok(vec![note("a", "A2")]))
        );
    }

    #[test]
    fn test_poll_skips_while_request_outstanding() {
        let state = poll_state(&store(""));
        let started = state.begin().expect("idle");
        assert_eq!(state.begin(), None);

        state.finish(started, Ok(vec![]));
        assert!(state.begin().is_some());
    }

    #[test]
    fn test_poll_result_after_cancel_is_dropped() {
        let state = Rc::new(poll_state(&store("")));
        let started = state.begin().expect("idle");

        let s2 = state.clone();
        drop(Subscription::new(move || s2.cancel()));

        assert_eq!(state.finish(started, Ok(vec![note("a", "A")])), PollOutcome::Ignore);
        assert_eq!(state.begin(), None);
    }

    #[test]
    fn test_poll_error_is_delivered_once_then_polling_stops() {
        let state = poll_state(&store(""));
        let started = state.begin().expect("idle");
        let err = StoreError::parse("bad listing");

        assert_eq!(state.finish(started, Err(err.clone())), PollOutcome::Deliver(Err(err)));
        assert_eq!(state.begin(), None);
    }

    #[test]
    fn test_listing_started_before_own_write_is_refetched() {
        let s = store("");
        let state = poll_state(&s);

        // Request goes out, then a commit of "hello" succeeds before it returns.
        let started = state.begin().expect("idle");
        s.record_write();
        assert_eq!(state.finish(started, Ok(vec![note("a", "")])), PollOutcome::Refetch);

        // The follow-up request starts after the write and is delivered.
        let started = state.begin().expect("idle after refetch");
        assert_eq!(
            state.finish(started, Ok(vec![note("a", "hello")])),
            PollOutcome::Deliver(Ok(vec![note("a", "hello")]))
        );
    }

    #[test]
    fn test_store_clones_share_write_generation() {
        let s = store("");
        let state = poll_state(&s);
        let started = state.begin().expect("idle");
        s.clone().record_write();
        assert_eq!(state.finish(started, Ok(vec![])), PollOutcome::Refetch);
    }
}
