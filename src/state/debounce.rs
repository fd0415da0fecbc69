use crate::models::NotePatch;

/// Quiet period after the last change before buffered edits are committed.
pub(crate) const COMMIT_QUIET_MS: i64 = 500;

/// Coalesces keystroke-level title/content changes into one commit.
///
/// At most one commit is pending; every change restarts its deadline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct EditDebouncer {
    deadline_ms: Option<i64>,
}

impl EditDebouncer {
    /// Re-evaluates after a change to the buffer.
    ///
    /// Schedules (or reschedules) a commit when the buffer differs from the
    /// confirmed values, cancels when it no longer does, and leaves the
    /// schedule untouched while an input method is composing.
    pub fn on_change(&mut self, dirty: bool, composing: bool, now_ms: i64) {
        if composing {
            return;
        }
        self.deadline_ms = if dirty {
            Some(now_ms + COMMIT_QUIET_MS)
        } else {
            None
        };
    }

    pub fn deadline_ms(&self) -> Option<i64> {
        self.deadline_ms
    }

    pub fn is_due(&self, now_ms: i64) -> bool {
        matches!(self.deadline_ms, Some(d) if now_ms >= d)
    }

    /// Clears the deadline if it has passed. Returns whether it fired.
    pub fn fire(&mut self, now_ms: i64) -> bool {
        if self.is_due(now_ms) {
            self.deadline_ms = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }
}

/// One patch per field whose buffered value differs from the confirmed one.
pub(crate) fn changed_fields(
    title: &str,
    content: &str,
    confirmed_title: &str,
    confirmed_content: &str,
) -> Vec<NotePatch> {
    let mut out = Vec::new();
    if title != confirmed_title {
        out.push(NotePatch::Title(title.to_string()));
    }
    if content != confirmed_content {
        out.push(NotePatch::Content(content.to_string()));
    }
    out
}
