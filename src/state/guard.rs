/// Quiet period after the last keystroke during which the user counts as typing.
pub(crate) const TYPING_WINDOW_MS: i64 = 800;

/// Keeps incoming snapshots from overwriting fields the user is editing.
///
/// `composing` is true while an input method assembles a character;
/// `typing` is true until [`TYPING_WINDOW_MS`] after the most recent
/// keystroke. A snapshot may overwrite the edit buffer only when both are
/// false.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TypingGuard {
    composing: bool,
    typing: bool,
    typing_deadline_ms: Option<i64>,
}

impl TypingGuard {
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Sets `typing` and restarts the idle deadline.
    pub fn keystroke(&mut self, now_ms: i64) {
        self.typing = true;
        self.typing_deadline_ms = Some(now_ms + TYPING_WINDOW_MS);
    }

    pub fn composition_start(&mut self) {
        self.composing = true;
    }

    /// The committed character counts as a keystroke.
    pub fn composition_end(&mut self, now_ms: i64) {
        self.composing = false;
        self.keystroke(now_ms);
    }

    /// Clears `typing` once its deadline has passed. Returns whether it did.
    pub fn expire(&mut self, now_ms: i64) -> bool {
        match self.typing_deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.typing = false;
                self.typing_deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline_ms(&self) -> Option<i64> {
        self.typing_deadline_ms
    }

    pub fn allows_overwrite(&self) -> bool {
        !self.is_composing() && !self.is_typing()
    }
}
