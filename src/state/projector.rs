//! Searchable, time-grouped projection of the note list.
//!
//! Pure over `(notes, search term, now)`; the view memoizes it.

use crate::models::Note;
use crate::util::preview_line;
use chrono::{DateTime, FixedOffset, TimeZone};
use strum::{EnumIter, IntoEnumIterator};

const PREVIEW_CHARS: usize = 80;

/// Creation-date buckets, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, strum::Display)]
pub(crate) enum NoteGroup {
    #[strum(to_string = "Today")]
    Today,
    #[strum(to_string = "Yesterday")]
    Yesterday,
    #[strum(to_string = "Last 7 Days")]
    Last7Days,
    #[strum(to_string = "Last 30 Days")]
    Last30Days,
    #[strum(to_string = "Older")]
    Older,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NoteRow {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub done: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NoteSection {
    pub group: NoteGroup,
    pub rows: Vec<NoteRow>,
}

fn parse_created(created_at: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(created_at.trim()).ok()
}

/// Bucket for a note created at `created_at`, by calendar days in `now`'s zone.
pub(crate) fn group_for<Tz: TimeZone>(created_at: &str, now: &DateTime<Tz>) -> NoteGroup {
    let Some(created) = parse_created(created_at) else {
        return NoteGroup::Older;
    };

    let created_day = created.with_timezone(&now.timezone()).date_naive();
    let days = (now.date_naive() - created_day).num_days();

    match days {
        i64::MIN..=0 => NoteGroup::Today,
        1 => NoteGroup::Yesterday,
        2..=7 => NoteGroup::Last7Days,
        8..=30 => NoteGroup::Last30Days,
        _ => NoteGroup::Older,
    }
}

/// Case-insensitive match on title, content or any checklist item text.
/// A blank term matches everything.
///
/// Fields are matched one at a time rather than as one concatenated string,
/// so a term never spans the end of the title and the start of the content.
pub(crate) fn matches_search(note: &Note, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();

    note.title.to_lowercase().contains(&term)
        || note.content.to_lowercase().contains(&term)
        || note
            .todos
            .iter()
            .any(|item| item.text.to_lowercase().contains(&term))
}

fn row(note: &Note) -> NoteRow {
    NoteRow {
        id: note.id.clone(),
        title: note.title.clone(),
        preview: preview_line(&note.content, PREVIEW_CHARS),
        done: note.todos.iter().filter(|i| i.completed).count(),
        total: note.todos.len(),
    }
}

/// Filters by `term`, groups by creation day relative to `now`, newest first
/// within each group. Empty groups are left out.
pub(crate) fn project<Tz: TimeZone>(
    notes: &[Note],
    term: &str,
    now: &DateTime<Tz>,
) -> Vec<NoteSection> {
    let mut matching: Vec<(NoteGroup, Option<DateTime<FixedOffset>>, &Note)> = notes
        .iter()
        .filter(|n| matches_search(n, term))
        .map(|n| (group_for(&n.created_at, now), parse_created(&n.created_at), n))
        .collect();

    // Stable: unparsable timestamps (None) sort last and keep snapshot order.
    matching.sort_by(|a, b| b.1.cmp(&a.1));

    NoteGroup::iter()
        .filter_map(|group| {
            let rows: Vec<NoteRow> = matching
                .iter()
                .filter(|(g, _, _)| *g == group)
                .map(|(_, _, n)| row(n))
                .collect();
            if rows.is_empty() {
                None
            } else {
                Some(NoteSection { group, rows })
            }
        })
        .collect()
}
