use crate::pages::NotesPage;
use leptos::prelude::*;

#[component]
pub fn App() -> impl IntoView {
    // Single view; the notes page owns the sync context and live subscription.
    view! { <NotesPage /> }
}
