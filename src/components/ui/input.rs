use leptos::prelude::*;
use tw_merge::tw_merge;

const FIELD_CLASS: &str = "placeholder:text-muted-foreground selection:bg-primary selection:text-primary-foreground dark:bg-input/30 border-input w-full min-w-0 rounded-md border bg-transparent px-3 py-1 text-base shadow-xs transition-[color,box-shadow] outline-none disabled:pointer-events-none disabled:cursor-not-allowed disabled:opacity-50 md:text-sm focus-visible:border-ring focus-visible:ring-ring/50 focus-visible:ring-2";

/// Single-line text field.
///
/// NOTE: no `bind:value`; the value is pushed through `prop:value` and every
/// change is reported through `on_input`, so the owner decides what is kept.
/// IME composition start/end is reported through `on_composition` (true on
/// start) so partial characters can be held back.
#[component]
pub fn Input(
    #[prop(into, optional)] class: String,
    #[prop(into, optional)] placeholder: String,
    #[prop(into)] value: Signal<String>,
    #[prop(into)] on_input: Callback<String>,
    #[prop(into, optional)] on_composition: Option<Callback<bool>>,
    #[prop(into, optional)] on_enter: Option<Callback<()>>,
) -> impl IntoView {
    let merged_class = tw_merge!("flex h-9", FIELD_CLASS, class);

    view! {
        <input
            data-name="Input"
            type="text"
            class=merged_class
            placeholder=placeholder
            prop:value=move || value.get()
            on:input=move |ev| on_input.run(event_target_value(&ev))
            on:compositionstart=move |_| {
                if let Some(cb) = on_composition {
                    cb.run(true);
                }
            }
            on:compositionend=move |_| {
                if let Some(cb) = on_composition {
                    cb.run(false);
                }
            }
            on:keydown=move |ev: web_sys::KeyboardEvent| {
                if ev.key() == "Enter" && !ev.is_composing() {
                    if let Some(cb) = on_enter {
                        ev.prevent_default();
                        cb.run(());
                    }
                }
            }
        />
    }
}

/// Multi-line variant of [`Input`] for note bodies.
#[component]
pub fn TextArea(
    #[prop(into, optional)] class: String,
    #[prop(into, optional)] placeholder: String,
    #[prop(into)] value: Signal<String>,
    #[prop(into)] on_input: Callback<String>,
    #[prop(into, optional)] on_composition: Option<Callback<bool>>,
) -> impl IntoView {
    let merged_class = tw_merge!("min-h-48 resize-y py-2", FIELD_CLASS, class);

    view! {
        <textarea
            data-name="TextArea"
            class=merged_class
            placeholder=placeholder
            prop:value=move || value.get()
            on:input=move |ev| on_input.run(event_target_value(&ev))
            on:compositionstart=move |_| {
                if let Some(cb) = on_composition {
                    cb.run(true);
                }
            }
            on:compositionend=move |_| {
                if let Some(cb) = on_composition {
                    cb.run(false);
                }
            }
        />
    }
}
