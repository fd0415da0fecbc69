use crate::components::ui::{
    Alert, AlertDescription, AlertTitle, Button, ButtonSize, ButtonVariant, Input, Spinner,
    TextArea,
};
use crate::config::StoreConfig;
use crate::models::ChecklistItem;
use crate::state::{project, NoteSection, NoteSync, SyncContext};
use crate::store::{FirestoreStore, Subscription};
use crate::util::now_ms;
use icons::X;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::rc::Rc;
use wasm_bindgen::JsCast;

const DAY_CHECK_INTERVAL_MS: i32 = 60_000;

fn alert_user(message: &str) {
    let _ = window().alert_with_message(message);
}

/// The notes view: sidebar list plus editor, backed by one live subscription.
#[component]
pub fn NotesPage() -> impl IntoView {
    let changed = Trigger::new();
    let sync = NoteSync::new(
        FirestoreStore::new(StoreConfig::from_window()),
        Rc::new(now_ms),
        Rc::new(alert_user),
        Rc::new(move || changed.notify()),
    );
    let ctx = SyncContext {
        sync: StoredValue::new_local(sync),
        changed,
    };
    provide_context(ctx);

    // Live view: opened on mount, reopened after the error screen is left.
    let live = StoredValue::new_local(None::<Subscription>);
    let open_live_view = move || {
        log::info!("opening live note view");
        live.set_value(Some(ctx.with(|s| s.subscribe())));
    };
    open_live_view();

    Effect::new(move |was_fatal: Option<bool>| {
        let fatal = ctx.track(|c| c.fatal_error().is_some());
        if was_fatal == Some(true) && !fatal {
            open_live_view();
        }
        fatal
    });

    // One timeout at the controller's earliest deadline, re-armed on change.
    let timer_id: StoredValue<Option<i32>> = StoredValue::new(None);
    Effect::new(move |_| {
        changed.track();
        let deadline = ctx.with(|s| s.next_deadline_ms());

        let win = window();
        if let Some(tid) = timer_id.get_value() {
            win.clear_timeout_with_handle(tid);
            timer_id.set_value(None);
        }
        let Some(deadline) = deadline else {
            return;
        };

        let delay = (deadline - now_ms()).clamp(0, i32::MAX as i64) as i32;
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            timer_id.set_value(None);
            let sync = ctx.handle();
            spawn_local(async move {
                sync.tick().await;
            });
        });
        match win.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            delay,
        ) {
            Ok(tid) => timer_id.set_value(Some(tid)),
            Err(_) => log::warn!("could not arm edit timer"),
        }
    });

    on_cleanup(move || {
        if let Some(tid) = timer_id.get_value() {
            window().clear_timeout_with_handle(tid);
        }
        live.dispose();
    });

    let fatal_error = Memo::new(move |_| ctx.track(|c| c.fatal_error().map(str::to_string)));

    view! {
        <Show
            when=move || fatal_error.get().is_none()
            fallback=move || view! { <FatalError message=Signal::derive(move || fatal_error.get().unwrap_or_default()) /> }
        >
            <div class="flex h-screen bg-background text-foreground">
                <Sidebar />
                <main class="flex-1 overflow-y-auto">
                    <NoteEditor />
                </main>
            </div>
        </Show>
    }
}

fn spawn_create_note(ctx: SyncContext) {
    let sync = ctx.handle();
    spawn_local(async move {
        sync.create_note().await;
    });
}

#[component]
fn FatalError(#[prop(into)] message: Signal<String>) -> impl IntoView {
    let ctx = expect_context::<SyncContext>();

    view! {
        <div class="flex min-h-screen items-center justify-center bg-background px-4">
            <div class="w-full max-w-md space-y-4">
                <Alert class="border-destructive/50 text-destructive">
                    <AlertTitle>"Could not load notes"</AlertTitle>
                    <AlertDescription>{move || message.get()}</AlertDescription>
                </Alert>
                <div class="flex gap-2">
                    <Button
                        variant=ButtonVariant::Outline
                        on:click=move |_| {
                            let _ = window().location().reload();
                        }
                    >
                        "Reload"
                    </Button>
                    <Button on:click=move |_| spawn_create_note(ctx)>"New note"</Button>
                </div>
            </div>
        </div>
    }
}

#[component]
fn Sidebar() -> impl IntoView {
    let ctx = expect_context::<SyncContext>();
    let search: RwSignal<String> = RwSignal::new(String::new());

    // Grouping is by calendar day, so it is re-projected when the date rolls over.
    let today = RwSignal::new(chrono::Local::now().date_naive());
    let day_check = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
        let now = chrono::Local::now().date_naive();
        if today.get_untracked() != now {
            log::debug!("date changed, regrouping notes");
            today.set(now);
        }
    }) as Box<dyn FnMut()>);
    let day_timer = window()
        .set_interval_with_callback_and_timeout_and_arguments_0(
            day_check.as_ref().unchecked_ref(),
            DAY_CHECK_INTERVAL_MS,
        )
        .ok();
    let day_check = StoredValue::new_local(Some(day_check));
    on_cleanup(move || {
        if let Some(tid) = day_timer {
            window().clear_interval_with_handle(tid);
        }
        day_check.set_value(None);
    });

    let sections = Memo::new(move |_| {
        let term = search.get();
        today.track();
        ctx.track(|c| project(c.notes(), &term, &chrono::Local::now()))
    });
    let loaded = Memo::new(move |_| ctx.track(|c| c.is_loaded()));

    view! {
        <aside class="flex w-72 shrink-0 flex-col border-r">
            <div class="space-y-2 border-b p-3">
                <Button class="w-full" on:click=move |_| spawn_create_note(ctx)>
                    "New note"
                </Button>
                <Input
                    placeholder="Search notes"
                    value=search
                    on_input=Callback::new(move |v: String| search.set(v))
                />
            </div>

            <div class="flex-1 overflow-y-auto p-2">
                <Show
                    when=move || loaded.get()
                    fallback=|| view! { <div class="px-2 py-4 text-xs text-muted-foreground">"Loading..."</div> }
                >
                    {move || {
                        let sections = sections.get();
                        if sections.is_empty() {
                            let hint = if search.get().trim().is_empty() { "No notes yet" } else { "No matches" };
                            return view! { <div class="px-2 py-4 text-xs text-muted-foreground">{hint}</div> }
                                .into_any();
                        }
                        sections
                            .into_iter()
                            .map(|section| view! { <NoteGroupList section=section /> })
                            .collect_view()
                            .into_any()
                    }}
                </Show>
            </div>
        </aside>
    }
}

#[component]
fn NoteGroupList(section: NoteSection) -> impl IntoView {
    let ctx = expect_context::<SyncContext>();
    let selected = Memo::new(move |_| ctx.track(|c| c.selected_id().map(str::to_string)));

    let rows = section
        .rows
        .into_iter()
        .map(|row| {
            let id = row.id.clone();
            let id_for_class = row.id.clone();
            let title = if row.title.trim().is_empty() {
                "Untitled".to_string()
            } else {
                row.title
            };
            let progress = (row.total > 0).then(|| format!("{}/{}", row.done, row.total));

            view! {
                <li>
                    <button
                        type="button"
                        class=move || {
                            let base = "w-full rounded-md px-2 py-2 text-left hover:bg-accent";
                            if selected.get().as_deref() == Some(id_for_class.as_str()) {
                                format!("{base} bg-accent")
                            } else {
                                base.to_string()
                            }
                        }
                        on:click=move |_| {
                            let sync = ctx.handle();
                            let id = id.clone();
                            spawn_local(async move {
                                sync.select(&id).await;
                            });
                        }
                    >
                        <div class="flex items-center justify-between gap-2">
                            <span class="truncate text-sm font-medium">{title}</span>
                            {progress.map(|p| view! { <span class="shrink-0 text-xs text-muted-foreground">{p}</span> })}
                        </div>
                        <div class="truncate text-xs text-muted-foreground">{row.preview}</div>
                    </button>
                </li>
            }
        })
        .collect_view();

    view! {
        <section class="mb-3">
            <h3 class="px-2 pb-1 text-xs font-semibold uppercase text-muted-foreground">
                {section.group.to_string()}
            </h3>
            <ul class="space-y-0.5">{rows}</ul>
        </section>
    }
}

#[component]
fn NoteEditor() -> impl IntoView {
    let ctx = expect_context::<SyncContext>();
    // Only a selection change rebuilds the editor; field values flow through props.
    let selected = Memo::new(move |_| ctx.track(|c| c.selected_id().map(str::to_string)));

    move || match selected.get() {
        None => view! { <EmptyState /> }.into_any(),
        Some(id) => view! { <EditorPane note_id=id /> }.into_any(),
    }
}

#[component]
fn EmptyState() -> impl IntoView {
    view! {
        <div class="flex h-full items-center justify-center text-sm text-muted-foreground">
            "Select a note or create a new one"
        </div>
    }
}

#[component]
fn EditorPane(note_id: String) -> impl IntoView {
    let ctx = expect_context::<SyncContext>();

    let title = Memo::new(move |_| ctx.track(|c| c.buffer().title.clone()));
    let content = Memo::new(move |_| ctx.track(|c| c.buffer().content.clone()));
    let saving = Memo::new(move |_| {
        ctx.changed.track();
        ctx.with(|s| s.is_saving())
    });

    let on_composition = Callback::new(move |started: bool| {
        let sync = ctx.handle();
        if started {
            sync.composition_start();
        } else {
            sync.composition_end();
        }
    });

    let id_for_delete = note_id.clone();

    view! {
        <div class="mx-auto w-full max-w-3xl space-y-4 p-6">
            <div class="flex items-center gap-2">
                <Input
                    class="h-10 text-lg font-semibold"
                    placeholder="Title"
                    value=title
                    on_input=Callback::new(move |v: String| ctx.handle().title_input(v))
                    on_composition=on_composition
                />
                <Show when=move || saving.get() fallback=|| ().into_view()>
                    <Spinner />
                </Show>
            </div>

            <TextArea
                placeholder="Write something..."
                value=content
                on_input=Callback::new(move |v: String| ctx.handle().content_input(v))
                on_composition=on_composition
            />

            <Checklist note_id=note_id />

            <div class="flex justify-end">
                <Button
                    variant=ButtonVariant::Destructive
                    size=ButtonSize::Sm
                    on:click=move |_| {
                        let sync = ctx.handle();
                        let id = id_for_delete.clone();
                        spawn_local(async move {
                            sync.delete_note(&id).await;
                        });
                    }
                >
                    "Delete note"
                </Button>
            </div>
        </div>
    }
}

#[component]
fn Checklist(note_id: String) -> impl IntoView {
    let ctx = expect_context::<SyncContext>();
    let note_id = StoredValue::new(note_id);

    let items = Memo::new(move |_| {
        ctx.track(|c| {
            note_id.with_value(|id| c.note(id).map(|n| n.todos.clone()).unwrap_or_default())
        })
    });
    let entry = Memo::new(move |_| ctx.track(|c| c.checklist_input().to_string()));

    let add_item = Callback::new(move |_: ()| {
        let sync = ctx.handle();
        let id = note_id.get_value();
        spawn_local(async move {
            sync.add_item(&id).await;
        });
    });

    view! {
        <section class="space-y-2">
            <h3 class="text-sm font-medium">"Checklist"</h3>
            <ul class="space-y-1">
                {move || {
                    items
                        .get()
                        .into_iter()
                        .map(|item| view! { <ChecklistRow note_id=note_id.get_value() item=item /> })
                        .collect_view()
                }}
            </ul>
            <div class="flex gap-2">
                <Input
                    placeholder="Add an item"
                    value=entry
                    on_input=Callback::new(move |v: String| ctx.handle().set_checklist_input(v))
                    on_enter=add_item
                />
                <Button variant=ButtonVariant::Outline on:click=move |_| add_item.run(())>
                    "Add"
                </Button>
            </div>
        </section>
    }
}

#[component]
fn ChecklistRow(note_id: String, item: ChecklistItem) -> impl IntoView {
    let ctx = expect_context::<SyncContext>();
    let ids = StoredValue::new((note_id, item.id));

    let text_class = if item.completed {
        "flex-1 text-sm text-muted-foreground line-through"
    } else {
        "flex-1 text-sm"
    };

    view! {
        <li class="group flex items-center gap-2">
            <input
                type="checkbox"
                class="size-4"
                prop:checked=item.completed
                on:change=move |_| {
                    let sync = ctx.handle();
                    let (note_id, item_id) = ids.get_value();
                    spawn_local(async move {
                        sync.toggle_item(&note_id, &item_id).await;
                    });
                }
            />
            <span class=text_class>{item.text}</span>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Icon
                class="h-7 w-7 opacity-0 group-hover:opacity-100"
                attr:title="Delete item"
                on:click=move |_| {
                    let sync = ctx.handle();
                    let (note_id, item_id) = ids.get_value();
                    spawn_local(async move {
                        sync.delete_item(&note_id, &item_id).await;
                    });
                }
            >
                <X />
            </Button>
        </li>
    }
}
