//! Card Detail Component
//!
//! Dialog for the open card: description, attachments and activity. Kept
//! live through the card channel while open.

use kanban_core::command::{AddAttachment, DeleteAttachment, UpdateDescription, MAX_DESCRIPTION_LEN};
use kanban_core::{Activity, Attachment};
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::commands;
use crate::components::DeleteConfirmButton;
use crate::context::{use_app_context, use_board_context};
use crate::store::{read_session, show_notice, use_ui_store, with_session};

const ACCEPTED_TYPES: &str = "image/jpeg,image/png,image/webp";

#[component]
pub fn CardDetail() -> impl IntoView {
    let store = use_ui_store();
    let ctx = use_app_context();
    let board = use_board_context();

    let detail_field = move |f: fn(&kanban_core::CardDetailView) -> String| {
        read_session(&store, |s| s.card_detail.as_ref().map(f))
            .flatten()
            .unwrap_or_default()
    };
    let card_id = move || detail_field(|d| d.card.id.clone());
    let card_name = move || detail_field(|d| d.card.name.clone());
    let description = move || detail_field(|d| d.card.description.clone().unwrap_or_default());
    let attachments = move || -> Vec<Attachment> {
        read_session(&store, |s| s.card_detail.as_ref().map(|d| d.attachments.clone()))
            .flatten()
            .unwrap_or_default()
    };
    let activities = move || -> Vec<Activity> {
        read_session(&store, |s| s.card_detail.as_ref().map(|d| d.activities.clone()))
            .flatten()
            .unwrap_or_default()
    };
    let is_member = move || read_session(&store, |s| s.view.is_member).unwrap_or(false);

    let (draft, set_draft) = signal(String::new());
    let (editing, set_editing) = signal(false);

    let close = {
        let board = board.clone();
        move |_: web_sys::MouseEvent| {
            if let Some(channel) = with_session(&store, |s| s.close_card()).flatten() {
                board.unsubscribe(&channel);
            }
        }
    };

    let save_description = {
        let board_id = board.board_id.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            set_editing.set(false);
            let args = UpdateDescription {
                board_id: board_id.clone(),
                card_id: card_id(),
                description: draft.get_untracked(),
            };
            spawn_local(async move {
                match commands::update_description(&args).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let upload = {
        let board_id = board.board_id.clone();
        move |ev: web_sys::Event| {
            let Some(input) = ev
                .target()
                .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
            else {
                return;
            };
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            input.set_value("");
            read_as_base64(file, {
                let board_id = board_id.clone();
                move |name, data_base64| {
                    let args = AddAttachment {
                        board_id,
                        card_id: card_id(),
                        name,
                        data_base64,
                    };
                    spawn_local(async move {
                        match commands::add_attachment(&args).await {
                            Ok(response) if response.ok => ctx.reload(),
                            Ok(response) => show_notice(&store, response.message),
                            Err(e) => show_notice(&store, e),
                        }
                    });
                }
            });
        }
    };

    let remove_attachment = {
        let board_id = board.board_id.clone();
        move |attachment_id: String| {
            let args = DeleteAttachment {
                board_id: board_id.clone(),
                attachment_id,
            };
            spawn_local(async move {
                match commands::delete_attachment(&args).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    view! {
        <div class="modal-backdrop" on:click=close.clone()>
            <div class="card-detail" on:click=|ev| ev.stop_propagation()>
                <header class="card-detail-header">
                    <h2>{card_name}</h2>
                    <button class="close-btn" on:click=close.clone()>"×"</button>
                </header>

                <section class="card-description">
                    <h3>"Description"</h3>
                    <Show
                        when=move || editing.get()
                        fallback=move || view! {
                            <p
                                class="description-text"
                                on:click=move |_| {
                                    if is_member() {
                                        set_draft.set(description());
                                        set_editing.set(true);
                                    }
                                }
                            >
                                {move || {
                                    let text = description();
                                    if text.is_empty() { "Add a description...".to_string() } else { text }
                                }}
                            </p>
                        }
                    >
                        <form class="description-form" on:submit=save_description.clone()>
                            <textarea
                                maxlength=MAX_DESCRIPTION_LEN.to_string()
                                prop:value=move || draft.get()
                                on:input=move |ev| {
                                    if let Some(area) = ev
                                        .target()
                                        .and_then(|t| t.dyn_into::<web_sys::HtmlTextAreaElement>().ok())
                                    {
                                        set_draft.set(area.value());
                                    }
                                }
                            />
                            <button type="submit">"Save"</button>
                            <button type="button" class="cancel-btn" on:click=move |_| set_editing.set(false)>
                                "Cancel"
                            </button>
                        </form>
                    </Show>
                </section>

                <section class="card-attachments">
                    <h3>"Attachments"</h3>
                    <For each=attachments key=|a| a.id.clone() let:attachment>
                        {
                            let remove = remove_attachment.clone();
                            let attachment_id = attachment.id.clone();
                            view! {
                                <div class="attachment-row">
                                    <a href=attachment.url.clone() target="_blank">
                                        <img class="attachment-thumb" src=attachment.url.clone() alt=attachment.name.clone() />
                                    </a>
                                    <span class="attachment-name">{attachment.name.clone()}</span>
                                    <Show when=is_member>
                                        <DeleteConfirmButton
                                            button_class="delete-btn"
                                            on_confirm={
                                                let remove = remove.clone();
                                                let attachment_id = attachment_id.clone();
                                                move |_: ()| remove(attachment_id.clone())
                                            }
                                        />
                                    </Show>
                                </div>
                            }
                        }
                    </For>
                    <Show when=is_member>
                        <input type="file" accept=ACCEPTED_TYPES on:change=upload.clone() />
                    </Show>
                </section>

                <section class="card-activity">
                    <h3>"Activity"</h3>
                    <ul>
                        <For each=activities key=|a| a.id.clone() let:activity>
                            <li class="activity-row">
                                <strong>{activity.user_name.clone()}</strong>
                                " "
                                {activity.description.clone()}
                            </li>
                        </For>
                    </ul>
                </section>
            </div>
        </div>
    }
}

/// Read a picked file as a data URL and hand its base64 payload to `done`.
fn read_as_base64(file: web_sys::File, done: impl FnOnce(String, String) + 'static) {
    let Ok(reader) = web_sys::FileReader::new() else {
        return;
    };
    let name = file.name();
    let on_load = Closure::once({
        let reader = reader.clone();
        move |_: web_sys::ProgressEvent| {
            let Some(data_url) = reader.result().ok().and_then(|r| r.as_string()) else {
                return;
            };
            if let Some((_, payload)) = data_url.split_once("base64,") {
                done(name, payload.to_string());
            }
        }
    });
    reader.set_onload(Some(on_load.as_ref().unchecked_ref()));
    on_load.forget();
    if reader.read_as_data_url(&file).is_err() {
        web_sys::console::warn_1(&"[APP] could not read file".into());
    }
}
