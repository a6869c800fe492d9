//! Name Form Component
//!
//! One-line form used to create boards, lists and cards and to send invites.

use leptos::prelude::*;
use wasm_bindgen::JsCast;

/// Single text input with a submit button. Clears itself after submitting a
/// non-blank value.
#[component]
pub fn NameForm(
    #[prop(into)] placeholder: String,
    #[prop(into)] button_label: String,
    #[prop(into)] on_submit: Callback<String>,
    #[prop(optional, into)] class: Option<String>,
) -> impl IntoView {
    let (text, set_text) = signal(String::new());

    let submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let value = text.get().trim().to_string();
        if value.is_empty() {
            return;
        }
        set_text.set(String::new());
        on_submit.run(value);
    };

    view! {
        <form class=class.unwrap_or_else(|| "name-form".to_string()) on:submit=submit>
            <input
                type="text"
                placeholder=placeholder
                maxlength="128"
                prop:value=move || text.get()
                on:input=move |ev| {
                    if let Some(input) = ev
                        .target()
                        .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                    {
                        set_text.set(input.value());
                    }
                }
            />
            <button type="submit">{button_label}</button>
        </form>
    }
}
