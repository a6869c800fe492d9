//! HTTP Command Bindings
//!
//! Frontend bindings to the board server, organized by domain. Identity
//! headers are added by the authenticating proxy in front of the server, so
//! requests carry cookies only.

mod board;
mod card;
mod invitation;
mod list;
mod moves;

use gloo_net::http::{Request, RequestBuilder, Response};
use kanban_core::CommandResponse;
use serde::de::DeserializeOwned;
use serde::Serialize;
use web_sys::RequestCredentials;

pub use board::*;
pub use card::*;
pub use invitation::*;
pub use list::*;
pub use moves::*;

fn get(url: &str) -> RequestBuilder {
    Request::get(url).credentials(RequestCredentials::Include)
}

fn post(url: &str) -> RequestBuilder {
    Request::post(url).credentials(RequestCredentials::Include)
}

fn delete(url: &str) -> RequestBuilder {
    Request::delete(url).credentials(RequestCredentials::Include)
}

/// GET a resource. Non-2xx responses carry a `CommandResponse` whose message
/// becomes the error.
async fn fetch<T: DeserializeOwned>(url: &str) -> Result<T, String> {
    let response = get(url).send().await.map_err(|e| e.to_string())?;
    decode(response).await
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    if response.ok() {
        return response.json::<T>().await.map_err(|e| e.to_string());
    }
    let status = response.status();
    match response.json::<CommandResponse>().await {
        Ok(failure) => Err(failure.message),
        Err(_) => Err(format!("HTTP {status}")),
    }
}

/// Send a command. Failed commands still answer with a `CommandResponse`, so
/// only transport errors end up in `Err`.
async fn send<B: Serialize>(url: &str, body: &B) -> Result<CommandResponse, String> {
    let response = post(url)
        .json(body)
        .map_err(|e| e.to_string())?
        .send()
        .await
        .map_err(|e| e.to_string())?;
    read_response(response).await
}

async fn send_empty(builder: RequestBuilder) -> Result<CommandResponse, String> {
    let response = builder.send().await.map_err(|e| e.to_string())?;
    read_response(response).await
}

async fn read_response(response: Response) -> Result<CommandResponse, String> {
    let status = response.status();
    response
        .json::<CommandResponse>()
        .await
        .map_err(|e| format!("HTTP {status}: {e}"))
}
