//! Card, description and attachment commands

use kanban_core::command::{AddAttachment, AddCard, DeleteAttachment, DeleteCard, UpdateDescription};
use kanban_core::{CardDetailView, CommandResponse};

use super::{fetch, send};

pub async fn add_card(args: &AddCard) -> Result<CommandResponse, String> {
    send("/api/cards", args).await
}

pub async fn delete_card(args: &DeleteCard) -> Result<CommandResponse, String> {
    send("/api/cards/delete", args).await
}

pub async fn get_card(card_id: &str) -> Result<CardDetailView, String> {
    fetch(&format!("/api/cards/{card_id}")).await
}

pub async fn update_description(args: &UpdateDescription) -> Result<CommandResponse, String> {
    send("/api/cards/description", args).await
}

pub async fn add_attachment(args: &AddAttachment) -> Result<CommandResponse, String> {
    send("/api/attachments", args).await
}

pub async fn delete_attachment(args: &DeleteAttachment) -> Result<CommandResponse, String> {
    send("/api/attachments/delete", args).await
}
