//! List commands

use kanban_core::command::{AddList, DeleteList, RenameList};
use kanban_core::CommandResponse;

use super::send;

pub async fn add_list(args: &AddList) -> Result<CommandResponse, String> {
    send("/api/lists", args).await
}

pub async fn rename_list(args: &RenameList) -> Result<CommandResponse, String> {
    send("/api/lists/name", args).await
}

pub async fn delete_list(args: &DeleteList) -> Result<CommandResponse, String> {
    send("/api/lists/delete", args).await
}
