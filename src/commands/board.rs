//! Session and board commands

use kanban_core::command::{CreateBoard, RenameBoard};
use kanban_core::{Board, BoardView, CommandResponse, User};

use super::{delete, fetch, post, send, send_empty};

pub async fn current_user() -> Result<User, String> {
    fetch("/api/session").await
}

pub async fn list_boards() -> Result<Vec<Board>, String> {
    fetch("/api/boards").await
}

pub async fn get_board(board_id: &str) -> Result<BoardView, String> {
    fetch(&format!("/api/boards/{board_id}")).await
}

pub async fn create_board(args: &CreateBoard) -> Result<CommandResponse, String> {
    send("/api/boards", args).await
}

pub async fn rename_board(board_id: &str, name: &str) -> Result<CommandResponse, String> {
    let args = RenameBoard {
        name: name.to_string(),
    };
    send(&format!("/api/boards/{board_id}/name"), &args).await
}

pub async fn delete_board(board_id: &str) -> Result<CommandResponse, String> {
    send_empty(delete(&format!("/api/boards/{board_id}"))).await
}

pub async fn reindex_board(board_id: &str) -> Result<CommandResponse, String> {
    send_empty(post(&format!("/api/boards/{board_id}/reindex"))).await
}
