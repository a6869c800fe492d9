//! Reorder command

use kanban_core::{CommandResponse, MoveCommand};

use super::send;

/// The one call a drop makes. The response decides whether the optimistic
/// preview stays.
pub async fn apply_move(command: &MoveCommand) -> Result<CommandResponse, String> {
    send("/api/moves", command).await
}
