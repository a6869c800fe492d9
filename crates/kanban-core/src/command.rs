//! Commands sent by a client and the uniform response the server returns.

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult};
use crate::position::Position;

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_DESCRIPTION_LEN: usize = 256;

/// Where a dragged card ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMoveValues {
    pub card_id: String,
    /// Destination list
    pub list_id: String,
    /// Index of the destination list on the board
    pub final_list_index: Position,
    pub final_card_index: Position,
}

/// Net effect of one drag gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MoveCommand {
    #[serde(rename_all = "camelCase")]
    List {
        old_index: Position,
        new_index: Position,
        board_id: String,
        list_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Card {
        values: CardMoveValues,
        board_id: String,
        moved_in_same_list: bool,
        initial_index: Position,
        initial_list_id: String,
    },
}

impl MoveCommand {
    pub fn board_id(&self) -> &str {
        match self {
            MoveCommand::List { board_id, .. } | MoveCommand::Card { board_id, .. } => board_id,
        }
    }

    /// Reject shapes no client should ever send. Bounds against the stored
    /// counts are checked later, inside the transaction.
    pub fn validate_shape(&self) -> CommandResult<()> {
        match self {
            MoveCommand::List {
                old_index,
                new_index,
                board_id,
                list_id,
            } => {
                require_id(board_id)?;
                require_id(list_id)?;
                require_index(*old_index)?;
                require_index(*new_index)
            }
            MoveCommand::Card {
                values,
                board_id,
                moved_in_same_list,
                initial_index,
                initial_list_id,
            } => {
                require_id(board_id)?;
                require_id(&values.card_id)?;
                require_id(&values.list_id)?;
                require_id(initial_list_id)?;
                require_index(*initial_index)?;
                require_index(values.final_card_index)?;
                if *moved_in_same_list != (values.list_id == *initial_list_id) {
                    return Err(CommandError::validation(
                        "movedInSameList disagrees with the list ids",
                    ));
                }
                Ok(())
            }
        }
    }
}

fn require_id(id: &str) -> CommandResult<()> {
    if id.trim().is_empty() {
        return Err(CommandError::validation(CommandError::GENERIC_MESSAGE));
    }
    Ok(())
}

fn require_index(index: Position) -> CommandResult<()> {
    if index < 0 {
        return Err(CommandError::validation(CommandError::GENERIC_MESSAGE));
    }
    Ok(())
}

fn require_name(name: &str) -> CommandResult<()> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(CommandError::validation("Name is required"));
    }
    if len > MAX_NAME_LEN {
        return Err(CommandError::validation(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn require_description(description: &str) -> CommandResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CommandError::validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// `{ message, ok }`, plus the id of a created entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub message: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CommandResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ok: true,
            id: None,
        }
    }

    pub fn created(message: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ok: true,
            id: Some(id.into()),
        }
    }

    pub fn failure(err: &CommandError) -> Self {
        Self {
            message: err.public_message(),
            ok: false,
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoard {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl CreateBoard {
    pub fn validate(&self) -> CommandResult<()> {
        require_name(&self.name)?;
        if let Some(description) = &self.description {
            require_description(description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameBoard {
    pub name: String,
}

impl RenameBoard {
    pub fn validate(&self) -> CommandResult<()> {
        require_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddList {
    pub board_id: String,
    pub name: String,
}

impl AddList {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        require_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameList {
    pub board_id: String,
    pub list_id: String,
    pub name: String,
}

impl RenameList {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        require_id(&self.list_id)?;
        require_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteList {
    pub board_id: String,
    pub list_id: String,
}

impl DeleteList {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        require_id(&self.list_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCard {
    pub board_id: String,
    pub list_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl AddCard {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        require_id(&self.list_id)?;
        require_name(&self.name)?;
        if let Some(description) = &self.description {
            require_description(description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCard {
    pub board_id: String,
    pub card_id: String,
}

impl DeleteCard {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        require_id(&self.card_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescription {
    pub board_id: String,
    pub card_id: String,
    pub description: String,
}

impl UpdateDescription {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        require_id(&self.card_id)?;
        require_description(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAttachment {
    pub board_id: String,
    pub card_id: String,
    /// File name, extension decides the accepted type
    pub name: String,
    pub data_base64: String,
}

impl AddAttachment {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        require_id(&self.card_id)?;
        require_name(&self.name)?;
        if self.name.contains('/') || self.name.contains('\\') {
            return Err(CommandError::validation("Invalid file name"));
        }
        if self.data_base64.is_empty() {
            return Err(CommandError::validation("File is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAttachment {
    pub board_id: String,
    pub attachment_id: String,
}

impl DeleteAttachment {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        require_id(&self.attachment_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteUser {
    pub board_id: String,
    pub email: String,
}

impl InviteUser {
    pub fn validate(&self) -> CommandResult<()> {
        require_id(&self.board_id)?;
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CommandError::validation("Invalid email"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_move_wire_shape() {
        let cmd: MoveCommand = serde_json::from_value(json!({
            "type": "List",
            "oldIndex": 0,
            "newIndex": 2,
            "boardId": "b1",
            "listId": "l1"
        }))
        .unwrap();

        assert_eq!(
            cmd,
            MoveCommand::List {
                old_index: 0,
                new_index: 2,
                board_id: "b1".into(),
                list_id: "l1".into(),
            }
        );
        assert!(cmd.validate_shape().is_ok());
    }

    #[test]
    fn test_card_move_wire_shape() {
        let cmd: MoveCommand = serde_json::from_value(json!({
            "type": "Card",
            "values": {
                "cardId": "c1",
                "listId": "l2",
                "finalListIndex": 1,
                "finalCardIndex": 0
            },
            "boardId": "b1",
            "movedInSameList": false,
            "initialIndex": 1,
            "initialListId": "l1"
        }))
        .unwrap();

        assert_eq!(cmd.board_id(), "b1");
        assert!(cmd.validate_shape().is_ok());
        let back = serde_json::to_value(&cmd).unwrap();
        assert_eq!(back["values"]["finalCardIndex"], 0);
        assert_eq!(back["movedInSameList"], false);
    }

    #[test]
    fn test_missing_fields_fail_to_decode() {
        let result: Result<MoveCommand, _> = serde_json::from_value(json!({
            "type": "List",
            "oldIndex": "zero",
            "boardId": "b1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_shape_validation() {
        let negative = MoveCommand::List {
            old_index: -1,
            new_index: 0,
            board_id: "b".into(),
            list_id: "l".into(),
        };
        assert!(matches!(
            negative.validate_shape(),
            Err(CommandError::Validation(_))
        ));

        let inconsistent = MoveCommand::Card {
            values: CardMoveValues {
                card_id: "c".into(),
                list_id: "l2".into(),
                final_list_index: 0,
                final_card_index: 0,
            },
            board_id: "b".into(),
            moved_in_same_list: true,
            initial_index: 0,
            initial_list_id: "l1".into(),
        };
        assert!(inconsistent.validate_shape().is_err());
    }

    #[test]
    fn test_name_limits() {
        let ok = AddList {
            board_id: "b".into(),
            name: "x".repeat(MAX_NAME_LEN),
        };
        assert!(ok.validate().is_ok());

        let long = AddList {
            board_id: "b".into(),
            name: "x".repeat(MAX_NAME_LEN + 1),
        };
        assert!(long.validate().is_err());

        let blank = RenameBoard { name: "  ".into() };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_attachment_name_rejects_paths() {
        let cmd = AddAttachment {
            board_id: "b".into(),
            card_id: "c".into(),
            name: "../etc/passwd.png".into(),
            data_base64: "AA==".into(),
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn test_response_omits_missing_id() {
        let json = serde_json::to_value(CommandResponse::success("done")).unwrap();
        assert_eq!(json, json!({ "message": "done", "ok": true }));

        let failure = CommandResponse::failure(&CommandError::NotAuthorized);
        assert!(!failure.ok);
        assert_eq!(failure.message, "You are not authorized to perform this action");
    }
}
