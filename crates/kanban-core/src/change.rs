//! Change broadcast messages and the channels they travel on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::{Activity, Attachment, Card, Invitation, ListWithCards};
use crate::position::Position;

/// What the server changed, with enough data for a receiver to reproduce it.
///
/// Every variant carries the `actorId` of the user whose command caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChangeMessage {
    #[serde(rename_all = "camelCase")]
    AddList {
        actor_id: String,
        board_id: String,
        new_list: ListWithCards,
    },
    #[serde(rename_all = "camelCase")]
    DeleteList {
        actor_id: String,
        board_id: String,
        list_id: String,
        deleted_position: Position,
    },
    #[serde(rename_all = "camelCase")]
    UpdateListPositions {
        actor_id: String,
        board_id: String,
        list_id: String,
        old_position: Position,
        position: Position,
    },
    #[serde(rename_all = "camelCase")]
    AddCard {
        actor_id: String,
        board_id: String,
        new_card: Card,
    },
    #[serde(rename_all = "camelCase")]
    DeleteCard {
        actor_id: String,
        board_id: String,
        list_id: String,
        card_id: String,
        deleted_position: Position,
    },
    #[serde(rename_all = "camelCase")]
    UpdateCardPositions {
        actor_id: String,
        board_id: String,
        card_id: String,
        original_list_id: String,
        list_id: String,
        old_position: Position,
        position: Position,
        moved_lists: bool,
    },
    #[serde(rename_all = "camelCase")]
    AddAttachment {
        actor_id: String,
        card_id: String,
        list_id: String,
        attachment: Attachment,
        activity: Activity,
    },
    #[serde(rename_all = "camelCase")]
    DeleteAttachment {
        actor_id: String,
        card_id: String,
        list_id: String,
        attachment_id: String,
        /// Attachment that now fills the card's slot, if any remain
        #[serde(default)]
        latest: Option<Attachment>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateListName {
        actor_id: String,
        list_id: String,
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateBoardName {
        actor_id: String,
        board_id: String,
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateCardDescription {
        actor_id: String,
        card_id: String,
        list_id: String,
        description: String,
        activity: Activity,
    },
    #[serde(rename_all = "camelCase")]
    Invitation {
        actor_id: String,
        invitation: Invitation,
    },
    /// Any kind this build does not know about
    #[serde(other)]
    Unknown,
}

impl ChangeMessage {
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            ChangeMessage::AddList { actor_id, .. }
            | ChangeMessage::DeleteList { actor_id, .. }
            | ChangeMessage::UpdateListPositions { actor_id, .. }
            | ChangeMessage::AddCard { actor_id, .. }
            | ChangeMessage::DeleteCard { actor_id, .. }
            | ChangeMessage::UpdateCardPositions { actor_id, .. }
            | ChangeMessage::AddAttachment { actor_id, .. }
            | ChangeMessage::DeleteAttachment { actor_id, .. }
            | ChangeMessage::UpdateListName { actor_id, .. }
            | ChangeMessage::UpdateBoardName { actor_id, .. }
            | ChangeMessage::UpdateCardDescription { actor_id, .. }
            | ChangeMessage::Invitation { actor_id, .. } => Some(actor_id),
            ChangeMessage::Unknown => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeMessage::AddList { .. } => "AddList",
            ChangeMessage::DeleteList { .. } => "DeleteList",
            ChangeMessage::UpdateListPositions { .. } => "UpdateListPositions",
            ChangeMessage::AddCard { .. } => "AddCard",
            ChangeMessage::DeleteCard { .. } => "DeleteCard",
            ChangeMessage::UpdateCardPositions { .. } => "UpdateCardPositions",
            ChangeMessage::AddAttachment { .. } => "AddAttachment",
            ChangeMessage::DeleteAttachment { .. } => "DeleteAttachment",
            ChangeMessage::UpdateListName { .. } => "UpdateListName",
            ChangeMessage::UpdateBoardName { .. } => "UpdateBoardName",
            ChangeMessage::UpdateCardDescription { .. } => "UpdateCardDescription",
            ChangeMessage::Invitation { .. } => "Invitation",
            ChangeMessage::Unknown => "Unknown",
        }
    }

    /// Decode a raw payload. Unknown kinds decode to `Unknown`; a known kind
    /// with missing fields is an error.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Broadcast channel key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Structural changes of one board
    Board(String),
    /// Detail changes of one card
    Card(String),
    /// Invitations addressed to one user
    User(String),
}

impl Channel {
    pub fn id(&self) -> &str {
        match self {
            Channel::Board(id) | Channel::Card(id) | Channel::User(id) => id,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Board(id) => write!(f, "board:{id}"),
            Channel::Card(id) => write!(f, "card:{id}"),
            Channel::User(id) => write!(f, "user:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid channel key: {0}")]
pub struct ChannelParseError(pub String);

impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ChannelParseError(s.to_string()))?;
        if id.is_empty() {
            return Err(ChannelParseError(s.to_string()));
        }
        match kind {
            "board" => Ok(Channel::Board(id.to_string())),
            "card" => Ok(Channel::Card(id.to_string())),
            "user" => Ok(Channel::User(id.to_string())),
            _ => Err(ChannelParseError(s.to_string())),
        }
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
