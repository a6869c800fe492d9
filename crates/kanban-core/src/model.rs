//! Data Model
//!
//! Boards own ordered lists, lists own ordered cards. Identifiers are opaque
//! strings assigned by the server.

use serde::{Deserialize, Serialize};

use crate::position::{Position, Positioned};

/// Who may read a board without being a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "public" => Visibility::Public,
            _ => Visibility::Private,
        }
    }

    pub fn from_public_flag(is_public: bool) -> Self {
        if is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl User {
    /// Name shown in activity records and invitations
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    /// Owner
    pub created_by: String,
    /// Unix millis
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    pub name: String,
    pub board_id: String,
    pub position: Position,
    pub created_by: String,
    pub created_at: i64,
}

impl Positioned for List {
    fn key(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> &str {
        &self.board_id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    fn set_scope(&mut self, scope: &str) {
        self.board_id = scope.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub list_id: String,
    pub position: Position,
    /// Latest attachment only
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

impl Positioned for Card {
    fn key(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> &str {
        &self.list_id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    fn set_scope(&mut self, scope: &str) {
        self.list_id = scope.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub card_id: String,
    /// Original file name
    pub name: String,
    /// Where the blob is served from
    pub url: String,
    pub created_at: i64,
}

/// One line in a card's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub card_id: String,
    pub user_id: String,
    pub user_name: String,
    pub description: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub board_id: String,
    pub board_name: String,
    pub requester_id: String,
    pub requester_name: Option<String>,
    pub requestee_id: String,
    pub created_at: i64,
}

/// A list together with its cards, cards ordered by position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWithCards {
    #[serde(flatten)]
    pub list: List,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl ListWithCards {
    pub fn new(list: List) -> Self {
        Self {
            list,
            cards: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.list.id
    }

    pub fn sort_cards(&mut self) {
        self.cards.sort_by_key(|c| c.position);
    }
}
