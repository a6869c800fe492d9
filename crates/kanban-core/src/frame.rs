//! WebSocket frames.

use serde::{Deserialize, Serialize};

use crate::change::{ChangeMessage, Channel};

/// Sent by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum ClientFrame {
    Subscribe { channel: Channel },
    Unsubscribe { channel: Channel },
}

/// Sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame")]
pub enum ServerFrame {
    Subscribed { channel: Channel },
    Change {
        channel: Channel,
        message: ChangeMessage,
    },
    /// The subscriber fell behind and missed `skipped` messages; reload.
    Lagged { channel: Channel, skipped: u64 },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_frame_shape() {
        let frame: ClientFrame =
            serde_json::from_value(json!({ "op": "Subscribe", "channel": "board:b1" })).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Subscribe {
                channel: Channel::Board("b1".into())
            }
        );
    }

    #[test]
    fn test_change_frame_nests_message() {
        let frame = ServerFrame::Change {
            channel: Channel::Board("b1".into()),
            message: ChangeMessage::UpdateBoardName {
                actor_id: "u1".into(),
                board_id: "b1".into(),
                name: "Roadmap".into(),
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["frame"], "Change");
        assert_eq!(json["channel"], "board:b1");
        assert_eq!(json["message"]["type"], "UpdateBoardName");
        assert_eq!(json["message"]["actorId"], "u1");
    }
}
