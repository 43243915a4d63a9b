use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatResult;

/// The only payload exchanged over a live connection. Inbound `user_id` is
/// ignored; outbound it names the original sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub room_id: Uuid,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, PartialEq)]
pub enum Inbound {
    Message(WireMessage),
    /// Control traffic (ping/pong) with nothing to act on.
    Skip,
    Close,
}

pub fn decode(frame: Message) -> ChatResult<Inbound> {
    let message = match frame {
        Message::Text(text) => serde_json::from_str(text.as_str())?,
        Message::Binary(bytes) => serde_json::from_slice(&bytes)?,
        Message::Ping(_) | Message::Pong(_) => return Ok(Inbound::Skip),
        Message::Close(_) => return Ok(Inbound::Close),
    };
    Ok(Inbound::Message(message))
}

pub fn encode(message: &WireMessage) -> ChatResult<Message> {
    Ok(Message::Text(serde_json::to_string(message)?.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;

    #[test]
    fn inbound_user_id_is_optional() {
        let room_id = Uuid::now_v7();
        let frame = Message::Text(format!(r#"{{"room_id":"{room_id}","content":"hi"}}"#).into());

        let Inbound::Message(message) = decode(frame).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(message, WireMessage { room_id, content: "hi".into(), user_id: None });
    }

    #[test]
    fn binary_frames_carry_json_too() {
        let room_id = Uuid::now_v7();
        let body = format!(r#"{{"room_id":"{room_id}","content":"bin"}}"#);
        let decoded = decode(Message::Binary(body.into_bytes().into())).unwrap();
        assert!(matches!(decoded, Inbound::Message(m) if m.content == "bin"));
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        let err = decode(Message::Text("not json".into())).unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));

        let err = decode(Message::Text(r#"{"room_id":"nope","content":""}"#.into())).unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn control_frames() {
        assert_eq!(decode(Message::Ping(Default::default())).unwrap(), Inbound::Skip);
        assert_eq!(decode(Message::Close(None)).unwrap(), Inbound::Close);
    }

    #[test]
    fn outbound_names_the_sender() {
        let message = WireMessage { room_id: Uuid::now_v7(), content: "hi".into(), user_id: Some(Uuid::now_v7()) };
        let Message::Text(text) = encode(&message).unwrap() else {
            panic!("expected a text frame");
        };
        let echoed: WireMessage = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(echoed, message);
    }
}
