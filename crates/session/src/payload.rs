use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{EncodePayloadSnafu, MalformedPayloadSnafu, SessionResult};
use crate::turn::{ChatTurn, Role};

/// Wire shape of a message sent to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

impl<'a> OutboundMessage<'a> {
    pub fn from_turn(turn: &'a ChatTurn) -> Self {
        Self {
            role: turn.role(),
            content: turn.content(),
        }
    }

    pub fn encode(&self) -> SessionResult<String> {
        serde_json::to_string(self).context(EncodePayloadSnafu {
            stage: "encode-outbound-message",
        })
    }
}

/// Wire shape of a reply received from the chat endpoint.
///
/// Any `role` field on the wire is ignored; replies always render as
/// assistant turns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundReply {
    pub content: String,
}

impl InboundReply {
    pub fn decode(raw: &str) -> SessionResult<Self> {
        serde_json::from_str(raw).context(MalformedPayloadSnafu {
            stage: "decode-inbound-reply",
        })
    }

    pub fn into_turn(self) -> ChatTurn {
        ChatTurn::assistant(&self.content)
    }
}
