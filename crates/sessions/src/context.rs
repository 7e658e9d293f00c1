use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::handle::SessionHandle;

/// What the session middleware needs from a host framework's request context.
pub trait SessionContext: Send {
    /// Identifier of whoever sent the update.
    fn sender_id(&self) -> Option<String> {
        None
    }

    /// Identifier of the conversation the update belongs to.
    fn chat_id(&self) -> Option<String> {
        None
    }

    /// Attach the request's session under `property`.
    fn bind_session(&mut self, property: &str, handle: SessionHandle);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A minimal inbound chat update.
#[derive(Debug, Clone, Default)]
pub struct UpdateContext {
    pub from: Option<Sender>,
    pub chat: Option<Chat>,
    pub text: Option<String>,
    sessions: HashMap<String, SessionHandle>,
}

impl UpdateContext {
    pub fn new(from: Option<Sender>, chat: Option<Chat>) -> Self {
        Self {
            from,
            chat,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Session bound under `property`, if the middleware attached one.
    pub fn session(&self, property: &str) -> Option<&SessionHandle> {
        self.sessions.get(property)
    }
}

impl SessionContext for UpdateContext {
    fn sender_id(&self) -> Option<String> {
        self.from.as_ref().map(|f| f.id.to_string())
    }

    fn chat_id(&self) -> Option<String> {
        self.chat.as_ref().map(|c| c.id.to_string())
    }

    fn bind_session(&mut self, property: &str, handle: SessionHandle) {
        self.sessions.insert(property.to_string(), handle);
    }
}
