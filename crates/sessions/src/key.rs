use std::fmt;

/// Identifies one conversation's session record, e.g. `<sender>:<chat>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(pub String);

impl SessionKey {
    /// Key for a sender inside a chat.
    pub fn for_conversation(sender_id: &str, chat_id: &str) -> Self {
        Self(format!("{sender_id}:{chat_id}"))
    }

    /// Returns `None` for an empty key, which means "no session support".
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        (!key.is_empty()).then_some(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
