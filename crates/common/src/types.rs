/// Per-conversation state. Handlers treat it as an arbitrary JSON object.
pub type Session = serde_json::Map<String, serde_json::Value>;
