use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Sender {
    /// Label shown in transcripts
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Athena",
            Sender::System => "System",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Image,
    Document,
}

/// One entry of a chat transcript. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub content_type: ContentType,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            content_type,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content, ContentType::Text)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content, ContentType::Text)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Sender::System, content, ContentType::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_uses_lowercase_tags() {
        let message = Message::new(Sender::Assistant, "hi", ContentType::Document);
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["sender"], "assistant");
        assert_eq!(value["content_type"], "document");
        assert_eq!(value["content"], "hi");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_content_type_defaults_to_text() {
        let message: Message = serde_json::from_str(
            r#"{"content": "old", "sender": "user", "timestamp": "2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(message.content_type, ContentType::Text);
        assert_eq!(message.sender, Sender::User);
    }
}
