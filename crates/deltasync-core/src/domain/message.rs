//! Message metadata entity
//!
//! A [`Message`] carries the server-reported metadata of one email. It never
//! holds body content; content is streamed on demand by the sync engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::MessageId;

/// Server-reported metadata of one email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    date_received: DateTime<Utc>,
    size_bytes: u64,
    read: bool,
    subject: String,
    from: String,
    has_attachments: bool,
}

impl Message {
    pub fn new(
        id: MessageId,
        date_received: DateTime<Utc>,
        size_bytes: u64,
        read: bool,
        subject: impl Into<String>,
        from: impl Into<String>,
        has_attachments: bool,
    ) -> Self {
        Self {
            id,
            date_received,
            size_bytes,
            read,
            subject: subject.into(),
            from: from.into(),
            has_attachments,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// When the server received the message
    pub fn date_received(&self) -> DateTime<Utc> {
        self.date_received
    }

    /// Size of the message in bytes
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Name and address of the sender, as reported by the server
    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn has_attachments(&self) -> bool {
        self.has_attachments
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_message_accessors() {
        let received = Utc.with_ymd_and_hms(2011, 3, 14, 9, 26, 53).unwrap();
        let message = Message::new(
            "m1".parse().unwrap(),
            received,
            2048,
            true,
            "Quarterly report",
            "Alice <alice@example.com>",
            false,
        );

        assert_eq!(message.id().as_str(), "m1");
        assert_eq!(message.date_received(), received);
        assert_eq!(message.size_bytes(), 2048);
        assert!(message.is_read());
        assert_eq!(message.subject(), "Quarterly report");
        assert_eq!(message.from(), "Alice <alice@example.com>");
        assert!(!message.has_attachments());
    }

    #[test]
    fn test_message_serde_roundtrip_keeps_fields() {
        let message = Message::new(
            "m2".parse().unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            10,
            false,
            "",
            "",
            true,
        );
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["id"], "m2");
        assert_eq!(json["has_attachments"], true);
    }
}
