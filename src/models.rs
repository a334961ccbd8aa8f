use serde::{Deserialize, Deserializer, Serialize};

/// Delivery status of an outbox row as reported by the backend.
///
/// The backend owns every transition; this side only observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MessageStatus {
    Initialized,
    Success,
    Failure,
    /// Display-only bucket for integers the backend never defined.
    Unknown(i32),
}

impl MessageStatus {
    pub fn code(self) -> i32 {
        match self {
            MessageStatus::Initialized => 0,
            MessageStatus::Success => 1,
            MessageStatus::Failure => 2,
            MessageStatus::Unknown(raw) => raw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MessageStatus::Initialized => "initialized",
            MessageStatus::Success => "success",
            MessageStatus::Failure => "failure",
            MessageStatus::Unknown(_) => "unknown status",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Success)
    }

    /// Whether a re-read showing `next` after `self` fits the backend's state machine.
    ///
    /// Staying in the same state is always fine. A failure may be retried into
    /// either success or another failure.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (MessageStatus::Initialized, MessageStatus::Success)
                | (MessageStatus::Initialized, MessageStatus::Failure)
                | (MessageStatus::Failure, MessageStatus::Success)
        )
    }
}

impl Default for MessageStatus {
    fn default() -> Self {
        MessageStatus::Initialized
    }
}

impl From<i32> for MessageStatus {
    fn from(raw: i32) -> Self {
        match raw {
            0 => MessageStatus::Initialized,
            1 => MessageStatus::Success,
            2 => MessageStatus::Failure,
            other => MessageStatus::Unknown(other),
        }
    }
}

impl From<MessageStatus> for i32 {
    fn from(status: MessageStatus) -> Self {
        status.code()
    }
}

/// Reads `null` as the field's zero value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload the backend will publish for an outbox row.
///
/// Some backend builds emit the payload fields capitalized, and a nil byte
/// slice comes through as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Msg {
    #[serde(alias = "Topic", deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(alias = "Partition", deserialize_with = "null_as_default")]
    pub partition: u32,
    #[serde(alias = "Content", deserialize_with = "null_as_default")]
    pub content: String,
}

/// One row of the backend's outbox table.
///
/// The backend omits empty fields, so everything falls back to its zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutboxMessage {
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub biz: String,
    #[serde(deserialize_with = "null_as_default")]
    pub db: String,
    #[serde(deserialize_with = "null_as_default")]
    pub table: String,
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub msg: Msg,
    #[serde(deserialize_with = "null_as_default")]
    pub status: MessageStatus,
    pub ctime: i64,
    pub utime: i64,
    pub send_times: u32,
}
