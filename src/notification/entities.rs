use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::payload::Payload;

/// The `apns-push-type` of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushType {
    #[default]
    Alert,
    Background,
    Location,
    Voip,
    Complication,
    FileProvider,
    Mdm,
    LiveActivity,
    PushToTalk,
    Widgets,
}

impl PushType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushType::Alert => "alert",
            PushType::Background => "background",
            PushType::Location => "location",
            PushType::Voip => "voip",
            PushType::Complication => "complication",
            PushType::FileProvider => "fileprovider",
            PushType::Mdm => "mdm",
            PushType::LiveActivity => "liveactivity",
            PushType::PushToTalk => "pushtotalk",
            PushType::Widgets => "widgets",
        }
    }
}

impl std::str::FromStr for PushType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let push_type = match s {
            "alert" => PushType::Alert,
            "background" => PushType::Background,
            "location" => PushType::Location,
            "voip" => PushType::Voip,
            "complication" => PushType::Complication,
            "fileprovider" => PushType::FileProvider,
            "mdm" => PushType::Mdm,
            "liveactivity" => PushType::LiveActivity,
            "pushtotalk" => PushType::PushToTalk,
            "widgets" => PushType::Widgets,
            other => return Err(format!("unknown push type: {other}")),
        };
        Ok(push_type)
    }
}

/// Delivery priority. APNs assumes `Immediate` when no priority header is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Immediate,
    Throttled,
    Low,
}

impl Priority {
    pub fn value(&self) -> u8 {
        match self {
            Priority::Immediate => 10,
            Priority::Throttled => 5,
            Priority::Low => 1,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" | "10" => Ok(Priority::Immediate),
            "throttled" | "5" => Ok(Priority::Throttled),
            "low" | "1" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// When APNs may stop trying to deliver a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    EpochSeconds(i64),
    At(DateTime<Utc>),
}

impl Expiration {
    /// Seconds since the unix epoch. Instants are rounded to the nearest second,
    /// with halves rounded up, so -1.5s becomes -1.
    pub fn epoch_seconds(&self) -> i64 {
        match self {
            Expiration::EpochSeconds(seconds) => *seconds,
            Expiration::At(instant) => (instant.timestamp_millis() + 500).div_euclid(1000),
        }
    }
}

impl From<DateTime<Utc>> for Expiration {
    fn from(instant: DateTime<Utc>) -> Self {
        Expiration::At(instant)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationOptions {
    pub topic: Option<String>,
    pub expiration: Option<Expiration>,
    pub collapse_id: Option<String>,
    pub id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    device_token: String,
    push_type: PushType,
    priority: Priority,
    options: NotificationOptions,
    payload: Payload,
}

impl Notification {
    /// An alert notification sent with immediate priority.
    pub fn new(device_token: impl Into<String>) -> Self {
        Self {
            device_token: device_token.into(),
            push_type: PushType::Alert,
            priority: Priority::Immediate,
            options: NotificationOptions::default(),
            payload: Payload::default(),
        }
    }

    /// A background notification that only wakes the app.
    pub fn silent(device_token: impl Into<String>) -> Self {
        Self::new(device_token)
            .with_push_type(PushType::Background)
            .with_priority(Priority::Throttled)
            .with_payload(Payload::new().content_available())
    }

    pub fn from_device_bytes(device_token: &[u8]) -> Self {
        Self::new(hex::encode(device_token))
    }

    pub fn with_push_type(mut self, push_type: PushType) -> Self {
        self.push_type = push_type;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.options.topic = Some(topic.into());
        self
    }

    pub fn with_expiration(mut self, expiration: impl Into<Expiration>) -> Self {
        self.options.expiration = Some(expiration.into());
        self
    }

    pub fn with_collapse_id(mut self, collapse_id: impl Into<String>) -> Self {
        self.options.collapse_id = Some(collapse_id.into());
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.options.id = Some(id);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn device_token(&self) -> &str {
        &self.device_token
    }

    pub fn push_type(&self) -> PushType {
        self.push_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn options(&self) -> &NotificationOptions {
        &self.options
    }

    /// The JSON body sent to APNs.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}
