use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

use crate::{notification::Notification, transport::TransportError};

macro_rules! reasons {
    ($($variant:ident => $code:literal),+ $(,)?) => {
        /// Reason codes APNs reports when it rejects a notification.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Reason {
            $($variant,)+
            /// Unparseable body or a code APNs does not document.
            UnknownError,
        }

        impl Reason {
            /// Maps a wire code to its reason. Undocumented codes become `UnknownError`.
            pub fn from_code(code: &str) -> Self {
                match code {
                    $($code => Reason::$variant,)+
                    _ => Reason::UnknownError,
                }
            }

            /// Wire code, also used as the name of the reason's event channel.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Reason::$variant => $code,)+
                    Reason::UnknownError => "Unknown error",
                }
            }
        }
    };
}

reasons! {
    BadCollapseId => "BadCollapseId",
    BadDeviceToken => "BadDeviceToken",
    BadExpirationDate => "BadExpirationDate",
    BadMessageId => "BadMessageId",
    BadPriority => "BadPriority",
    BadTopic => "BadTopic",
    DeviceTokenNotForTopic => "DeviceTokenNotForTopic",
    DuplicateHeaders => "DuplicateHeaders",
    IdleTimeout => "IdleTimeout",
    InvalidPushType => "InvalidPushType",
    MissingDeviceToken => "MissingDeviceToken",
    MissingTopic => "MissingTopic",
    PayloadEmpty => "PayloadEmpty",
    TopicDisallowed => "TopicDisallowed",
    BadCertificate => "BadCertificate",
    BadCertificateEnvironment => "BadCertificateEnvironment",
    ExpiredProviderToken => "ExpiredProviderToken",
    Forbidden => "Forbidden",
    InvalidProviderToken => "InvalidProviderToken",
    MissingProviderToken => "MissingProviderToken",
    UnrelatedKeyIdInToken => "UnrelatedKeyIdInToken",
    BadPath => "BadPath",
    MethodNotAllowed => "MethodNotAllowed",
    ExpiredToken => "ExpiredToken",
    Unregistered => "Unregistered",
    PayloadTooLarge => "PayloadTooLarge",
    TooManyProviderTokenUpdates => "TooManyProviderTokenUpdates",
    TooManyRequests => "TooManyRequests",
    InternalServerError => "InternalServerError",
    ServiceUnavailable => "ServiceUnavailable",
    Shutdown => "Shutdown",
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification APNs refused to deliver.
#[derive(Debug, Clone, Error)]
#[error("APNs rejected notification for {} with status {status}: {reason}", .notification.device_token())]
pub struct DeliveryError {
    pub status: StatusCode,
    pub notification: Notification,
    pub reason: Reason,
    pub timestamp: DateTime<Utc>,
}

impl DeliveryError {
    pub fn new(
        status: StatusCode,
        notification: Notification,
        reason: Reason,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            notification,
            reason,
            timestamp,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApnsError {
    #[error("APNs configuration error: {0}")]
    Configuration(String),

    #[error("Invalid notification: {0}")]
    InvalidNotification(String),

    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApnsError {
    /// The delivery rejection, if APNs answered at all.
    pub fn as_delivery(&self) -> Option<&DeliveryError> {
        match self {
            ApnsError::Delivery(err) => Some(err),
            _ => None,
        }
    }
}
