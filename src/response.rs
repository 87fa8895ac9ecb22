use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::warn;

use crate::{
    error::{DeliveryError, Reason},
    notification::Notification,
};

/// What came back from APNs for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApnsResponse {
    pub status: StatusCode,
    pub apns_id: Option<String>,
    pub body: Vec<u8>,
}

impl ApnsResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            apns_id: None,
            body: body.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    reason: String,
    timestamp: Option<i64>,
}

/// Turns a response into the delivered notification or the reason it was refused.
pub fn classify(
    status: StatusCode,
    body: &[u8],
    notification: Notification,
) -> Result<Notification, DeliveryError> {
    if status == StatusCode::OK {
        return Ok(notification);
    }

    let now = Utc::now();
    let (reason, timestamp) = match serde_json::from_slice::<ErrorBody>(body) {
        Ok(error_body) => {
            let reason = Reason::from_code(&error_body.reason);
            if reason == Reason::UnknownError {
                warn!(code = %error_body.reason, "Undocumented APNs reason");
            }
            let timestamp = error_body
                .timestamp
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or(now);
            (reason, timestamp)
        }
        Err(err) => {
            warn!(%status, "Unreadable APNs error body: {}", err);
            (Reason::UnknownError, now)
        }
    };

    Err(DeliveryError::new(status, notification, reason, timestamp))
}
