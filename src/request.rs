use reqwest::{
    Method,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use tracing::debug;

use crate::{
    error::ApnsError,
    notification::{Notification, Priority},
    settings::ClientConfig,
};

pub const API_VERSION: u8 = 3;
pub const PORT: u16 = 443;

pub const APNS_PUSH_TYPE: HeaderName = HeaderName::from_static("apns-push-type");
pub const APNS_TOPIC: HeaderName = HeaderName::from_static("apns-topic");
pub const APNS_PRIORITY: HeaderName = HeaderName::from_static("apns-priority");
pub const APNS_EXPIRATION: HeaderName = HeaderName::from_static("apns-expiration");
pub const APNS_COLLAPSE_ID: HeaderName = HeaderName::from_static("apns-collapse-id");
pub const APNS_ID: HeaderName = HeaderName::from_static("apns-id");

/// A fully specified request to the APNs device endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ApnsRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub keep_alive: bool,
}

/// Assembles the request delivering `notification`, authorized with `token`.
pub fn build_request(
    notification: &Notification,
    token: &str,
    config: &ClientConfig,
) -> Result<ApnsRequest, ApnsError> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, header_value(format!("bearer {token}"))?);
    headers.insert(
        APNS_PUSH_TYPE,
        HeaderValue::from_static(notification.push_type().as_str()),
    );

    let options = notification.options();
    if let Some(topic) = options.topic.as_ref().or(config.default_topic.as_ref()) {
        headers.insert(APNS_TOPIC, header_value(topic)?);
    }

    let priority = notification.priority();
    if priority != Priority::Immediate {
        headers.insert(APNS_PRIORITY, HeaderValue::from(u16::from(priority.value())));
    }

    if let Some(expiration) = options.expiration {
        headers.insert(APNS_EXPIRATION, HeaderValue::from(expiration.epoch_seconds()));
    }

    if let Some(collapse_id) = &options.collapse_id {
        headers.insert(APNS_COLLAPSE_ID, header_value(collapse_id)?);
    }

    if let Some(id) = options.id {
        headers.insert(APNS_ID, header_value(id.hyphenated().to_string())?);
    }

    let url = format!(
        "https://{}:{PORT}/{API_VERSION}/device/{}",
        config.host,
        urlencoding::encode(notification.device_token())
    );
    let body = serde_json::to_vec(notification.payload())?;

    debug!(%url, body_len = body.len(), "Built APNs request");
    Ok(ApnsRequest {
        method: Method::POST,
        url,
        headers,
        body,
        keep_alive: config.keep_alive,
    })
}

fn header_value(value: impl AsRef<str>) -> Result<HeaderValue, ApnsError> {
    HeaderValue::from_str(value.as_ref())
        .map_err(|err| ApnsError::InvalidNotification(format!("invalid header value: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{Expiration, Payload, PushType};
    use crate::settings::HOST_PRODUCTION;
    use crate::token::SigningKey;
    use chrono::DateTime;
    use uuid::Uuid;

    fn config(default_topic: Option<&str>) -> ClientConfig {
        ClientConfig {
            team: "TEAM".to_string(),
            signing_key: SigningKey::from_pem("pem"),
            key_id: "KEYID".to_string(),
            default_topic: default_topic.map(str::to_string),
            host: HOST_PRODUCTION.to_string(),
            keep_alive: true,
            request_timeout: None,
            max_concurrent_sends: None,
        }
    }

    fn header<'a>(request: &'a ApnsRequest, name: &str) -> Option<&'a str> {
        request.headers.get(name).and_then(|value| value.to_str().ok())
    }

    #[test]
    fn test_minimal_request() {
        let notification = Notification::new("abc123");
        let request = build_request(&notification, "jwt", &config(None)).unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://api.push.apple.com:443/3/device/abc123");
        assert_eq!(header(&request, "authorization"), Some("bearer jwt"));
        assert_eq!(header(&request, "apns-push-type"), Some("alert"));
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.body, br#"{"aps":{}}"#);
        assert!(request.keep_alive);
    }

    #[test]
    fn test_immediate_priority_has_no_header() {
        let notification = Notification::new("abc").with_priority(Priority::Immediate);
        let request = build_request(&notification, "jwt", &config(None)).unwrap();

        assert!(request.headers.get("apns-priority").is_none());
    }

    #[test]
    fn test_other_priorities_are_numeric() {
        for (priority, expected) in [(Priority::Throttled, "5"), (Priority::Low, "1")] {
            let notification = Notification::new("abc").with_priority(priority);
            let request = build_request(&notification, "jwt", &config(None)).unwrap();
            assert_eq!(header(&request, "apns-priority"), Some(expected));
        }
    }

    #[test]
    fn test_topic_precedence() {
        let config = config(Some("com.example.default"));

        let request = build_request(&Notification::new("abc"), "jwt", &config).unwrap();
        assert_eq!(header(&request, "apns-topic"), Some("com.example.default"));

        let notification = Notification::new("abc").with_topic("com.example.voip");
        let request = build_request(&notification, "jwt", &config).unwrap();
        assert_eq!(header(&request, "apns-topic"), Some("com.example.voip"));
    }

    #[test]
    fn test_epoch_and_instant_expirations_match() {
        let from_epoch =
            Notification::new("abc").with_expiration(Expiration::EpochSeconds(1_700_000_000));
        let from_instant = Notification::new("abc")
            .with_expiration(DateTime::from_timestamp(1_700_000_000, 0).unwrap());

        let a = build_request(&from_epoch, "jwt", &config(None)).unwrap();
        let b = build_request(&from_instant, "jwt", &config(None)).unwrap();

        assert_eq!(header(&a, "apns-expiration"), Some("1700000000"));
        assert_eq!(header(&a, "apns-expiration"), header(&b, "apns-expiration"));
    }

    #[test]
    fn test_optional_headers() {
        let id = Uuid::new_v4();
        let notification = Notification::new("abc")
            .with_push_type(PushType::Background)
            .with_collapse_id("score-update")
            .with_id(id);
        let request = build_request(&notification, "jwt", &config(None)).unwrap();

        assert_eq!(header(&request, "apns-push-type"), Some("background"));
        assert_eq!(header(&request, "apns-collapse-id"), Some("score-update"));
        assert_eq!(header(&request, "apns-id"), Some(id.to_string().as_str()));
    }

    #[test]
    fn test_device_token_is_percent_encoded() {
        let notification = Notification::new("a b/c");
        let request = build_request(&notification, "jwt", &config(None)).unwrap();

        assert_eq!(request.url, "https://api.push.apple.com:443/3/device/a%20b%2Fc");
    }

    #[test]
    fn test_building_twice_is_identical() {
        let notification = Notification::new("abc")
            .with_priority(Priority::Throttled)
            .with_expiration(Expiration::EpochSeconds(42))
            .with_payload(Payload::new().title("Hi").custom("b", 2).custom("a", 1));
        let config = config(Some("com.example"));

        let first = build_request(&notification, "jwt", &config).unwrap();
        let second = build_request(&notification, "jwt", &config).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let notification = Notification::new("abc").with_collapse_id("bad\nid");
        let result = build_request(&notification, "jwt", &config(None));

        assert!(matches!(result, Err(ApnsError::InvalidNotification(_))));
    }
}
