use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::info;
use uuid::Uuid;

use super::{Transport, TransportError};
use crate::{request::ApnsRequest, response::ApnsResponse};

/// Logs requests instead of sending them and reports every one as delivered.
pub struct DummyTransport;

#[async_trait]
impl Transport for DummyTransport {
    async fn send(&self, request: ApnsRequest) -> Result<ApnsResponse, TransportError> {
        info!(
            url = %request.url,
            headers = ?request.headers.keys().collect::<Vec<_>>(),
            body = %String::from_utf8_lossy(&request.body),
            "Dry run, not sending notification"
        );

        Ok(ApnsResponse {
            status: StatusCode::OK,
            apns_id: Some(Uuid::new_v4().hyphenated().to_string().to_uppercase()),
            body: Vec::new(),
        })
    }
}
