use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode, header::HeaderMap};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{Transport, TransportError};
use crate::{
    request::{APNS_ID, ApnsRequest},
    response::ApnsResponse,
    settings::ClientConfig,
};

/// Interval of HTTP/2 PING frames on kept-alive connections.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// HTTP/2 transport to the APNs servers.
///
/// Requests that prefer keep-alive share a pooled connection that is pinged
/// while idle. The others go through a client that keeps no idle connections.
pub struct HttpTransport {
    pooled: Client,
    one_shot: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Option<Duration>) -> Result<Self, TransportError> {
        let pooled = Self::builder(request_timeout)
            .http2_keep_alive_interval(Some(KEEP_ALIVE_INTERVAL))
            .http2_keep_alive_while_idle(true)
            .build()?;
        let one_shot = Self::builder(request_timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { pooled, one_shot })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::new(config.request_timeout)
    }

    fn builder(request_timeout: Option<Duration>) -> ClientBuilder {
        let builder = Client::builder().use_rustls_tls().http2_prior_knowledge();
        match request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(url = %request.url))]
    async fn send(&self, request: ApnsRequest) -> Result<ApnsResponse, TransportError> {
        let client = if request.keep_alive {
            &self.pooled
        } else {
            &self.one_shot
        };

        let response = client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        let response = apns_response(status, &headers, body);
        debug!(%status, apns_id = ?response.apns_id, "APNs response");
        Ok(response)
    }
}

/// Pairs a response with the `apns-id` APNs assigned to the notification.
fn apns_response(status: StatusCode, headers: &HeaderMap, body: Vec<u8>) -> ApnsResponse {
    let apns_id = headers
        .get(APNS_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    ApnsResponse {
        status,
        apns_id,
        body,
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::InitializationFailed(err.to_string())
        } else {
            TransportError::SendFailure(format!("APNs request failed: {err}"))
        }
    }
}
