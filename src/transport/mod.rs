pub mod dummy;
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::{request::ApnsRequest, response::ApnsResponse};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to send request: {0}")]
    SendFailure(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to initialize transport: {0}")]
    InitializationFailed(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue the request and hand back whatever APNs answered, successful or not.
    async fn send(&self, request: ApnsRequest) -> Result<ApnsResponse, TransportError>;
}
