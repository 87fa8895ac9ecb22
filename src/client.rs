use futures::{StreamExt, future::join_all, stream};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    error::{ApnsError, Reason},
    events::ErrorEvents,
    notification::Notification,
    request::build_request,
    response::classify,
    settings::ClientConfig,
    token::{Es256Signer, TokenCache, TokenSigner},
    transport::{Transport, http::HttpTransport},
};

pub type SendResult = Result<Notification, ApnsError>;

/// Sends notifications to APNs, one independent request per notification.
pub struct ApnsClient<T: Transport, S: TokenSigner = Es256Signer> {
    config: ClientConfig,
    tokens: TokenCache<S>,
    transport: Arc<T>,
    events: ErrorEvents,
}

impl ApnsClient<HttpTransport> {
    /// A client talking HTTP/2 to `config.host`.
    pub fn connect(config: ClientConfig) -> Result<Self, ApnsError> {
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }
}

impl<T: Transport> ApnsClient<T> {
    pub fn new(config: ClientConfig, transport: Arc<T>) -> Self {
        Self::with_signer(config, transport, Es256Signer)
    }
}

impl<T: Transport, S: TokenSigner> ApnsClient<T, S> {
    pub fn with_signer(config: ClientConfig, transport: Arc<T>, signer: S) -> Self {
        let tokens = TokenCache::new(
            signer,
            config.signing_key.clone(),
            config.team.clone(),
            config.key_id.clone(),
        );

        Self {
            config,
            tokens,
            transport,
            events: ErrorEvents::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenCache<S> {
        &self.tokens
    }

    /// Observers of failed sends.
    pub fn events(&self) -> &ErrorEvents {
        &self.events
    }

    /// Delivers one notification.
    ///
    /// Every failure is published on [`ErrorEvents`] before it is returned. An
    /// `ExpiredProviderToken` rejection also drops the cached provider token.
    #[instrument(skip_all, fields(device_token = %notification.device_token()))]
    pub async fn send(&self, notification: Notification) -> SendResult {
        let result = self.deliver(notification).await;

        if let Err(err) = &result {
            match err.as_delivery() {
                Some(rejection) => {
                    warn!(status = %rejection.status, reason = %rejection.reason, "Notification rejected");
                    if rejection.reason == Reason::ExpiredProviderToken {
                        self.tokens.invalidate();
                    }
                }
                None => warn!("Sending notification failed: {}", err),
            }
            self.events.emit(err).await;
        }
        result
    }

    async fn deliver(&self, notification: Notification) -> SendResult {
        let token = self.tokens.get_token()?;
        let request = build_request(&notification, &token, &self.config)?;
        let response = self.transport.send(request).await?;

        let notification = classify(response.status, &response.body, notification)?;
        info!(apns_id = ?response.apns_id, "Notification delivered");
        Ok(notification)
    }

    /// Delivers every notification, each failure kept in its own slot.
    ///
    /// The results line up with the input regardless of completion order. All
    /// sends are in flight at once unless `max_concurrent_sends` is set.
    #[instrument(skip_all, fields(count = notifications.len()))]
    pub async fn send_many(&self, notifications: Vec<Notification>) -> Vec<SendResult> {
        let sends = notifications
            .into_iter()
            .map(|notification| self.send(notification));

        match self.config.max_concurrent_sends {
            Some(limit) => stream::iter(sends).buffered(limit.max(1)).collect().await,
            None => join_all(sends).await,
        }
    }
}
