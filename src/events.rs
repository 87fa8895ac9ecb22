use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::{ApnsError, DeliveryError, Reason};

/// Name of the channel every failed send is published on.
pub const ERROR_CHANNEL: &str = "error";

type ReasonHandler = Box<dyn Fn(&DeliveryError) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(&ApnsError) + Send + Sync>;

/// Observers of failed sends.
///
/// A rejection by APNs is published on its reason's channel first. Every
/// failure, rejected or not, then goes to the [`ERROR_CHANNEL`]. Publishing
/// with no observers registered is a no-op.
#[derive(Clone, Default)]
pub struct ErrorEvents {
    reason_handlers: Arc<RwLock<HashMap<Reason, Vec<ReasonHandler>>>>,
    error_handlers: Arc<RwLock<Vec<ErrorHandler>>>,
}

impl ErrorEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for rejections with a specific reason
    pub async fn on_reason<H>(&self, reason: Reason, handler: H)
    where
        H: Fn(&DeliveryError) + Send + Sync + 'static,
    {
        let mut handlers = self.reason_handlers.write().await;
        handlers.entry(reason).or_default().push(Box::new(handler));
    }

    /// Register a handler for every failed send
    pub async fn on_error<H>(&self, handler: H)
    where
        H: Fn(&ApnsError) + Send + Sync + 'static,
    {
        let mut handlers = self.error_handlers.write().await;
        handlers.push(Box::new(handler));
    }

    pub async fn emit(&self, error: &ApnsError) {
        if let Some(rejection) = error.as_delivery() {
            trace!(channel = rejection.reason.as_str(), "Publishing delivery error");
            let handlers = self.reason_handlers.read().await;
            for handler in handlers.get(&rejection.reason).into_iter().flatten() {
                handler(rejection);
            }
        }

        trace!(channel = ERROR_CHANNEL, "Publishing send error");
        let handlers = self.error_handlers.read().await;
        for handler in handlers.iter() {
            handler(error);
        }
    }
}
