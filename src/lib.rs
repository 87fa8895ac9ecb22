//! Client for the Apple Push Notification service HTTP/2 API.
//!
//! A send goes through four steps:
//! - get a provider token from the [`token::TokenCache`], signing a new one when stale
//! - build the request with [`request::build_request`]
//! - issue it through a [`transport::Transport`]
//! - classify the response with [`response::classify`]
//!
//! Rejections are returned to the caller and published on [`events::ErrorEvents`].
pub mod client;
pub mod error;
pub mod events;
pub mod notification;
pub mod request;
pub mod response;
pub mod settings;
pub mod token;
pub mod transport;

pub use client::{ApnsClient, SendResult};
pub use error::{ApnsError, DeliveryError, Reason};
pub use events::{ERROR_CHANNEL, ErrorEvents};
pub use notification::{Expiration, Notification, NotificationOptions, Payload, Priority, PushType};
pub use settings::{ClientConfig, Settings};
