pub mod entities;
pub mod payload;

pub use entities::{Expiration, Notification, NotificationOptions, Priority, PushType};
pub use payload::Payload;
