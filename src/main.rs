use anyhow::{Result, bail};
use apns_client::{
    ApnsClient, ApnsError, ClientConfig, Expiration, Notification, Payload, Priority, PushType,
    Settings, transport::dummy::DummyTransport,
};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "apns-client", about = "Send push notifications through APNs")]
struct Cli {
    /// Settings file, defaults to ./settings.{toml,...}
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a single notification
    Send(SendArgs),
}

#[derive(Debug, clap::Args)]
struct SendArgs {
    #[arg(long)]
    device_token: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    body: Option<String>,
    #[arg(long)]
    badge: Option<u32>,
    #[arg(long)]
    sound: Option<String>,
    #[arg(long)]
    push_type: Option<PushType>,
    #[arg(long)]
    priority: Option<Priority>,
    #[arg(long)]
    topic: Option<String>,
    #[arg(long)]
    collapse_id: Option<String>,
    /// Expiration as seconds since the unix epoch
    #[arg(long)]
    expiration: Option<i64>,
    /// Send a background notification that only wakes the app
    #[arg(long)]
    silent: bool,
    /// Log the request instead of sending it
    #[arg(long)]
    dry_run: bool,
}

impl SendArgs {
    fn notification(&self) -> Notification {
        let mut notification = if self.silent {
            Notification::silent(&self.device_token)
        } else {
            let mut payload = Payload::new();
            if let Some(title) = &self.title {
                payload = payload.title(title);
            }
            if let Some(body) = &self.body {
                payload = payload.body(body);
            }
            if let Some(badge) = self.badge {
                payload = payload.badge(badge);
            }
            if let Some(sound) = &self.sound {
                payload = payload.sound(sound);
            }
            Notification::new(&self.device_token).with_payload(payload)
        };

        if let Some(push_type) = self.push_type {
            notification = notification.with_push_type(push_type);
        }
        if let Some(priority) = self.priority {
            notification = notification.with_priority(priority);
        }
        if let Some(topic) = &self.topic {
            notification = notification.with_topic(topic);
        }
        if let Some(collapse_id) = &self.collapse_id {
            notification = notification.with_collapse_id(collapse_id);
        }
        if let Some(expiration) = self.expiration {
            notification = notification.with_expiration(Expiration::EpochSeconds(expiration));
        }
        notification
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("RUST_LOG"))
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };
    let config = ClientConfig::from_settings(&settings)?;

    match cli.command {
        Command::Send(args) => {
            let notification = args.notification();
            let result = if args.dry_run {
                ApnsClient::new(config, Arc::new(DummyTransport))
                    .send(notification)
                    .await
            } else {
                ApnsClient::connect(config)?.send(notification).await
            };
            report(result)
        }
    }
}

fn report(result: Result<Notification, ApnsError>) -> Result<()> {
    match result {
        Ok(notification) => {
            info!(device_token = notification.device_token(), "Notification delivered");
            Ok(())
        }
        Err(ApnsError::Delivery(err)) => {
            error!(status = %err.status, reason = %err.reason, "APNs rejected the notification");
            bail!("delivery failed: {}", err.reason)
        }
        Err(err) => {
            error!("Sending failed: {}", err);
            Err(err.into())
        }
    }
}
