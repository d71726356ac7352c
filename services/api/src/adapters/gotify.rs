//! services/api/src/adapters/gotify.rs
//!
//! Push notifications through a Gotify server. Implements the
//! `NotificationChannel` port.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use subtrack_core::domain::{non_blank, Notice, Settings};
use subtrack_core::ports::{NotificationChannel, PortError, PortResult};
use tracing::{error, info};

const PRIORITY: u8 = 5;

#[derive(Serialize)]
struct GotifyMessage<'a> {
    title: &'a str,
    message: &'a str,
    priority: u8,
}

#[derive(Clone)]
pub struct GotifyAdapter {
    client: Client,
}

impl GotifyAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// `<server>/message?token=<token>`, keeping any path prefix of the server URL.
    fn message_url(server: &str, token: &str) -> PortResult<Url> {
        let base = if server.ends_with('/') {
            server.to_string()
        } else {
            format!("{}/", server)
        };
        let mut url = Url::parse(&base)
            .and_then(|b| b.join("message"))
            .map_err(|e| PortError::InvalidInput(format!("Invalid Gotify URL '{}': {}", server, e)))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }
}

#[async_trait]
impl NotificationChannel for GotifyAdapter {
    fn name(&self) -> &'static str {
        "gotify"
    }

    fn is_configured(&self, settings: &Settings) -> bool {
        settings.gotify_configured()
    }

    async fn send(&self, settings: &Settings, notice: &Notice) -> PortResult<()> {
        let (Some(server), Some(token)) = (
            non_blank(&settings.gotify_url),
            non_blank(&settings.gotify_token),
        ) else {
            return Err(PortError::InvalidInput(
                "Gotify URL and token are required".to_string(),
            ));
        };

        let url = Self::message_url(server, token)?;
        let payload = GotifyMessage {
            title: &notice.title,
            message: &notice.body,
            priority: PRIORITY,
        };

        self.client
            .post(url)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("Gotify Error: {}", e);
                PortError::Unexpected(format!("Failed to send Gotify notification: {}", e))
            })?;

        info!("Gotify notification sent.");
        Ok(())
    }
}
