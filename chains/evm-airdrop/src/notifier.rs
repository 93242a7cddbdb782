use anyhow::{Context, Error, Result};
use async_trait::async_trait;
use core_logic::{Notifier, NotifyEvent, TelegramConfig};
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: NotifyEvent) {}
}

/// Telegram bot sink. Each event is posted from its own task.
pub struct TelegramNotifier {
    config: Arc<TelegramConfig>,
    client: Client,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            client,
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Telegram sink when enabled and configured, no-op otherwise.
    pub fn from_config(config: &TelegramConfig) -> Result<Arc<dyn Notifier>> {
        if config.enabled && !config.bot_token.is_empty() && !config.chat_id.is_empty() {
            Ok(Arc::new(Self::new(config.clone())?))
        } else {
            if config.enabled {
                warn!("Telegram enabled but bot_token or chat_id is empty, notifications disabled");
            }
            Ok(Arc::new(NoopNotifier))
        }
    }

    async fn send_message(client: &Client, config: &TelegramConfig, text: &str) -> Result<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            config.bot_token
        );

        let payload = serde_json::json!({
            "chat_id": config.chat_id,
            "text": text,
        });

        let response = client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::new(e).context("Failed to send Telegram request"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::msg(format!(
                "Telegram API error: {} - {}",
                status, body
            )));
        }

        debug!("Telegram notification sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn notify(&self, event: NotifyEvent) {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let text = event.message();

        let handle = tokio::spawn(async move {
            if let Err(e) = Self::send_message(&client, &config, &text).await {
                warn!("Telegram notification failed: {:#}", e);
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }

        let wait = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(FLUSH_TIMEOUT, wait).await.is_err() {
            warn!("Timed out waiting for Telegram notifications");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_config_is_noop() {
        let config = TelegramConfig::default();
        let notifier = TelegramNotifier::from_config(&config).unwrap();
        notifier.notify(NotifyEvent::RunFailed {
            reason: "test".to_string(),
        });
        notifier.flush().await;
    }

    #[tokio::test]
    async fn test_flush_with_nothing_pending() {
        let notifier = TelegramNotifier::new(TelegramConfig {
            enabled: true,
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
        })
        .unwrap();
        notifier.flush().await;
        assert!(notifier.pending.lock().unwrap().is_empty());
    }
}
