use reqwest::Client;
use serde_json::json;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Fire-and-forget Telegram sink for trade notifications.
///
/// Disabled unless both token and chat id are present; every failure is
/// swallowed so a broken notification channel can never affect trading.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            client: Client::new(),
            base_url: TELEGRAM_API.to_string(),
            credentials: Some((token, chat_id)),
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            base_url: TELEGRAM_API.to_string(),
            credentials: None,
        }
    }

    /// Build from `TELEGRAM_TOKEN` / `TELEGRAM_CHAT_ID`; disabled when
    /// either is missing.
    pub fn from_env() -> Self {
        match (
            std::env::var("TELEGRAM_TOKEN"),
            std::env::var("TELEGRAM_CHAT_ID"),
        ) {
            (Ok(token), Ok(chat_id)) => Self::new(token, chat_id),
            _ => {
                tracing::warn!(
                    "Telegram reporting requested but TELEGRAM_TOKEN/TELEGRAM_CHAT_ID not set"
                );
                Self::disabled()
            }
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send a message. Returns whether delivery succeeded; never errors.
    pub async fn notify(&self, message: &str) -> bool {
        let Some((token, chat_id)) = &self.credentials else {
            return false;
        };

        let url = format!("{}/bot{}/sendMessage", self.base_url, token);
        let payload = json!({ "chat_id": chat_id, "text": message });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Telegram notification failed: {}", e);
                false
            }
        }
    }
}
