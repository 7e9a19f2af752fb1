use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::types::{InlineKeyboardMarkup, Update};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram rejected {method}: {description}")]
    Api { method: String, description: String },
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Bot API client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BotClient {
    http: Client,
    base: String,
}

impl BotClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(API_BASE, token)
    }

    /// Points the client at another Bot API server (local bot API, tests).
    pub fn with_base_url(base: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base: format!("{}/bot{}", base.trim_end_matches('/'), token),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, TelegramError> {
        let url = format!("{}/{}", self.base, method);
        let response = self.http.post(&url).json(body).send().await?.json().await?;
        into_result(method, response)
    }

    /// Long-polls for updates after `offset`, waiting up to `timeout`.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let url = format!("{}/getUpdates", self.base);
        // The request itself must outlive the server-side wait.
        let response = self
            .http
            .post(&url)
            .timeout(timeout + Duration::from_secs(10))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        into_result("getUpdates", response)
    }

    /// Sends an HTML-formatted message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        let _: Value = self.call("sendMessage", &body).await?;
        debug!("Sent message to chat {}", chat_id);
        Ok(())
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        let _: Value = self.call("editMessageText", &body).await?;
        Ok(())
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), TelegramError> {
        let body = json!({
            "callback_query_id": callback_query_id,
            "text": text,
            "show_alert": show_alert,
        });
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }
}

fn into_result<T>(method: &str, response: ApiResponse<T>) -> Result<T, TelegramError> {
    match (response.ok, response.result) {
        (true, Some(result)) => Ok(result),
        _ => Err(TelegramError::Api {
            method: method.to_string(),
            description: response
                .description
                .unwrap_or_else(|| "no description".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_embeds_token() {
        let client = BotClient::with_base_url("http://localhost:8081/", "123:abc");
        assert_eq!(client.base, "http://localhost:8081/bot123:abc");
    }

    #[test]
    fn failed_response_carries_description() {
        let response: ApiResponse<Value> =
            serde_json::from_str(r#"{"ok": false, "error_code": 400, "description": "Bad Request"}"#)
                .unwrap();
        let err = into_result("sendMessage", response).unwrap_err();
        assert_eq!(err.to_string(), "telegram rejected sendMessage: Bad Request");
    }
}
