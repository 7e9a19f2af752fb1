//! The subset of Bot API objects the bot reads and writes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<TgUser>,
    pub text: Option<String>,
    pub web_app_data: Option<WebAppData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TgUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Payload a WebApp sends back with `Telegram.WebApp.sendData`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebAppData {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    pub fn new(rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        Self { inline_keyboard: rows }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            web_app: None,
        }
    }

    pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            web_app: Some(WebAppInfo { url: url.into() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_callback_update() {
        let json = r#"{
            "update_id": 10,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 42, "is_bot": false, "first_name": "Ann"},
                "message": {"message_id": 7, "chat": {"id": 42, "type": "private"}, "date": 0},
                "data": "client_orders"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let query = update.callback_query.unwrap();
        assert_eq!(query.from.id, 42);
        assert_eq!(query.data.as_deref(), Some("client_orders"));
        assert_eq!(query.message.unwrap().chat.id, 42);
    }

    #[test]
    fn buttons_omit_unused_fields() {
        let button = InlineKeyboardButton::callback("Orders", "client_orders");
        let json = serde_json::to_value(&button).unwrap();
        assert_eq!(json, serde_json::json!({"text": "Orders", "callback_data": "client_orders"}));
    }
}
