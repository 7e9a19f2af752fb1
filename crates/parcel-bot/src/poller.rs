//! Long-polling loop: fetch updates, run the matching handler on the
//! blocking pool, send the result back.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use parcel_core::OpResult;
use parcel_telegram::BotClient;
use parcel_telegram::types::{CallbackQuery, Message, Update};

use crate::handlers::{CallbackReply, Handlers, Screen};

const POLL_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_DELAY: Duration = Duration::from_secs(3);
const APOLOGY: &str = "😔 Something went wrong. Please try again later.";

pub async fn run(client: BotClient, handlers: Handlers, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);
    let mut offset = 0;

    loop {
        let updates = tokio::select! {
            _ = &mut shutdown => break,
            result = client.get_updates(offset, POLL_TIMEOUT) => result,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = update.update_id + 1;
                    if let Err(e) = handle_update(&client, &handlers, update).await {
                        error!("Update handling failed: {:#}", e);
                    }
                }
            }
            Err(e) => {
                warn!("getUpdates failed: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

async fn handle_update(client: &BotClient, handlers: &Handlers, update: Update) -> anyhow::Result<()> {
    if let Some(query) = update.callback_query {
        handle_callback(client, handlers, query).await
    } else if let Some(message) = update.message {
        handle_message(client, handlers, message).await
    } else {
        debug!("Skipping update {}", update.update_id);
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> anyhow::Result<OpResult<T>>
where
    F: FnOnce() -> OpResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await?)
}

async fn handle_message(client: &BotClient, handlers: &Handlers, message: Message) -> anyhow::Result<()> {
    let Some(from) = message.from else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let handlers = handlers.clone();
    let web_app_data = message.web_app_data;
    let text = message.text;

    let result = blocking(move || match (web_app_data, text) {
        (Some(data), _) => handlers.web_app_data(&from, &data.data).map(Some),
        (None, Some(text)) => handlers.command(&from, &text),
        (None, None) => Ok(None),
    })
    .await?;

    match result {
        Ok(Some(screen)) => send(client, chat_id, &screen).await?,
        Ok(None) => {}
        Err(e) => {
            error!("Message from {} failed: {}", chat_id, e);
            client.send_message(chat_id, APOLOGY, None).await?;
        }
    }
    Ok(())
}

async fn handle_callback(client: &BotClient, handlers: &Handlers, query: CallbackQuery) -> anyhow::Result<()> {
    let Some(data) = query.data.clone() else {
        client.answer_callback_query(&query.id, None, false).await?;
        return Ok(());
    };
    let from = query.from.clone();
    let handlers = handlers.clone();
    let result = blocking(move || handlers.callback(&from, &data)).await?;

    let screen = match result {
        Ok(CallbackReply::Edit(screen)) => screen,
        Ok(CallbackReply::Alert(text)) => {
            client.answer_callback_query(&query.id, Some(text), true).await?;
            return Ok(());
        }
        Ok(CallbackReply::Ignore) => {
            client.answer_callback_query(&query.id, None, false).await?;
            return Ok(());
        }
        Err(e) => {
            error!("Callback from {} failed: {}", query.from.id, e);
            client.answer_callback_query(&query.id, Some(APOLOGY), true).await?;
            return Ok(());
        }
    };

    client.answer_callback_query(&query.id, None, false).await?;
    match &query.message {
        Some(message) => {
            // Telegram refuses edits that change nothing; that is harmless.
            if let Err(e) = client
                .edit_message_text(message.chat.id, message.message_id, &screen.text, screen.keyboard.as_ref())
                .await
            {
                warn!("Edit failed for chat {}: {}", message.chat.id, e);
            }
        }
        None => send(client, query.from.id, &screen).await?,
    }
    Ok(())
}

async fn send(client: &BotClient, chat_id: i64, screen: &Screen) -> anyhow::Result<()> {
    client.send_message(chat_id, &screen.text, screen.keyboard.as_ref()).await?;
    Ok(())
}
