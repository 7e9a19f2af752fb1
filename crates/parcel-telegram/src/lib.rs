//! Thin Telegram Bot API client plus WebApp `initData` verification.

pub mod client;
pub mod init_data;
pub mod types;

pub use client::{BotClient, TelegramError};
pub use init_data::{InitDataError, WebAppUser, sign_init_data, verify_init_data};
