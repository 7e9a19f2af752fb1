//! Verification of the signed `initData` string a Telegram WebApp receives.
//!
//! Telegram signs every field except `hash`: the fields are sorted by key,
//! rendered as `key=value` lines joined with `\n`, and MACed with
//! HMAC-SHA256 under `HMAC-SHA256(key = "WebAppData", msg = bot_token)`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("initData has no hash")]
    MissingHash,

    #[error("initData hash is not hex")]
    MalformedHash,

    #[error("initData signature mismatch")]
    BadSignature,

    #[error("initData has no user")]
    MissingUser,

    #[error("initData user is malformed: {0}")]
    MalformedUser(String),
}

/// The `user` object embedded in `initData`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Checks the signature and returns the embedded user.
pub fn verify_init_data(init_data: &str, bot_token: &str) -> Result<WebAppUser, InitDataError> {
    let mut hash = None;
    let mut fields: Vec<(String, String)> = Vec::new();
    for (key, value) in form_urlencoded::parse(init_data.as_bytes()) {
        if key == "hash" {
            hash = Some(value.into_owned());
        } else {
            fields.push((key.into_owned(), value.into_owned()));
        }
    }

    let hash = hash.ok_or(InitDataError::MissingHash)?;
    let expected = hex::decode(&hash).map_err(|_| InitDataError::MalformedHash)?;

    data_mac(&mut fields, bot_token)
        .verify_slice(&expected)
        .map_err(|_| InitDataError::BadSignature)?;

    let user = fields
        .iter()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value)
        .ok_or(InitDataError::MissingUser)?;
    serde_json::from_str(user).map_err(|e| InitDataError::MalformedUser(e.to_string()))
}

/// Produces a signed `initData` query string for the given fields.
/// Used by tests and local tooling that stand in for Telegram.
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
    let mut owned: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hash = hex::encode(data_mac(&mut owned, bot_token).finalize().into_bytes());

    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        query.append_pair(key, value);
    }
    query.append_pair("hash", &hash);
    query.finish()
}

fn data_mac(fields: &mut [(String, String)], bot_token: &str) -> HmacSha256 {
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    let check_string = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret = HmacSha256::new_from_slice(b"WebAppData").expect("HMAC accepts any key length");
    secret.update(bot_token.as_bytes());
    let secret = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC accepts any key length");
    mac.update(check_string.as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456:TEST-TOKEN";
    const USER: &str = r#"{"id":93001,"first_name":"Demo","username":"demo_client"}"#;

    #[test]
    fn accepts_signed_payload() {
        let init_data = sign_init_data(&[("auth_date", "1700000000"), ("user", USER)], TOKEN);
        let user = verify_init_data(&init_data, TOKEN).unwrap();
        assert_eq!(user.id, 93001);
        assert_eq!(user.username.as_deref(), Some("demo_client"));
        assert_eq!(user.last_name, None);
    }

    #[test]
    fn rejects_tampered_or_foreign_payload() {
        let init_data = sign_init_data(&[("auth_date", "1700000000"), ("user", USER)], TOKEN);
        assert_eq!(
            verify_init_data(&init_data, "other:token"),
            Err(InitDataError::BadSignature)
        );

        let tampered = init_data.replace("1700000000", "1700000001");
        assert_eq!(verify_init_data(&tampered, TOKEN), Err(InitDataError::BadSignature));
    }

    #[test]
    fn reports_missing_parts() {
        assert_eq!(verify_init_data("user=x", TOKEN), Err(InitDataError::MissingHash));
        assert_eq!(verify_init_data("hash=zz", TOKEN), Err(InitDataError::MalformedHash));

        let no_user = sign_init_data(&[("auth_date", "1")], TOKEN);
        assert_eq!(verify_init_data(&no_user, TOKEN), Err(InitDataError::MissingUser));
    }
}
