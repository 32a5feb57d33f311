//! Firefox logins JSON adapter.
//!
//! Firefox exports `{"logins": [{"hostname", "username", "password", ...}]}`.

use super::sanitize::{RawPassword, RawRecord};
use crate::{Result, VaultError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FirefoxExport {
    #[serde(default)]
    logins: Vec<FirefoxLogin>,
}

#[derive(Debug, Deserialize)]
struct FirefoxLogin {
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default, rename = "formSubmitURL")]
    form_submit_url: String,
}

pub fn parse(content: &str) -> Result<Vec<RawRecord>> {
    let export: FirefoxExport = serde_json::from_str(content)
        .map_err(|e| VaultError::InvalidInput(format!("Invalid Firefox JSON: {}", e)))?;

    Ok(export
        .logins
        .into_iter()
        .map(|login| {
            let name = login
                .hostname
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .to_string();
            let url = if login.hostname.is_empty() {
                login.form_submit_url
            } else {
                login.hostname
            };
            RawRecord::Password(RawPassword {
                name,
                username: login.username,
                password: login.password,
                url,
                category: "Firefox Import".to_string(),
                notes: String::new(),
                tags: vec!["firefox".to_string()],
            })
        })
        .collect())
}
