use crate::config::Settings;
use crate::notify::Notifier;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

const PUSH_PATH: &str = "/v2/bot/message/push";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct LineNotifier {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    to: String,
}

impl LineNotifier {
    /// `Ok(None)` when the token or recipient is not configured.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let Some(access_token) = settings.channel_access_token.clone() else {
            tracing::info!("CHANNEL_ACCESS_TOKEN not set; LINE transport disabled");
            return Ok(None);
        };
        let Some(to) = settings.line_user_id.clone() else {
            tracing::info!("LINE_USER_ID not set; LINE transport disabled");
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build LINE http client")?;

        Ok(Some(Self {
            http,
            base_url: settings.line_api_base_url.clone(),
            access_token,
            to,
        }))
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), PUSH_PATH)
    }

    fn push_request<'a>(&'a self, message: &'a str) -> PushRequest<'a> {
        PushRequest {
            to: &self.to,
            messages: vec![TextMessage {
                kind: "text",
                text: message,
            }],
        }
    }
}

#[async_trait::async_trait]
impl Notifier for LineNotifier {
    fn transport(&self) -> &'static str {
        "line"
    }

    async fn deliver(&self, message: &str) -> anyhow::Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .context("CHANNEL_ACCESS_TOKEN is not a valid header value")?,
        );

        let res = self
            .http
            .post(self.url())
            .headers(headers)
            .json(&self.push_request(message))
            .send()
            .await
            .context("LINE push request failed")?;

        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("LINE push HTTP {status}: {body}");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn settings_with(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn disabled_without_credentials() {
        assert!(LineNotifier::from_settings(&settings_with(&[])).unwrap().is_none());
        assert!(LineNotifier::from_settings(&settings_with(&[("CHANNEL_ACCESS_TOKEN", "t")]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn push_body_matches_messaging_api_shape() {
        let n = LineNotifier::from_settings(&settings_with(&[
            ("CHANNEL_ACCESS_TOKEN", "t"),
            ("LINE_USER_ID", "U123"),
            ("LINE_API_BASE_URL", "https://api.line.me/"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(n.url(), "https://api.line.me/v2/bot/message/push");
        assert_eq!(
            serde_json::to_value(n.push_request("hi")).unwrap(),
            json!({"to": "U123", "messages": [{"type": "text", "text": "hi"}]})
        );
    }
}
