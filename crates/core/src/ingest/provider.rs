use crate::config::Settings;
use crate::domain::item::Dataset;
use crate::ingest::error::FetchError;
use crate::ingest::listing::parse_listing;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

#[async_trait::async_trait]
pub trait DatasetFetcher: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Dataset, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HistockFetcher {
    http: reqwest::Client,
    url: String,
    retries: u32,
    retry_delay: Duration,
}

impl HistockFetcher {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build listing http client")?;

        Ok(Self {
            http,
            url: settings.source_url.clone(),
            retries: settings.fetch_retries.max(1),
            retry_delay: Duration::from_secs(settings.fetch_retry_delay_secs),
        })
    }

    async fn fetch_page_once(&self) -> Result<String> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("listing request failed")?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .context("failed to read listing response body")?;
        if !status.is_success() {
            anyhow::bail!("listing HTTP {status}");
        }

        // The site serves UTF-8 regardless of what the headers claim.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait::async_trait]
impl DatasetFetcher for HistockFetcher {
    fn source_name(&self) -> &'static str {
        "histock"
    }

    async fn fetch(&self) -> Result<Dataset, FetchError> {
        let mut attempt: u32 = 0;
        let html = loop {
            attempt += 1;
            match self.fetch_page_once().await {
                Ok(html) => break html,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(FetchError::Unavailable {
                            attempts: attempt,
                            detail: format!("{err:#}"),
                        });
                    }
                    tracing::warn!(
                        attempt,
                        backoff = ?self.retry_delay,
                        error = %err,
                        "listing fetch failed; retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        };

        let dataset = parse_listing(&html)?;
        tracing::debug!(
            url = %self.url,
            attempts = attempt,
            rows = dataset.len(),
            "listing parsed"
        );
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn unreachable_source_reports_unavailable_after_all_attempts() {
        // Port 9 on loopback (discard) is closed on test hosts; the connect fails fast.
        let settings = settings_with(&[
            ("IPO_SOURCE_URL", "http://127.0.0.1:9/public.aspx"),
            ("IPO_FETCH_RETRIES", "2"),
            ("IPO_FETCH_RETRY_DELAY_SECS", "0"),
            ("IPO_FETCH_TIMEOUT_SECS", "2"),
        ]);
        let fetcher = HistockFetcher::from_settings(&settings).unwrap();

        let err = fetcher.fetch().await.unwrap_err();
        match err {
            FetchError::Unavailable { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
