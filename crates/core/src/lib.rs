pub mod domain;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod storage;
pub mod time;

pub mod config {
    use crate::domain::filter::{DEFAULT_MIN_PROFIT, DEFAULT_MIN_RATE_OF_RETURN};
    use std::path::PathBuf;

    pub const DEFAULT_SOURCE_URL: &str = "https://histock.tw/stock/public.aspx";
    pub const DEFAULT_BASELINE_PATH: &str = "baseline.csv";
    pub const DEFAULT_LINE_API_BASE_URL: &str = "https://api.line.me";
    pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
    pub const DEFAULT_SMTP_PORT: u16 = 587;

    const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_FETCH_RETRIES: u32 = 3;
    const DEFAULT_FETCH_RETRY_DELAY_SECS: u64 = 2;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub source_url: String,
        pub baseline_path: PathBuf,
        pub fetch_timeout_secs: u64,
        pub fetch_retries: u32,
        pub fetch_retry_delay_secs: u64,
        pub min_rate_of_return: f64,
        pub min_profit: f64,
        pub channel_access_token: Option<String>,
        pub line_user_id: Option<String>,
        pub line_api_base_url: String,
        pub email_sender: Option<String>,
        pub email_password: Option<String>,
        pub email_receiver: Option<String>,
        pub smtp_host: String,
        pub smtp_port: u16,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from an arbitrary key lookup. Blank values count as unset.
        pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let get = |key: &str| {
                lookup(key)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            };

            let fetch_retries = get("IPO_FETCH_RETRIES")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(DEFAULT_FETCH_RETRIES);
            anyhow::ensure!(fetch_retries >= 1, "IPO_FETCH_RETRIES must be >= 1");

            Ok(Self {
                source_url: get("IPO_SOURCE_URL").unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
                baseline_path: get("IPO_BASELINE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_BASELINE_PATH)),
                fetch_timeout_secs: get("IPO_FETCH_TIMEOUT_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
                fetch_retries,
                fetch_retry_delay_secs: get("IPO_FETCH_RETRY_DELAY_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_FETCH_RETRY_DELAY_SECS),
                min_rate_of_return: get("IPO_MIN_RATE_OF_RETURN")
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .unwrap_or(DEFAULT_MIN_RATE_OF_RETURN),
                min_profit: get("IPO_MIN_PROFIT")
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .unwrap_or(DEFAULT_MIN_PROFIT),
                channel_access_token: get("CHANNEL_ACCESS_TOKEN"),
                line_user_id: get("LINE_USER_ID"),
                line_api_base_url: get("LINE_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_LINE_API_BASE_URL.to_string()),
                email_sender: get("EMAIL_SENDER"),
                email_password: get("EMAIL_PASSWORD"),
                email_receiver: get("EMAIL_RECEIVER"),
                smtp_host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                smtp_port: get("SMTP_PORT")
                    .and_then(|s| s.parse::<u16>().ok())
                    .unwrap_or(DEFAULT_SMTP_PORT),
                sentry_dsn: get("SENTRY_DSN"),
            })
        }
    }

}
