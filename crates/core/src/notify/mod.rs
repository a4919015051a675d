pub mod email;
pub mod format;
pub mod line;

use crate::config::Settings;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn transport(&self) -> &'static str;

    async fn deliver(&self, message: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub transport: &'static str,
    pub outcome: DeliveryOutcome,
}

/// Every enabled transport. Each one is tried once; a failure never stops the others.
#[derive(Default)]
pub struct NotifierSet {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// A transport whose configuration is rejected is left out; the others still load.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut set = Self::new();
        match line::LineNotifier::from_settings(settings) {
            Ok(Some(line)) => set = set.with(Box::new(line)),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(transport = "line", error = %format!("{err:#}"), "LINE transport misconfigured; disabled");
            }
        }
        match email::EmailNotifier::from_settings(settings) {
            Ok(Some(email)) => set = set.with(Box::new(email)),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(transport = "email", error = %format!("{err:#}"), "email transport misconfigured; disabled");
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn transports(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.transport()).collect()
    }

    pub async fn notify_all(&self, message: &str) -> Vec<Delivery> {
        let mut out = Vec::with_capacity(self.notifiers.len());
        for notifier in &self.notifiers {
            let transport = notifier.transport();
            let outcome = match notifier.deliver(message).await {
                Ok(()) => {
                    tracing::info!(transport, "notification delivered");
                    DeliveryOutcome::Delivered
                }
                Err(err) => {
                    tracing::error!(transport, error = %format!("{err:#}"), "notification delivery failed");
                    DeliveryOutcome::Failed(format!("{err:#}"))
                }
            };
            out.push(Delivery { transport, outcome });
        }
        out
    }
}
