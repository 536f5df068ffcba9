//! One-shot delivery of the export payload to the collector endpoint.

use async_trait::async_trait;

use crate::config::DispatchConfig;
use crate::payload::ExportPayload;

/// Outbound notification seam.
///
/// Implementations must be best-effort: report success or failure, never
/// panic and never surface an error type. The finalizing transition commits
/// regardless of this outcome.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn dispatch(&self, payload: &ExportPayload) -> bool;
}

/// HTTP notifier: a single JSON POST, no retry, no backoff.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.endpoint.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl OrderNotifier for HttpNotifier {
    async fn dispatch(&self, payload: &ExportPayload) -> bool {
        let result = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(
                    order = %payload.order.id,
                    number = %payload.order.number,
                    "finalization payload delivered"
                );
                true
            }
            Ok(response) => {
                tracing::warn!(
                    order = %payload.order.id,
                    status = %response.status(),
                    "collector rejected finalization payload"
                );
                false
            }
            Err(error) => {
                tracing::warn!(
                    order = %payload.order.id,
                    %error,
                    "finalization dispatch failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldorder_core::OrderId;
    use fieldorder_orders::ServiceOrder;

    #[test]
    fn http_notifier_keeps_the_configured_endpoint() {
        let notifier = HttpNotifier::from_config(&DispatchConfig::new("http://localhost:1/hook"));
        assert_eq!(notifier.endpoint(), "http://localhost:1/hook");
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_false_instead_of_erroring() {
        // Port 1 on localhost refuses connections; the notifier must swallow it.
        let notifier = HttpNotifier::new("http://127.0.0.1:1/hook");
        let order = ServiceOrder::new(OrderId::new(), chrono::Utc::now());
        let payload = ExportPayload::from_order(&order, &[]);
        assert!(!notifier.dispatch(&payload).await);
    }
}
