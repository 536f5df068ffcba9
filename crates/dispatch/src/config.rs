//! Collector endpoint configuration.

/// Default collector endpoint, overridable via `FIELDORDER_COLLECTOR_URL`.
pub const DEFAULT_COLLECTOR_URL: &str =
    "https://collector.fieldorder.example/webhook/service-orders";

/// Where finalized orders are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub endpoint: String,
}

impl DispatchConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Read the endpoint from `FIELDORDER_COLLECTOR_URL`, falling back to the
    /// built-in default.
    pub fn from_env() -> Self {
        let endpoint = std::env::var("FIELDORDER_COLLECTOR_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COLLECTOR_URL.to_string());
        Self { endpoint }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTOR_URL)
    }
}
