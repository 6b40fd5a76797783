use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Request counters, kept in a registry owned by the app rather than the global one.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let requests = IntCounterVec::new(
            Opts::new("bomsheet_requests_total", "Dispatched API requests"),
            &["action", "table", "outcome"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        Ok(Self { registry, requests })
    }

    pub fn record(&self, action: &str, table: &str, outcome: &str) {
        self.requests
            .with_label_values(&[action, table, outcome])
            .inc();
    }

    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(err) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %err, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_exported() {
        let metrics = Metrics::new().unwrap();
        metrics.record("get", "bom", "success");
        metrics.record("get", "bom", "success");

        let text = metrics.render();
        assert!(text.contains("bomsheet_requests_total"));
        assert!(text.contains(r#"action="get""#));
        assert!(text.contains("} 2"));
    }
}
