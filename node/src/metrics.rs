//! # Prometheus Metrics
//!
//! Flow counters and timings for the node, scraped at `/metrics` on both the
//! API port and the dedicated metrics port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] with the
//! `reledger` prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use reledger_workflows::{FlowError, ResponderOutcome};

#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Issuance flows started through the API or CLI.
    pub flows_started_total: IntCounter,
    pub flows_finalised_total: IntCounter,
    /// Failed issuance flows, labelled by error kind.
    pub flows_failed_total: IntCounterVec,
    /// Wall time of an issuance flow, start to finalised or failed.
    pub flow_duration_seconds: Histogram,
    /// Responder sessions, labelled `recorded` or by error kind.
    pub responder_sessions_total: IntCounterVec,
    pub network_parties: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("reledger".into()), None)
            .expect("failed to create prometheus registry");

        let flows_started_total =
            IntCounter::new("flows_started_total", "Issuance flows started")
                .expect("metric creation");
        registry
            .register(Box::new(flows_started_total.clone()))
            .expect("metric registration");

        let flows_finalised_total = IntCounter::new(
            "flows_finalised_total",
            "Issuance flows that produced a notarised transaction",
        )
        .expect("metric creation");
        registry
            .register(Box::new(flows_finalised_total.clone()))
            .expect("metric registration");

        let flows_failed_total = IntCounterVec::new(
            Opts::new("flows_failed_total", "Issuance flows that failed, by error kind"),
            &["kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(flows_failed_total.clone()))
            .expect("metric registration");

        let flow_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "flow_duration_seconds",
                "Issuance flow duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(flow_duration_seconds.clone()))
            .expect("metric registration");

        let responder_sessions_total = IntCounterVec::new(
            Opts::new(
                "responder_sessions_total",
                "Inbound responder sessions, by outcome",
            ),
            &["outcome"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(responder_sessions_total.clone()))
            .expect("metric registration");

        let network_parties = IntGauge::new("network_parties", "Parties in the local network")
            .expect("metric creation");
        registry
            .register(Box::new(network_parties.clone()))
            .expect("metric registration");

        Self {
            registry,
            flows_started_total,
            flows_finalised_total,
            flows_failed_total,
            flow_duration_seconds,
            responder_sessions_total,
            network_parties,
        }
    }

    pub fn record_flow_failure(&self, err: &FlowError) {
        self.flows_failed_total.with_label_values(&[err.kind()]).inc();
    }

    pub fn record_responder(&self, outcome: &ResponderOutcome) {
        let label = match outcome {
            ResponderOutcome::Recorded { .. } => "recorded",
            ResponderOutcome::Failed { kind, .. } => *kind,
        };
        self.responder_sessions_total
            .with_label_values(&[label])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// Renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reledger_workflows::FlowStage;

    #[test]
    fn failures_are_labelled_by_kind() {
        let metrics = NodeMetrics::new();
        metrics.record_flow_failure(&FlowError::Timeout {
            stage: FlowStage::GatheringSignatures,
            timeout_ms: 10,
        });
        metrics.record_responder(&ResponderOutcome::Failed {
            kind: "cancelled",
            error: "flow cancelled".into(),
        });

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"reledger_flows_failed_total{kind="timeout"} 1"#));
        assert!(text.contains(r#"reledger_responder_sessions_total{outcome="cancelled"} 1"#));
    }
}
