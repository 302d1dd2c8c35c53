use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder};

lazy_static! {
    pub static ref RELAY_PEERS: IntGauge = register_int_gauge!(
        "tvrelay_relay_peers",
        "Peers currently connected to the control relay"
    )
    .unwrap();
    pub static ref PROXY_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "tvrelay_proxy_requests_total",
        "Proxy requests by target kind and outcome",
        &["kind", "outcome"]
    )
    .unwrap();
}

pub fn record_proxy_request(kind: &str, outcome: &str) {
    PROXY_REQUESTS.with_label_values(&[kind, outcome]).inc();
}

pub fn gather_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_registered_metrics() {
        record_proxy_request("manifest", "ok");
        let text = gather_metrics();
        assert!(text.contains("tvrelay_proxy_requests_total"));
        assert!(text.contains("kind=\"manifest\""));
    }
}
