use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};
use std::sync::LazyLock;

pub static DEVOPS_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "devops_requests_total",
        "Requests to /DevOps by outcome",
        &["status"]
    )
    .unwrap()
});

pub static TOKENS_ISSUED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("devops_tokens_issued_total", "Tokens issued").unwrap()
});

pub static TOKEN_VALIDATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "devops_token_validations_total",
        "Token validation attempts",
        &["result"]
    )
    .unwrap()
});

pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
