use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Gameplay
    pub static ref GUESSES_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "guesses_submitted_total",
        "Total number of scored guesses",
        &["correct"]
    )
    .unwrap();

    pub static ref GUESS_SIMILARITY: Histogram = register_histogram!(
        "guess_similarity",
        "Similarity of scored guesses to the target word",
        vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0]
    )
    .unwrap();

    pub static ref CHALLENGES_CREATED_TOTAL: IntCounter = register_int_counter!(
        "challenges_created_total",
        "Daily challenges created by the rotator"
    )
    .unwrap();

    pub static ref LEDGER_CONFLICTS_TOTAL: IntCounter = register_int_counter!(
        "ledger_conflicts_total",
        "Progress commits retried after losing a concurrent update"
    )
    .unwrap();

    pub static ref HINTS_REQUESTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "hints_requested_total",
        "Total number of hints served",
        &["source"]
    )
    .unwrap();

    pub static ref BONUS_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "bonus_decisions_total",
        "Bonus offers accepted or declined",
        &["decision"]
    )
    .unwrap();

    // External capabilities
    pub static ref EMBEDDING_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "embedding_requests_total",
        "Embedding requests by outcome",
        &["status"]
    )
    .unwrap();

    pub static ref EMBEDDING_REQUEST_DURATION_SECONDS: Histogram = register_histogram!(
        "embedding_request_duration_seconds",
        "Embedding request duration in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    pub static ref GENERATION_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "generation_requests_total",
        "Text generation requests by kind and outcome",
        &["kind", "outcome"]
    )
    .unwrap();

    // Abuse guard
    pub static ref ABUSE_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "abuse_rejections_total",
        "Requests rejected by the abuse guard",
        &["reason"]
    )
    .unwrap();

    pub static ref BANS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "bans_created_total",
        "Ban records created or refreshed"
    )
    .unwrap();

    pub static ref BAN_SWEEPER_TICKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ban_sweeper_ticks_total",
        "Total number of ban sweeper ticks",
        &["status"]
    )
    .unwrap();

    // Cache Metrics (Redis)
    pub static ref CACHE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_operations_total",
        "Total number of cache operations",
        &["operation", "status"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: time an embedding call and count its outcome
pub async fn track_embedding_request<F, T, E>(future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    EMBEDDING_REQUEST_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());

    let status = if result.is_ok() { "success" } else { "error" };
    EMBEDDING_REQUESTS_TOTAL.with_label_values(&[status]).inc();

    result
}

pub fn record_guess(correct: bool, similarity: f64) {
    GUESSES_SUBMITTED_TOTAL
        .with_label_values(&[if correct { "true" } else { "false" }])
        .inc();
    GUESS_SIMILARITY.observe(similarity);
}

pub fn record_generation(kind: &str, outcome: &str) {
    GENERATION_REQUESTS_TOTAL
        .with_label_values(&[kind, outcome])
        .inc();
}

pub fn record_cache_operation(operation: &str, ok: bool) {
    CACHE_OPERATIONS_TOTAL
        .with_label_values(&[operation, if ok { "success" } else { "error" }])
        .inc();
}
