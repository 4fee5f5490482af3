//! Cross-cutting, shared constants.
//!
//! Values that appear in job files, traces, and the evaluation tool live here so the
//! server and the evaluation binary cannot drift apart.

/// Generation model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Client name written into job files when the caller does not name one.
pub const DEFAULT_CLIENT: &str = "gemini";

/// Default Vertex AI region.
pub const DEFAULT_GCP_LOCATION: &str = "europe-west3";

/// Directory the runner writes results into and RAG traces are logged to.
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Retrieved snippets are cut to this many characters before prompting.
pub const SNIPPET_MAX_CHARS: usize = 400;

/// Label placed before the user question in the grounded prompt.
pub const QUESTION_LABEL: &str = "Frage";

/// Number of query characters kept in a RAG trace file name.
pub const TRACE_NAME_MAX_CHARS: usize = 40;

/// File name prefix of RAG traces. Result lookup skips these files.
pub const RAG_TRACE_PREFIX: &str = "rag_trace_";

/// File name suffix (before `.json`) of evaluation comparison files. Result lookup skips these.
pub const COMPARISON_SUFFIX: &str = "_comparison";

/// Hex characters of the query digest appended to a RAG trace file name.
pub const TRACE_DIGEST_HEX_CHARS: usize = 8;

/// Name of the baseline-vs-RAG summary table.
pub const SUMMARY_CSV_FILENAME: &str = "summary_rag_vs_baseline.csv";

/// Response header carrying the gateway outcome of a request.
pub const SUPPORT_STATUS_HEADER: &str = "x-support-status";

/// Response header carrying the job id of a `/generate` call.
pub const SUPPORT_TEST_ID_HEADER: &str = "x-support-test-id";

/// Status header value for a successful request.
pub const SUPPORT_STATUS_OK: &str = "ok";

/// Rounds seconds to millisecond precision, as reported in traces and summaries.
pub fn round_latency(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Returns at most `max_chars` characters of `text` without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
