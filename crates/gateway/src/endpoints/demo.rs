//! # GET /s3/demo

/// GET /s3/demo — 疎通確認。
pub async fn handle_demo() -> &'static str {
    "Working fine"
}
