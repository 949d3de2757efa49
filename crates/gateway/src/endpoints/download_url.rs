//! # GET /s3/presigned/download-url

use axum::extract::{Query, State};
use bucketgate_types::DownloadUrlQuery;

use crate::config::SharedState;
use crate::error::GatewayError;

/// GET /s3/presigned/download-url?fileKey=... — URLをテキストで返す。
///
/// キーはそのまま署名する。`uploads/`の付与はクライアントの責務。
pub async fn handle_download_url(
    State(state): State<SharedState>,
    Query(query): Query<DownloadUrlQuery>,
) -> Result<String, GatewayError> {
    let grant = state.gateway.create_download_grant(&query.file_key).await?;
    Ok(grant.url)
}
