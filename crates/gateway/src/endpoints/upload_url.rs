//! # GET /s3/presigned/upload-url
//!
//! 衝突しないキーへのアップロード用署名付きURLを発行する。
//! クライアントは返却されたURLへ直接PUTする（Gatewayはバイト列を中継しない）。

use axum::extract::{Query, State};
use bucketgate_types::UploadUrlQuery;

use crate::config::SharedState;
use crate::error::GatewayError;

/// GET /s3/presigned/upload-url?fileName=... — URLをテキストで返す。
pub async fn handle_upload_url(
    State(state): State<SharedState>,
    Query(query): Query<UploadUrlQuery>,
) -> Result<String, GatewayError> {
    let grant = state.gateway.create_upload_grant(&query.file_name).await?;
    Ok(grant.url)
}
