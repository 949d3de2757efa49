//! # PUT|GET /local-storage/{bucket}
//!
//! ローカルバックエンドが発行した署名付きURLの受け口。
//! 操作はリクエストメソッドから決まり、署名と有効期限を検証してから処理する。

use std::time::SystemTime;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use bucketgate_types::{LocalGrantQuery, Operation};

use crate::config::SharedState;
use crate::error::GatewayError;
use crate::signer::unix_secs;
use crate::storage::local::LocalBackend;

fn backend(state: &SharedState) -> Result<&LocalBackend, GatewayError> {
    state
        .local
        .as_ref()
        .ok_or_else(|| GatewayError::NotFound("ローカルストレージは無効です".to_string()))
}

/// PUT /local-storage/{bucket}?key=...&expires=...&signature=...
pub async fn handle_local_put(
    State(state): State<SharedState>,
    Path(bucket): Path<String>,
    Query(query): Query<LocalGrantQuery>,
    body: Bytes,
) -> Result<StatusCode, GatewayError> {
    let local = backend(&state)?;
    local.verify(Operation::Put, &bucket, &query, unix_secs(SystemTime::now())?)?;

    let size = body.len();
    local
        .store
        .insert_object(&bucket, &query.key, body.to_vec())
        .await;
    tracing::info!(bucket = %bucket, key = %query.key, size, "署名付きURLでアップロード");
    Ok(StatusCode::OK)
}

/// GET /local-storage/{bucket}?key=...&expires=...&signature=...
pub async fn handle_local_get(
    State(state): State<SharedState>,
    Path(bucket): Path<String>,
    Query(query): Query<LocalGrantQuery>,
) -> Result<Vec<u8>, GatewayError> {
    let local = backend(&state)?;
    local.verify(Operation::Get, &bucket, &query, unix_secs(SystemTime::now())?)?;
    local.store.get_object(&bucket, &query.key).await
}
