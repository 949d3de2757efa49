//! # GET /s3/files

use axum::extract::State;
use axum::Json;

use crate::config::SharedState;
use crate::error::GatewayError;

/// GET /s3/files — `uploads/`配下のキーをJSON配列で返す。
pub async fn handle_list_files(
    State(state): State<SharedState>,
) -> Result<Json<Vec<String>>, GatewayError> {
    let keys = state.gateway.list_objects().await?;
    Ok(Json(keys))
}
