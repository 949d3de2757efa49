//! # POST /s3/upload
//!
//! multipartの`file`フィールドを受け取り、`uploads/{ファイル名}`に保存する。
//! ボディはメモリに溜めずにステージングファイルへストリーミングする。

use axum::extract::{Multipart, State};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use crate::config::SharedState;
use crate::error::GatewayError;

/// ファイル本体を受け取るmultipartフィールド名
const FILE_FIELD: &str = "file";

/// POST /s3/upload — 保存したキーをテキストで返す。
pub async fn handle_upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<String, GatewayError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidInput(format!("multipartの解析に失敗: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string).ok_or_else(|| {
            GatewayError::InvalidInput("fileフィールドにファイル名がありません".to_string())
        })?;

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        tokio::pin!(reader);

        return state.gateway.put_object(&file_name, &mut reader).await;
    }

    Err(GatewayError::InvalidInput(
        "multipartに`file`フィールドがありません".to_string(),
    ))
}
