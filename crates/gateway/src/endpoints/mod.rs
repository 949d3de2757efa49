//! # Gatewayエンドポイント
//!
//! - `POST /s3/upload` : multipart（`file`フィールド）の直接アップロード
//! - `GET /s3/presigned/upload-url?fileName=...` : アップロード用署名付きURL
//! - `GET /s3/presigned/download-url?fileKey=...` : ダウンロード用署名付きURL
//! - `GET /s3/files` : `uploads/`配下のキー一覧
//! - `GET /s3/demo` : 疎通確認
//! - `PUT|GET /local-storage/{bucket}` : ローカルバックエンドの署名付きURLの受け口

pub mod demo;
pub mod download_url;
pub mod files;
#[cfg(feature = "vendor-local")]
pub mod local_storage;
pub mod upload;
pub mod upload_url;

pub use demo::handle_demo;
pub use download_url::handle_download_url;
pub use files::handle_list_files;
#[cfg(feature = "vendor-local")]
pub use local_storage::{handle_local_get, handle_local_put};
pub use upload::handle_upload;
pub use upload_url::handle_upload_url;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::config::SharedState;

/// ルーターを構築する。リクエストボディは`max_upload_size`バイトまで受け付ける。
pub fn router(state: SharedState, max_upload_size: usize) -> Router {
    let app = Router::new()
        .route("/s3/upload", post(handle_upload))
        .route("/s3/presigned/upload-url", get(handle_upload_url))
        .route("/s3/presigned/download-url", get(handle_download_url))
        .route("/s3/files", get(handle_list_files))
        .route("/s3/demo", get(handle_demo));

    #[cfg(feature = "vendor-local")]
    let app = app.route(
        "/local-storage/{bucket}",
        get(handle_local_get).put(handle_local_put),
    );

    app.layer(DefaultBodyLimit::max(max_upload_size))
        .with_state(state)
}
