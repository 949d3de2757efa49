//! # Gateway エラー型
//!
//! ストレージ層からHTTP境界まで共通で使うエラー型。
//! バックエンドのHTTPステータスはここで分類する。

use axum::http::StatusCode;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 設定が欠落・不正（起動時に致命的）
    #[error("設定エラー: {0}")]
    Configuration(String),
    /// バックエンドに到達できない、または5xxを返した
    #[error("ストレージバックエンドが利用できません: {0}")]
    BackendUnavailable(String),
    /// バックエンドがリクエストを拒否した（403等）
    #[error("ストレージバックエンドがエラーを返しました: HTTP {status} - {message}")]
    Backend {
        /// バックエンドのHTTPステータス
        status: u16,
        /// バックエンドのエラーメッセージ
        message: String,
    },
    /// オブジェクトまたはバケットが存在しない
    #[error("オブジェクトが見つかりません: {0}")]
    NotFound(String),
    /// 不正な入力（空の表示名・キー等）
    #[error("不正なリクエスト: {0}")]
    InvalidInput(String),
    /// ステージングファイルの作成・書き込み・削除に失敗
    #[error("ローカルリソースの操作に失敗: {0}")]
    LocalResource(String),
    /// 署名付きURLの検証に失敗
    #[error("署名付きURLが無効です: {0}")]
    Forbidden(String),
}

impl GatewayError {
    /// バックエンドが返した非2xxステータスを分類する。
    pub fn from_backend_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => GatewayError::NotFound(message),
            500..=599 => GatewayError::BackendUnavailable(format!("HTTP {status} - {message}")),
            _ => GatewayError::Backend { status, message },
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BackendUnavailable(_) | GatewayError::Backend { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::LocalResource(_) | GatewayError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
