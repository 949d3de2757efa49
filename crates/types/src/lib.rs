//! # bucketgate 共有型定義
//!
//! Gatewayの外部インターフェースとストレージ層で共有するデータ構造。
//!
//! ## 命名規則
//! - オブジェクトキー: バケット内のパス風文字列（例: `uploads/report.pdf`）
//! - 有効期限: UNIXタイムスタンプ（秒）

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 署名付きURL
// ---------------------------------------------------------------------------

/// 署名付きURLが許可する単一のHTTP操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// オブジェクトのアップロード（PUT）
    Put,
    /// オブジェクトのダウンロード（GET）
    Get,
}

impl Operation {
    /// 対応するHTTPメソッド名。
    pub fn as_method(self) -> &'static str {
        match self {
            Operation::Put => "PUT",
            Operation::Get => "GET",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_method())
    }
}

/// 発行済みの署名付きURL。
///
/// 一度発行したら更新も失効もできない。
/// 有効期限はバックエンド側の署名検証でのみ強制される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrlGrant {
    /// 署名付きURL
    pub url: String,
    /// 許可された操作
    pub operation: Operation,
    /// 対象バケット
    pub bucket: String,
    /// 対象オブジェクトキー
    pub key: String,
    /// URL有効期限（UNIXタイムスタンプ）
    pub expires_at: u64,
}

// ---------------------------------------------------------------------------
// HTTPクエリ
// ---------------------------------------------------------------------------

/// GET /s3/presigned/upload-url のクエリ。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlQuery {
    /// クライアントが指定する表示名
    pub file_name: String,
}

/// GET /s3/presigned/download-url のクエリ。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlQuery {
    /// バケット内の完全なオブジェクトキー
    pub file_key: String,
}

/// ローカルストレージの署名付きURLに付与されるクエリ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalGrantQuery {
    /// オブジェクトキー
    pub key: String,
    /// 有効期限（UNIXタイムスタンプ）
    pub expires: u64,
    /// 16進数エンコードされたHMAC署名
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_serializes_as_http_method() {
        assert_eq!(serde_json::to_string(&Operation::Put).unwrap(), "\"PUT\"");
        assert_eq!(serde_json::to_string(&Operation::Get).unwrap(), "\"GET\"");
        assert_eq!(Operation::Put.to_string(), "PUT");
    }

    /// HTTPクエリのフィールド名が外部インターフェースと一致することを確認
    #[test]
    fn test_query_field_names() {
        let q: UploadUrlQuery = serde_json::from_str(r#"{"fileName":"a.txt"}"#).unwrap();
        assert_eq!(q.file_name, "a.txt");

        let q: DownloadUrlQuery =
            serde_json::from_str(r#"{"fileKey":"uploads/a.txt"}"#).unwrap();
        assert_eq!(q.file_key, "uploads/a.txt");
    }
}
