//! # オブジェクトストレージクライアント
//!
//! バケットとキーを受け取り、バックエンドへ保存・一覧を直接発行する薄いラッパー。
//! 失敗はバックエンドのステータスとメッセージ付きで返し、内部では再試行しない。
//!
//! ## 実装
//! - `S3ObjectStore`: S3互換API（AWS S3, MinIO, Cloudflare R2等）。`s3` サブモジュール。
//! - `LocalObjectStore`: プロセス内メモリ（開発・テスト用）。`local` サブモジュール。

#[cfg(feature = "vendor-local")]
pub mod local;
#[cfg(feature = "vendor-aws")]
pub mod s3;

#[cfg(feature = "vendor-aws")]
pub use s3::{S3Context, S3ObjectStore};

use std::path::Path;

use crate::error::GatewayError;

/// オブジェクトストレージの抽象インターフェース。
///
/// バケットは呼び出しごとに明示的に渡す。実装は不変の認証情報のみを保持し、
/// 並行呼び出しの間で可変状態を共有しない。
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// `source`のファイル内容を`bucket`の`key`に保存する（既存オブジェクトは上書き）。
    ///
    /// 完全に成功するか失敗するかのどちらかで、部分的な書き込みは残らない。
    async fn put_object(&self, bucket: &str, key: &str, source: &Path)
        -> Result<(), GatewayError>;

    /// `bucket`内で`prefix`から始まるキーをバックエンドの順序で列挙する。
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, GatewayError>;
}
