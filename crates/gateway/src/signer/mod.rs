//! # 署名付きURL発行
//!
//! 1つの`(bucket, key)`に対する1つのHTTP操作（PUT/GET）だけを、
//! 有効期限付きで認証情報なしに許可するURLを発行する。
//!
//! 署名は`(operation, bucket, key, ttl, 認証情報, 発行時刻)`の純粋関数で、
//! ネットワークI/Oを伴わない。存在しないキーへのGET URLも発行でき、
//! NotFoundは利用時にバックエンドが返す。

#[cfg(feature = "vendor-local")]
pub mod local;
#[cfg(feature = "vendor-aws")]
pub mod s3;

#[cfg(feature = "vendor-local")]
pub use local::LocalUrlSigner;
#[cfg(feature = "vendor-aws")]
pub use s3::S3UrlSigner;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bucketgate_types::{Operation, SignedUrlGrant};

use crate::error::GatewayError;

/// 署名付きURLの最大有効期限（S3 SigV4の上限、7日）
pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// 署名要求。
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    /// 許可する操作
    pub operation: Operation,
    /// 対象バケット
    pub bucket: &'a str,
    /// 対象オブジェクトキー（接頭辞の付与は呼び出し側の責務）
    pub key: &'a str,
    /// 有効期間
    pub ttl: Duration,
    /// 発行時刻（S3署名器はrust-s3に合わせて現在時刻で置き換える）
    pub issued_at: SystemTime,
}

impl SignRequest<'_> {
    /// 署名前の入力検証を行い、有効期限（UNIXタイムスタンプ）を返す。
    pub fn expires_at(&self) -> Result<u64, GatewayError> {
        if self.bucket.trim().is_empty() {
            return Err(GatewayError::InvalidInput(
                "バケット名が空です".to_string(),
            ));
        }
        if self.key.trim().is_empty() {
            return Err(GatewayError::InvalidInput(
                "オブジェクトキーが空です".to_string(),
            ));
        }
        if self.ttl.is_zero() || self.ttl > MAX_TTL {
            return Err(GatewayError::InvalidInput(format!(
                "有効期限は1秒以上{}秒以下である必要があります: {}秒",
                MAX_TTL.as_secs(),
                self.ttl.as_secs()
            )));
        }
        Ok(unix_secs(self.issued_at)? + self.ttl.as_secs())
    }

    /// 有効期間（秒）。
    pub fn ttl_secs(&self) -> u32 {
        // MAX_TTLで上限を検証済み
        u32::try_from(self.ttl.as_secs()).unwrap_or(u32::MAX)
    }

    /// 署名済みURLから発行結果を組み立てる。
    pub fn into_grant(self, url: String, expires_at: u64) -> SignedUrlGrant {
        SignedUrlGrant {
            url,
            operation: self.operation,
            bucket: self.bucket.to_string(),
            key: self.key.to_string(),
            expires_at,
        }
    }
}

/// 時刻をUNIXタイムスタンプ（秒）に変換する。
pub fn unix_secs(time: SystemTime) -> Result<u64, GatewayError> {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| GatewayError::Configuration(format!("時刻取得失敗: {e}")))
}

/// 署名付きURL発行の抽象インターフェース。
#[async_trait::async_trait]
pub trait UrlSigner: Send + Sync {
    /// 署名付きURLを発行する。
    async fn sign(&self, request: SignRequest<'_>) -> Result<SignedUrlGrant, GatewayError>;

    /// アップロード（PUT）用の署名付きURLを発行する。
    async fn sign_put(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<SignedUrlGrant, GatewayError> {
        self.sign(SignRequest {
            operation: Operation::Put,
            bucket,
            key,
            ttl,
            issued_at: SystemTime::now(),
        })
        .await
    }

    /// ダウンロード（GET）用の署名付きURLを発行する。キーはそのまま使用する。
    async fn sign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<SignedUrlGrant, GatewayError> {
        self.sign(SignRequest {
            operation: Operation::Get,
            bucket,
            key,
            ttl,
            issued_at: SystemTime::now(),
        })
        .await
    }
}
