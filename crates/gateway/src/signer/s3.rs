//! # S3互換 署名付きURL発行
//!
//! rust-s3のSigV4クエリ署名（`presign_put` / `presign_get`）で署名付きURLを発行する。

use std::time::SystemTime;

use bucketgate_types::{Operation, SignedUrlGrant};

use super::{SignRequest, UrlSigner};
use crate::error::GatewayError;
use crate::storage::s3::{map_s3_error, S3Context};

/// S3互換ストレージ向けの署名器。
pub struct S3UrlSigner {
    context: S3Context,
}

impl S3UrlSigner {
    /// 接続情報から構築する。
    pub fn new(context: S3Context) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl UrlSigner for S3UrlSigner {
    /// SigV4署名の`X-Amz-Date`はrust-s3が現在時刻で付与するため、
    /// `request.issued_at`は使わず現在時刻から有効期限を計算する。
    async fn sign(&self, request: SignRequest<'_>) -> Result<SignedUrlGrant, GatewayError> {
        let request = SignRequest {
            issued_at: SystemTime::now(),
            ..request
        };
        let expires_at = request.expires_at()?;
        let bucket = self.context.bucket(request.bucket)?;

        let url = match request.operation {
            Operation::Put => bucket
                .presign_put(request.key, request.ttl_secs(), None, None)
                .await
                .map_err(map_s3_error)?,
            Operation::Get => bucket
                .presign_get(request.key, request.ttl_secs(), None)
                .await
                .map_err(map_s3_error)?,
        };

        tracing::info!(
            operation = %request.operation,
            bucket = request.bucket,
            key = request.key,
            expires_at,
            "署名付きURLを発行"
        );
        Ok(request.into_grant(url, expires_at))
    }
}
