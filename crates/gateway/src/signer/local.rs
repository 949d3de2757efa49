//! # ローカル 署名付きURL発行
//!
//! HMAC-SHA256で署名したURLを発行する。URLはGatewayの
//! `/local-storage/{bucket}`を指し、`LocalBackend::verify`で検証される。

use std::sync::Arc;

use bucketgate_crypto::{sign_grant, GrantScope};
use bucketgate_types::SignedUrlGrant;

use super::{SignRequest, UrlSigner};
use crate::error::GatewayError;

/// ローカルバックエンド向けの署名器。
pub struct LocalUrlSigner {
    secret: Arc<[u8]>,
    public_url: String,
}

impl LocalUrlSigner {
    /// 署名鍵とベースURLから構築する。
    pub fn new(secret: Arc<[u8]>, public_url: String) -> Self {
        Self { secret, public_url }
    }
}

#[async_trait::async_trait]
impl UrlSigner for LocalUrlSigner {
    async fn sign(&self, request: SignRequest<'_>) -> Result<SignedUrlGrant, GatewayError> {
        let expires_at = request.expires_at()?;

        let scope = GrantScope {
            operation: request.operation,
            bucket: request.bucket,
            key: request.key,
            expires_at,
        };
        let signature = sign_grant(&self.secret, &scope)
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        let base = format!("{}/local-storage/{}", self.public_url, request.bucket);
        let expires = expires_at.to_string();
        let url = reqwest::Url::parse_with_params(
            &base,
            &[
                ("key", request.key),
                ("expires", expires.as_str()),
                ("signature", signature.as_str()),
            ],
        )
        .map_err(|e| GatewayError::Configuration(format!("署名付きURLの構築に失敗 ({base}): {e}")))?;

        tracing::info!(
            operation = %request.operation,
            bucket = request.bucket,
            key = request.key,
            expires_at,
            "ローカル署名付きURLを発行"
        );
        Ok(request.into_grant(url.to_string(), expires_at))
    }
}
