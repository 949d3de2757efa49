//! # ローカル オブジェクトストレージ実装
//!
//! S3を用意できない開発環境とテストのための、プロセス内メモリのバックエンド。
//! 署名付きURLはGateway自身の`/local-storage/{bucket}`で受け付ける。

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bucketgate_crypto::{verify_grant, CryptoError, GrantScope};
use bucketgate_types::{LocalGrantQuery, Operation};
use tokio::sync::RwLock;

use super::ObjectStore;
use crate::config::LocalSettings;
use crate::error::GatewayError;
use crate::signer::LocalUrlSigner;

/// プロセス内メモリによるObjectStore実装。
///
/// `(bucket, key)`の辞書順で保持するため、一覧はS3と同じ辞書順になる。
#[derive(Default)]
pub struct LocalObjectStore {
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
}

impl LocalObjectStore {
    /// 空のストアを作成する。
    pub fn new() -> Self {
        Self::default()
    }

    /// オブジェクトを保存する（既存オブジェクトは上書き）。
    pub async fn insert_object(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), data);
    }

    /// オブジェクトを取得する。
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, GatewayError> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("{bucket}/{key}")))
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
    ) -> Result<(), GatewayError> {
        let content = tokio::fs::read(source).await.map_err(|e| {
            GatewayError::LocalResource(format!(
                "ステージングファイルの読み込みに失敗 ({}): {e}",
                source.display()
            ))
        })?;
        let size = content.len();
        self.insert_object(bucket, key, content).await;
        tracing::info!(bucket, key, size, "ローカルストレージへ保存");
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, GatewayError> {
        let objects = self.objects.read().await;
        let start = (bucket.to_string(), prefix.to_string());
        let keys = objects
            .range(start..)
            .take_while(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), _)| k.clone())
            .collect();
        Ok(keys)
    }
}

/// ローカルバックエンド一式。ストアと署名鍵を束ねる。
#[derive(Clone)]
pub struct LocalBackend {
    /// オブジェクトストア
    pub store: Arc<LocalObjectStore>,
    /// HMAC署名鍵
    secret: Arc<[u8]>,
    /// 署名付きURLのベースURL
    public_url: String,
}

impl LocalBackend {
    /// 設定から構築する。
    pub fn new(settings: &LocalSettings) -> Self {
        tracing::info!(public_url = %settings.public_url, "ローカルストレージバックエンドを設定");
        Self {
            store: Arc::new(LocalObjectStore::new()),
            secret: Arc::from(settings.signing_secret.as_slice()),
            public_url: settings.public_url.clone(),
        }
    }

    /// このバックエンド宛ての署名付きURLを発行する署名器。
    pub fn signer(&self) -> LocalUrlSigner {
        LocalUrlSigner::new(self.secret.clone(), self.public_url.clone())
    }

    /// 署名付きURLのクエリを検証する。
    ///
    /// `operation`は実際のリクエストメソッドから決まるため、
    /// GET用のURLでPUTすることはできない。
    pub fn verify(
        &self,
        operation: Operation,
        bucket: &str,
        query: &LocalGrantQuery,
        now: u64,
    ) -> Result<(), GatewayError> {
        let scope = GrantScope {
            operation,
            bucket,
            key: &query.key,
            expires_at: query.expires,
        };
        verify_grant(&self.secret, &scope, &query.signature, now).map_err(|e| match e {
            CryptoError::InvalidKey => GatewayError::Configuration(e.to_string()),
            other => GatewayError::Forbidden(other.to_string()),
        })
    }
}
