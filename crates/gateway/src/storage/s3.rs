//! # S3互換 オブジェクトストレージ実装
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIを使用する実装。
//! 署名付きURLの発行（`crate::signer::s3`）と同じ`S3Context`を共有する。

use std::path::Path;

use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::ObjectStore;
use crate::config::S3Settings;
use crate::error::GatewayError;

/// S3互換バックエンドへの接続情報（リージョン・認証情報）。
///
/// 起動時に一度だけ構築し、以後は読み取り専用で共有する。
#[derive(Clone)]
pub struct S3Context {
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3Context {
    /// 設定から構築する。認証情報やリージョンが不正な場合は設定エラー。
    pub fn new(settings: &S3Settings) -> Result<Self, GatewayError> {
        let region = match &settings.endpoint {
            Some(endpoint) => Region::Custom {
                region: settings.region.clone(),
                endpoint: endpoint.trim_end_matches('/').to_string(),
            },
            None => settings.region.parse::<Region>().map_err(|e| {
                GatewayError::Configuration(format!(
                    "リージョンが不正です ({}): {e}",
                    settings.region
                ))
            })?,
        };

        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| GatewayError::Configuration(format!("S3認証情報が不正です: {e}")))?;

        tracing::info!(
            region = %settings.region,
            endpoint = ?settings.endpoint,
            path_style = settings.path_style,
            "S3互換バックエンドを設定"
        );

        Ok(Self {
            region,
            credentials,
            path_style: settings.path_style,
        })
    }

    /// 指定バケットのハンドルを開く。
    pub(crate) fn bucket(&self, name: &str) -> Result<Box<Bucket>, GatewayError> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| GatewayError::Configuration(format!("バケットを開けません ({name}): {e}")))?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

/// rust-s3のエラーをGatewayエラーに変換する。
pub(crate) fn map_s3_error(e: S3Error) -> GatewayError {
    match e {
        S3Error::HttpFailWithBody(status, body) => GatewayError::from_backend_status(status, body),
        other => GatewayError::BackendUnavailable(other.to_string()),
    }
}

/// S3互換ストレージによるObjectStore実装。
pub struct S3ObjectStore {
    context: S3Context,
}

impl S3ObjectStore {
    /// 接続情報から構築する。
    pub fn new(context: S3Context) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
    ) -> Result<(), GatewayError> {
        let bucket_handle = self.context.bucket(bucket)?;

        let mut file = tokio::fs::File::open(source).await.map_err(|e| {
            GatewayError::LocalResource(format!(
                "ステージングファイルを開けません ({}): {e}",
                source.display()
            ))
        })?;
        let size = file
            .metadata()
            .await
            .map_err(|e| {
                GatewayError::LocalResource(format!("ステージングファイルのサイズ取得に失敗: {e}"))
            })?
            .len();

        // 非2xxは`fail-on-err`によりHttpFailWithBody(ステータス, 本文)として返る
        bucket_handle
            .put_object_stream(&mut file, key)
            .await
            .map_err(map_s3_error)?;

        tracing::info!(bucket, key, size, "S3へのアップロード完了");
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, GatewayError> {
        let bucket_handle = self.context.bucket(bucket)?;

        // 継続トークンを辿り、プレフィックス配下の全ページを取得する
        let pages = bucket_handle
            .list(prefix.to_string(), None)
            .await
            .map_err(map_s3_error)?;

        let keys: Vec<String> = pages
            .into_iter()
            .flat_map(|page| page.contents.into_iter().map(|object| object.key))
            .collect();

        tracing::info!(bucket, prefix, count = keys.len(), "S3オブジェクト一覧を取得");
        Ok(keys)
    }
}
