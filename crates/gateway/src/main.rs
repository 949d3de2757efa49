//! # bucketgate Gateway
//!
//! S3互換オブジェクトストレージの前段に置くHTTP Gateway。
//!
//! ## 役割
//! - 直接アップロード（multipartを`uploads/{ファイル名}`へ保存）
//! - 署名付きURL発行（アップロード・ダウンロード、有効期限10分）
//! - `uploads/`配下のキー一覧
//!
//! ## バックエンド
//! - `STORAGE_BACKEND=s3`: S3互換API（AWS S3, MinIO, Cloudflare R2等）
//! - `STORAGE_BACKEND=local`: プロセス内メモリ（開発・テスト用）

mod config;
mod endpoints;
mod error;
mod gateway;
mod signer;
mod staging;
mod storage;

use std::sync::Arc;

use config::{BackendSettings, GatewayConfig, GatewayState};
use error::GatewayError;
use gateway::StorageGateway;

/// 設定からバックエンド・署名器を組み立て、共有状態を構築する。
fn build_state(config: &GatewayConfig) -> Result<GatewayState, GatewayError> {
    match &config.backend {
        #[cfg(feature = "vendor-aws")]
        BackendSettings::S3(settings) => {
            let context = storage::S3Context::new(settings)?;
            let gateway = StorageGateway::new(
                config.bucket.clone(),
                Arc::new(storage::S3ObjectStore::new(context.clone())),
                Arc::new(signer::S3UrlSigner::new(context)),
                config.staging_dir.clone(),
            );
            Ok(GatewayState {
                gateway,
                #[cfg(feature = "vendor-local")]
                local: None,
            })
        }
        #[cfg(feature = "vendor-local")]
        BackendSettings::Local(settings) => {
            let local = storage::local::LocalBackend::new(settings);
            let gateway = StorageGateway::new(
                config.bucket.clone(),
                local.store.clone(),
                Arc::new(local.signer()),
                config.staging_dir.clone(),
            );
            Ok(GatewayState {
                gateway,
                local: Some(local),
            })
        }
        #[allow(unreachable_patterns)]
        other => Err(GatewayError::Configuration(format!(
            "このビルドでは無効なバックエンドです: {other:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        bucket = %config.bucket,
        staging_dir = %config.staging_dir.display(),
        max_upload_size = config.max_upload_size,
        "設定を読み込みました"
    );

    let state = Arc::new(build_state(&config)?);
    let app = endpoints::router(state, config.max_upload_size);

    tracing::info!("Gatewayを {} で起動します", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
