//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定は起動時に一度だけ読み込み、以後は変更しない。

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::gateway::StorageGateway;

/// リクエストボディ上限のデフォルト（512MiB）
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 512 * 1024 * 1024;

/// デフォルトの待ち受けアドレス
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// ローカルバックエンドの署名付きURLのデフォルト公開URL
pub const DEFAULT_LOCAL_PUBLIC_URL: &str = "http://localhost:3000";

/// S3互換バックエンドの接続情報。
#[derive(Clone)]
pub struct S3Settings {
    /// リージョン識別子（例: "ap-northeast-1"）
    pub region: String,
    /// カスタムエンドポイント（MinIO, Cloudflare R2等）。Noneの場合はAWS S3。
    pub endpoint: Option<String>,
    /// アクセスキーID
    pub access_key: String,
    /// シークレットアクセスキー
    pub secret_key: String,
    /// パススタイルでアクセスするか
    pub path_style: bool,
}

impl std::fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Settings")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("path_style", &self.path_style)
            .finish()
    }
}

/// ローカルバックエンドの設定（開発・テスト用）。
#[derive(Clone)]
pub struct LocalSettings {
    /// 署名付きURLのベースURL（クライアントから到達可能なGatewayのURL）
    pub public_url: String,
    /// HMAC署名鍵
    pub signing_secret: Vec<u8>,
}

impl std::fmt::Debug for LocalSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSettings")
            .field("public_url", &self.public_url)
            .field("signing_secret", &"<redacted>")
            .finish()
    }
}

/// 使用するストレージバックエンド。
#[derive(Debug, Clone)]
pub enum BackendSettings {
    /// S3互換ストレージ
    S3(S3Settings),
    /// プロセス内ストレージ
    Local(LocalSettings),
}

/// Gateway設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// バケット名
    pub bucket: String,
    /// ストレージバックエンド
    pub backend: BackendSettings,
    /// 待ち受けアドレス
    pub bind_addr: SocketAddr,
    /// アップロード最大サイズ（バイト）
    pub max_upload_size: usize,
    /// ステージングファイルを作成するディレクトリ
    pub staging_dir: PathBuf,
}

impl GatewayConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の変数ルックアップから構築する。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| {
                GatewayError::Configuration(format!("環境変数 {name} が設定されていません"))
            })
        };

        let bucket = required("S3_BUCKET")?;

        let backend = match var("STORAGE_BACKEND").as_deref().unwrap_or("s3") {
            "s3" => BackendSettings::S3(S3Settings {
                region: required("S3_REGION")?,
                endpoint: var("S3_ENDPOINT"),
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
                path_style: parse_bool("S3_PATH_STYLE", var("S3_PATH_STYLE"))?,
            }),
            "local" => {
                let signing_secret = match var("LOCAL_SIGNING_SECRET") {
                    Some(secret_hex) => {
                        let secret = hex::decode(secret_hex.trim()).map_err(|e| {
                            GatewayError::Configuration(format!(
                                "LOCAL_SIGNING_SECRETは16進数である必要があります: {e}"
                            ))
                        })?;
                        if secret.len() < 16 {
                            return Err(GatewayError::Configuration(
                                "LOCAL_SIGNING_SECRETは16バイト以上である必要があります".to_string(),
                            ));
                        }
                        secret
                    }
                    None => {
                        // 開発環境用: ランダム鍵を生成
                        tracing::warn!(
                            "LOCAL_SIGNING_SECRETが未設定です。ランダム鍵を生成します（開発環境用）"
                        );
                        use rand::RngCore;
                        let mut secret = vec![0u8; 32];
                        rand::rngs::OsRng.fill_bytes(&mut secret);
                        secret
                    }
                };
                BackendSettings::Local(LocalSettings {
                    public_url: var("LOCAL_PUBLIC_URL")
                        .unwrap_or_else(|| DEFAULT_LOCAL_PUBLIC_URL.to_string())
                        .trim_end_matches('/')
                        .to_string(),
                    signing_secret,
                })
            }
            other => {
                return Err(GatewayError::Configuration(format!(
                    "STORAGE_BACKENDは 's3' または 'local' である必要があります: {other}"
                )))
            }
        };

        let bind_addr = var("GATEWAY_BIND")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| GatewayError::Configuration(format!("GATEWAY_BINDが不正です: {e}")))?;

        let max_upload_size = match var("MAX_UPLOAD_SIZE") {
            Some(v) => v.trim().parse().map_err(|e| {
                GatewayError::Configuration(format!("MAX_UPLOAD_SIZEが不正です: {e}"))
            })?,
            None => DEFAULT_MAX_UPLOAD_SIZE,
        };

        let staging_dir = var("STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            bucket,
            backend,
            bind_addr,
            max_upload_size,
            staging_dir,
        })
    }
}

fn parse_bool(name: &str, value: Option<String>) -> Result<bool, GatewayError> {
    match value.as_deref().map(str::trim) {
        None => Ok(false),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(GatewayError::Configuration(format!(
            "{name}は true/false である必要があります: {other}"
        ))),
    }
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// ストレージGateway（キー命名・有効期限ポリシー）
    pub gateway: StorageGateway,
    /// ローカルバックエンド（署名付きURLの受け口）。S3利用時はNone。
    #[cfg(feature = "vendor-local")]
    pub local: Option<crate::storage::local::LocalBackend>,
}

/// 共有状態のハンドル
pub type SharedState = Arc<GatewayState>;
