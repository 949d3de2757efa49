//! # ストレージGateway
//!
//! オブジェクトの配置（キー命名）と署名付きURLの有効期限を決めるポリシー層。
//! オブジェクトストレージクライアントと署名器を組み合わせてHTTP境界に提供する。
//!
//! ## キー命名
//! - 直接アップロード: `uploads/{表示名}`（同名は上書き）
//! - 署名付きアップロード: `uploads/{UUID}-{表示名}`（同名でも衝突しない）
//! - ダウンロード: 渡されたキーをそのまま使用

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bucketgate_types::SignedUrlGrant;
use tokio::io::AsyncRead;

use crate::error::GatewayError;
use crate::signer::UrlSigner;
use crate::staging::StagingFile;
use crate::storage::ObjectStore;

/// Gatewayが管理するオブジェクトの名前空間
pub const UPLOAD_PREFIX: &str = "uploads/";

/// 署名付きURLの有効期間（10分）
pub const GRANT_TTL: Duration = Duration::from_secs(10 * 60);

/// ストレージGateway。
///
/// バケット・クライアント・署名器は起動時に一度だけ組み立て、以後は不変。
#[derive(Clone)]
pub struct StorageGateway {
    bucket: String,
    store: Arc<dyn ObjectStore>,
    signer: Arc<dyn UrlSigner>,
    staging_dir: PathBuf,
    grant_ttl: Duration,
}

impl StorageGateway {
    /// クライアントと署名器からGatewayを構築する。
    pub fn new(
        bucket: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        signer: Arc<dyn UrlSigner>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            store,
            signer,
            staging_dir: staging_dir.into(),
            grant_ttl: GRANT_TTL,
        }
    }

    /// 署名付きURLの有効期間を変更する。
    #[cfg(test)]
    pub fn with_grant_ttl(mut self, ttl: Duration) -> Self {
        self.grant_ttl = ttl;
        self
    }

    /// `reader`の内容を`uploads/{display_name}`に保存し、使用したキーを返す。
    ///
    /// 内容は一度ステージングファイルに書き出してからクライアントに渡す。
    /// ステージングファイルは成功・失敗を問わず削除される。
    pub async fn put_object<R>(
        &self,
        display_name: &str,
        reader: &mut R,
    ) -> Result<String, GatewayError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        validate_display_name(display_name)?;
        let key = format!("{UPLOAD_PREFIX}{display_name}");
        tracing::info!(bucket = %self.bucket, key = %key, "ファイルをアップロード");

        let staged = StagingFile::write_from(&self.staging_dir, reader).await?;
        let size = staged.size();

        // 失敗時は`staged`がドロップされ削除される
        self.store
            .put_object(&self.bucket, &key, staged.path())
            .await?;

        if let Err(e) = staged.remove() {
            tracing::warn!(key = %key, error = %e, "ステージングファイルの削除に失敗");
            return Err(e);
        }

        tracing::info!(key = %key, size, "アップロード完了");
        Ok(key)
    }

    /// 衝突しないキー`uploads/{UUID}-{display_name}`へのアップロード用署名付きURLを発行する。
    pub async fn create_upload_grant(
        &self,
        display_name: &str,
    ) -> Result<SignedUrlGrant, GatewayError> {
        validate_display_name(display_name)?;
        let key = format!("{UPLOAD_PREFIX}{}-{display_name}", uuid::Uuid::new_v4());
        tracing::info!(key = %key, "署名付きアップロードURLを生成");

        self.signer
            .sign_put(&self.bucket, &key, self.grant_ttl)
            .await
    }

    /// 渡されたキーそのままのダウンロード用署名付きURLを発行する。
    ///
    /// キーの存在は確認しない。存在しない場合は利用時にバックエンドがNotFoundを返す。
    pub async fn create_download_grant(&self, key: &str) -> Result<SignedUrlGrant, GatewayError> {
        if key.trim().is_empty() {
            return Err(GatewayError::InvalidInput(
                "ファイルキーが空です".to_string(),
            ));
        }
        tracing::info!(key = %key, "署名付きダウンロードURLを生成");

        self.signer
            .sign_get(&self.bucket, key, self.grant_ttl)
            .await
    }

    /// `uploads/`配下のキーを一覧する。
    ///
    /// バックエンドが名前空間外のキーを返しても結果には含めない。
    pub async fn list_objects(&self) -> Result<Vec<String>, GatewayError> {
        tracing::info!(bucket = %self.bucket, prefix = UPLOAD_PREFIX, "ファイル一覧を取得");

        let keys: Vec<String> = self
            .store
            .list_objects(&self.bucket, UPLOAD_PREFIX)
            .await?
            .into_iter()
            .filter(|key| key.starts_with(UPLOAD_PREFIX))
            .collect();

        tracing::info!(count = keys.len(), "'uploads/' 配下のファイル数");
        Ok(keys)
    }
}

/// 表示名を検証する。
///
/// 空白のみ、パス区切り文字、`.`/`..`、制御文字を含む名前は
/// `uploads/`の外を指したり別の階層を作ったりできるため拒否する。
pub fn validate_display_name(name: &str) -> Result<(), GatewayError> {
    if name.trim().is_empty() {
        return Err(GatewayError::InvalidInput("ファイル名が空です".to_string()));
    }
    if name == "." || name == ".." {
        return Err(GatewayError::InvalidInput(format!(
            "ファイル名として使用できません: {name}"
        )));
    }
    if name.contains(['/', '\\']) {
        return Err(GatewayError::InvalidInput(format!(
            "ファイル名にパス区切り文字は使用できません: {name}"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(GatewayError::InvalidInput(
            "ファイル名に制御文字は使用できません".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    use bucketgate_types::Operation;

    use super::*;
    use crate::signer::SignRequest;

    /// 呼び出し内容を記録するモックObjectStore。
    /// `fail_on`回目の呼び出しでBackendUnavailableを返す。
    #[derive(Default)]
    struct MockStore {
        calls: AtomicUsize,
        fail_on: Option<usize>,
        objects: Mutex<Vec<(String, String, Vec<u8>)>>,
        /// 一覧でプレフィックスを無視して返す追加キー
        foreign_keys: Vec<String>,
    }

    impl MockStore {
        fn failing_on(n: usize) -> Self {
            Self {
                fail_on: Some(n),
                ..Self::default()
            }
        }

        fn tick(&self) -> Result<(), GatewayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(n) {
                return Err(GatewayError::BackendUnavailable(format!(
                    "injected failure on call {n}"
                )));
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ObjectStore for MockStore {
        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            source: &Path,
        ) -> Result<(), GatewayError> {
            self.tick()?;
            let data = std::fs::read(source).unwrap();
            self.objects
                .lock()
                .unwrap()
                .push((bucket.to_string(), key.to_string(), data));
            Ok(())
        }

        async fn list_objects(
            &self,
            bucket: &str,
            prefix: &str,
        ) -> Result<Vec<String>, GatewayError> {
            self.tick()?;
            let mut keys: Vec<String> = self
                .objects
                .lock()
                .unwrap()
                .iter()
                .filter(|(b, k, _)| b == bucket && k.starts_with(prefix))
                .map(|(_, k, _)| k.clone())
                .collect();
            keys.extend(self.foreign_keys.iter().cloned());
            Ok(keys)
        }
    }

    /// 受け取った要求をそのままURLに埋め込むモック署名器。
    struct MockSigner;

    #[async_trait::async_trait]
    impl UrlSigner for MockSigner {
        async fn sign(&self, request: SignRequest<'_>) -> Result<SignedUrlGrant, GatewayError> {
            let expires_at = request.expires_at()?;
            let url = format!(
                "http://mock-storage/{}/{}?op={}&expires={expires_at}",
                request.bucket, request.key, request.operation
            );
            Ok(request.into_grant(url, expires_at))
        }
    }

    struct Fixture {
        gateway: StorageGateway,
        store: Arc<MockStore>,
        staging: tempfile::TempDir,
    }

    fn fixture(store: MockStore) -> Fixture {
        let staging = tempfile::tempdir().unwrap();
        let store = Arc::new(store);
        let gateway = StorageGateway::new(
            "media",
            store.clone(),
            Arc::new(MockSigner),
            staging.path(),
        );
        Fixture {
            gateway,
            store,
            staging,
        }
    }

    fn staging_entries(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    /// put_objectが`uploads/{表示名}`を返し、一覧に含まれることを確認
    #[tokio::test]
    async fn test_put_object_key_and_listing() {
        let f = fixture(MockStore::default());
        let mut body: &[u8] = b"quarterly numbers";

        let key = f.gateway.put_object("report.pdf", &mut body).await.unwrap();
        assert_eq!(key, "uploads/report.pdf");

        let stored = f.store.objects.lock().unwrap().clone();
        assert_eq!(
            stored,
            vec![(
                "media".to_string(),
                "uploads/report.pdf".to_string(),
                b"quarterly numbers".to_vec()
            )]
        );

        let keys = f.gateway.list_objects().await.unwrap();
        assert!(keys.contains(&key));
        assert_eq!(staging_entries(&f.staging), 0);
    }

    /// 同じ表示名の直接アップロードは同じキーに上書きされることを確認
    #[tokio::test]
    async fn test_put_object_same_name_same_key() {
        let f = fixture(MockStore::default());
        let mut first: &[u8] = b"v1";
        let mut second: &[u8] = b"v2";
        let a = f.gateway.put_object("notes.txt", &mut first).await.unwrap();
        let b = f.gateway.put_object("notes.txt", &mut second).await.unwrap();
        assert_eq!(a, b);
    }

    /// バックエンド失敗時もBackendUnavailableを再試行せずに返し、
    /// ステージングファイルが残らないことを確認
    #[tokio::test]
    async fn test_put_object_backend_failure_cleans_up() {
        let f = fixture(MockStore::failing_on(1));
        let mut body: &[u8] = b"lost bytes";

        let result = f.gateway.put_object("report.pdf", &mut body).await;
        assert!(matches!(result, Err(GatewayError::BackendUnavailable(_))));
        assert_eq!(f.store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(staging_entries(&f.staging), 0);

        // 2回目以降は成功する（内部で再試行していないこと）
        let mut body: &[u8] = b"second try";
        assert!(f.gateway.put_object("report.pdf", &mut body).await.is_ok());
        assert_eq!(f.store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(staging_entries(&f.staging), 0);
    }

    #[tokio::test]
    async fn test_list_backend_failure_not_retried() {
        let f = fixture(MockStore::failing_on(1));
        let result = f.gateway.list_objects().await;
        assert!(matches!(result, Err(GatewayError::BackendUnavailable(_))));
        assert_eq!(f.store.calls.load(Ordering::SeqCst), 1);
    }

    /// 不正な表示名はステージング・バックエンド呼び出しの前に拒否されることを確認
    #[tokio::test]
    async fn test_invalid_display_names_rejected_before_backend() {
        let f = fixture(MockStore::default());
        for name in ["", "   ", ".", "..", "../etc/passwd", "a/b.txt", "a\\b", "bad\nname"] {
            let mut body: &[u8] = b"x";
            let result = f.gateway.put_object(name, &mut body).await;
            assert!(
                matches!(result, Err(GatewayError::InvalidInput(_))),
                "{name:?} should be rejected"
            );
            assert!(matches!(
                f.gateway.create_upload_grant(name).await,
                Err(GatewayError::InvalidInput(_))
            ));
        }
        assert_eq!(f.store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(staging_entries(&f.staging), 0);
    }

    /// 同じ表示名に対する並行したアップロードURL発行が異なるキーを返すことを確認
    #[tokio::test]
    async fn test_upload_grants_unique_under_concurrency() {
        let f = fixture(MockStore::default());
        let gateway = Arc::new(f.gateway);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.create_upload_grant("photo.jpg").await })
            })
            .collect();

        let mut keys = HashSet::new();
        for handle in handles {
            let grant = handle.await.unwrap().unwrap();
            assert!(grant.key.starts_with(UPLOAD_PREFIX));
            assert!(grant.key.ends_with("-photo.jpg"));
            assert_eq!(grant.operation, Operation::Put);
            keys.insert(grant.key);
        }
        assert_eq!(keys.len(), 16);
    }

    /// 発行されるURLの有効期限が発行時刻+10分であることを確認
    #[tokio::test]
    async fn test_grant_expiry_is_ten_minutes() {
        let f = fixture(MockStore::default());

        let before = now_secs();
        let upload = f.gateway.create_upload_grant("photo.jpg").await.unwrap();
        let download = f
            .gateway
            .create_download_grant("uploads/photo.jpg")
            .await
            .unwrap();
        let after = now_secs();

        for grant in [&upload, &download] {
            assert!(grant.expires_at >= before + 600);
            assert!(grant.expires_at <= after + 600);
        }
    }

    #[tokio::test]
    async fn test_grant_ttl_override() {
        let f = fixture(MockStore::default());
        let gateway = f.gateway.with_grant_ttl(Duration::from_secs(30));
        let before = now_secs();
        let grant = gateway.create_download_grant("uploads/a").await.unwrap();
        assert!(grant.expires_at >= before + 30 && grant.expires_at <= now_secs() + 30);
    }

    /// ダウンロードURLはキーを加工せずに発行されることを確認
    #[tokio::test]
    async fn test_download_grant_uses_key_as_given() {
        let f = fixture(MockStore::default());

        let grant = f
            .gateway
            .create_download_grant("uploads/0f1e-report.pdf")
            .await
            .unwrap();
        assert_eq!(grant.key, "uploads/0f1e-report.pdf");
        assert_eq!(grant.bucket, "media");
        assert_eq!(grant.operation, Operation::Get);

        // 名前空間外のキーもそのまま（接頭辞は付与しない）
        let grant = f.gateway.create_download_grant("other/x.txt").await.unwrap();
        assert_eq!(grant.key, "other/x.txt");

        assert!(matches!(
            f.gateway.create_download_grant("  ").await,
            Err(GatewayError::InvalidInput(_))
        ));
    }

    /// バックエンドが名前空間外のキーを返しても一覧に含めないことを確認
    #[tokio::test]
    async fn test_listing_never_leaves_namespace() {
        let store = MockStore {
            foreign_keys: vec![
                "private/secret.txt".to_string(),
                "uploadsX/near-miss".to_string(),
                "uploads/kept.txt".to_string(),
            ],
            ..MockStore::default()
        };
        let f = fixture(store);

        let keys = f.gateway.list_objects().await.unwrap();
        assert_eq!(keys, vec!["uploads/kept.txt"]);
    }

    #[test]
    fn test_validate_display_name_accepts_ordinary_names() {
        for name in ["report.pdf", "my photo (1).jpg", "データ.csv", ".hidden", "a..b"] {
            assert!(validate_display_name(name).is_ok(), "{name:?}");
        }
    }
}
