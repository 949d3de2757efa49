//! # ステージングファイル
//!
//! アップロードされたバイト列をストレージへ渡す前に一時ファイルへ書き出す。
//! ファイルはスコープを抜けると必ず削除される（成功・失敗を問わない）。

use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::GatewayError;

/// ステージングファイル名のプレフィックス
const STAGING_PREFIX: &str = "upload-";

/// アップロード1件分の一時ファイル。
///
/// `Drop`で削除される。正常終了時は[`StagingFile::remove`]で明示的に削除し、
/// 削除失敗をエラーとして扱う。
#[derive(Debug)]
pub struct StagingFile {
    file: tempfile::NamedTempFile,
    len: u64,
}

impl StagingFile {
    /// `dir`内に一時ファイルを作成し、`reader`の内容をすべて書き込む。
    ///
    /// 書き込み途中で失敗した場合も、作成済みのファイルは削除される。
    pub async fn write_from<R>(dir: &Path, reader: &mut R) -> Result<Self, GatewayError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| {
                GatewayError::LocalResource(format!(
                    "ステージングファイルの作成に失敗 ({}): {e}",
                    dir.display()
                ))
            })?;

        let handle = file.reopen().map_err(|e| {
            GatewayError::LocalResource(format!("ステージングファイルを開けません: {e}"))
        })?;
        let mut writer = tokio::fs::File::from_std(handle);

        // ここで失敗した場合は`file`がドロップされ削除される
        let len = tokio::io::copy(reader, &mut writer).await.map_err(|e| {
            GatewayError::LocalResource(format!("ステージングファイルへの書き込みに失敗: {e}"))
        })?;
        writer.flush().await.map_err(|e| {
            GatewayError::LocalResource(format!("ステージングファイルのフラッシュに失敗: {e}"))
        })?;

        tracing::debug!(path = %file.path().display(), len, "ステージングファイルを作成");
        Ok(Self { file, len })
    }

    /// ファイルのパス。
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// 書き込んだバイト数。
    pub fn size(&self) -> u64 {
        self.len
    }

    /// ファイルを削除する。
    pub fn remove(self) -> Result<(), GatewayError> {
        let path: PathBuf = self.file.path().to_path_buf();
        self.file.close().map_err(|e| {
            GatewayError::LocalResource(format!(
                "ステージングファイルの削除に失敗 ({}): {e}",
                path.display()
            ))
        })
    }
}
