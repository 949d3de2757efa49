//! # bucketgate 暗号処理
//!
//! ローカルストレージ用の署名付きURLを発行・検証する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | URL署名 | HMAC-SHA256 |
//!
//! ## 署名対象
//! ```text
//! METHOD \n bucket \n key \n expires
//! ```

use bucketgate_types::Operation;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    /// 鍵が空、またはHMACに使用できない
    #[error("署名鍵が不正です")]
    InvalidKey,
    /// 署名が16進数としてデコードできない
    #[error("署名の形式が不正です")]
    MalformedSignature,
    /// 署名が一致しない
    #[error("署名が一致しません")]
    SignatureMismatch,
    /// 有効期限切れ
    #[error("署名の有効期限が切れています (expires={expires_at}, now={now})")]
    Expired {
        /// 有効期限（UNIXタイムスタンプ）
        expires_at: u64,
        /// 検証時刻（UNIXタイムスタンプ）
        now: u64,
    },
}

/// 署名が許可する範囲。操作・バケット・キー・有効期限の4つ組。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantScope<'a> {
    /// 許可する操作
    pub operation: Operation,
    /// 対象バケット
    pub bucket: &'a str,
    /// 対象オブジェクトキー
    pub key: &'a str,
    /// 有効期限（UNIXタイムスタンプ）
    pub expires_at: u64,
}

impl GrantScope<'_> {
    /// 署名対象のバイト列を構築する。
    fn string_to_sign(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.operation.as_method(),
            self.bucket,
            self.key,
            self.expires_at
        )
    }
}

fn new_mac(secret: &[u8]) -> Result<HmacSha256, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::InvalidKey);
    }
    HmacSha256::new_from_slice(secret).map_err(|_| CryptoError::InvalidKey)
}

/// HMAC-SHA256を計算する。
pub fn hmac_sha256(secret: &[u8], message: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut mac = new_mac(secret)?;
    mac.update(message);
    let mut tag = [0u8; 32];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// 署名範囲に対する署名を16進数文字列で返す。
pub fn sign_grant(secret: &[u8], scope: &GrantScope<'_>) -> Result<String, CryptoError> {
    let tag = hmac_sha256(secret, scope.string_to_sign().as_bytes())?;
    Ok(hex::encode(tag))
}

/// 署名付きURLの署名と有効期限を検証する。
///
/// 署名比較は定数時間で行う。期限切れのチェックは署名検証の後に行うため、
/// 改ざんされた`expires`は`SignatureMismatch`として扱われる。
pub fn verify_grant(
    secret: &[u8],
    scope: &GrantScope<'_>,
    signature_hex: &str,
    now: u64,
) -> Result<(), CryptoError> {
    let provided = hex::decode(signature_hex).map_err(|_| CryptoError::MalformedSignature)?;

    let mut mac = new_mac(secret)?;
    mac.update(scope.string_to_sign().as_bytes());
    mac.verify_slice(&provided)
        .map_err(|_| CryptoError::SignatureMismatch)?;

    if now > scope.expires_at {
        return Err(CryptoError::Expired {
            expires_at: scope.expires_at,
            now,
        });
    }
    Ok(())
}
