//! 安全随机数生成模块
//!
//! 生成适合嵌入魔法链接的登录 token。存储本身从不生成 token，
//! 由调用方生成后交给 [`TokenStore::issue`](crate::TokenStore::issue)。

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::error::{CryptoError, Error, Result};

/// 登录 token 的默认字节数（256 位）
pub const LOGIN_TOKEN_BYTES: usize = 32;

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的密码学安全随机数生成器 (CSPRNG)
///
/// # Example
///
/// ```rust
/// use passwordless_store::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(32).unwrap();
/// assert_eq!(bytes.len(), 32);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))?;
    Ok(bytes)
}

/// 生成指定长度的 Base64 URL 安全随机字符串（不含填充）
///
/// # Example
///
/// ```rust
/// use passwordless_store::random::generate_random_base64_url;
///
/// let token = generate_random_base64_url(32).unwrap();
/// assert!(!token.contains('+'));
/// assert!(!token.contains('/'));
/// ```
pub fn generate_random_base64_url(byte_length: usize) -> Result<String> {
    let bytes = generate_random_bytes(byte_length)?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// 生成登录 token
///
/// 32 字节随机数据的 Base64 URL 编码，可以直接放进链接的查询参数。
///
/// # Example
///
/// ```rust
/// use passwordless_store::random::generate_login_token;
///
/// let token = generate_login_token().unwrap();
/// let link = format!("https://example.com/auth?token={}&uid=alice", token);
/// ```
pub fn generate_login_token() -> Result<String> {
    generate_random_base64_url(LOGIN_TOKEN_BYTES)
}
