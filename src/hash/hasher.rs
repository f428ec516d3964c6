//! Token 哈希实现
//!
//! bcrypt / Argon2id 都是 CPU 密集型计算，异步接口会把计算放到
//! `spawn_blocking` 线程上执行，避免阻塞运行时。

#[cfg(feature = "argon2")]
use argon2::Argon2;

#[cfg(feature = "argon2")]
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};

use async_trait::async_trait;

use super::SecureHasher;
use crate::TRACING_TARGET_HASH;
use crate::error::{HashError, Result};

/// bcrypt 默认 cost
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// 支持的哈希算法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// bcrypt - 默认算法
    #[cfg(feature = "bcrypt")]
    Bcrypt,

    /// Argon2id - 内存硬算法，抵抗 GPU 攻击
    #[cfg(feature = "argon2")]
    Argon2id,
}

// 编译时检查：至少需要启用一个哈希算法
#[cfg(not(any(feature = "argon2", feature = "bcrypt")))]
compile_error!(
    "At least one token hashing algorithm (bcrypt or argon2) must be enabled. Enable one of the hashing features."
);

#[allow(clippy::derivable_impls)]
impl Default for Algorithm {
    fn default() -> Self {
        #[cfg(feature = "bcrypt")]
        {
            Algorithm::Bcrypt
        }
        #[cfg(all(not(feature = "bcrypt"), feature = "argon2"))]
        {
            Algorithm::Argon2id
        }
    }
}

/// Token 哈希器
#[derive(Debug, Clone)]
pub struct TokenHasher {
    /// 使用的哈希算法
    algorithm: Algorithm,

    /// bcrypt 的 cost 参数 (4-31, 默认 10)
    #[cfg(feature = "bcrypt")]
    bcrypt_cost: u32,
}

impl Default for TokenHasher {
    fn default() -> Self {
        Self::new(Algorithm::default())
    }
}

impl TokenHasher {
    /// 创建新的哈希器
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            #[cfg(feature = "bcrypt")]
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// 设置 bcrypt 的 cost 参数
    ///
    /// # Panics
    ///
    /// 如果 cost 不在 4-31 范围内会 panic
    #[cfg(feature = "bcrypt")]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        assert!(
            (4..=31).contains(&cost),
            "bcrypt cost must be between 4 and 31"
        );
        self.bcrypt_cost = cost;
        self
    }

    /// 当前使用的算法
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// 在当前线程上同步计算哈希
    pub fn hash_blocking(&self, plaintext: &str) -> Result<String> {
        match self.algorithm {
            #[cfg(feature = "bcrypt")]
            Algorithm::Bcrypt => self.hash_bcrypt(plaintext),
            #[cfg(feature = "argon2")]
            Algorithm::Argon2id => self.hash_argon2(plaintext),
        }
    }

    /// 在当前线程上同步验证
    ///
    /// 根据哈希前缀自动检测算法，与当前配置的算法无关。
    pub fn verify_blocking(&self, plaintext: &str, hashed: &str) -> Result<bool> {
        #[cfg(feature = "argon2")]
        if hashed.starts_with("$argon2") {
            return self.verify_argon2(plaintext, hashed);
        }
        #[cfg(feature = "bcrypt")]
        if hashed.starts_with("$2") {
            return self.verify_bcrypt(plaintext, hashed);
        }
        Err(HashError::InvalidFormat("unknown hash format".to_string()).into())
    }

    /// 检查哈希是否需要按当前配置重新生成
    pub fn needs_rehash(&self, hashed: &str) -> bool {
        match self.algorithm {
            #[cfg(feature = "bcrypt")]
            Algorithm::Bcrypt => {
                if !hashed.starts_with("$2") {
                    return true;
                }
                if let Some(cost_str) = hashed.get(4..6)
                    && let Ok(cost) = cost_str.parse::<u32>()
                {
                    return cost < self.bcrypt_cost;
                }
                true
            }
            #[cfg(feature = "argon2")]
            Algorithm::Argon2id => !hashed.starts_with("$argon2id"),
        }
    }

    // ========================================================================
    // bcrypt 实现
    // ========================================================================

    // bcrypt 只处理前 72 字节（含结尾 NUL）。截断后前缀相同的 token 会互相通过验证，
    // 所以这里使用不截断的版本：过长的 token 无法哈希，也不会与任何哈希匹配。

    #[cfg(feature = "bcrypt")]
    fn hash_bcrypt(&self, plaintext: &str) -> Result<String> {
        bcrypt::non_truncating_hash(plaintext, self.bcrypt_cost)
            .map_err(|e| HashError::HashFailed(format!("bcrypt hash failed: {}", e)).into())
    }

    #[cfg(feature = "bcrypt")]
    fn verify_bcrypt(&self, plaintext: &str, hashed: &str) -> Result<bool> {
        match bcrypt::non_truncating_verify(plaintext, hashed) {
            Ok(valid) => Ok(valid),
            Err(bcrypt::BcryptError::Truncation(_)) => Ok(false),
            Err(e) => {
                Err(HashError::InvalidFormat(format!("bcrypt verify failed: {}", e)).into())
            }
        }
    }

    // ========================================================================
    // Argon2 实现
    // ========================================================================

    #[cfg(feature = "argon2")]
    fn hash_argon2(&self, plaintext: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::fill(&mut salt_bytes).map_err(|e| {
            HashError::HashFailed(format!("Failed to generate random salt: {}", e))
        })?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| HashError::HashFailed(format!("Failed to encode salt: {}", e)))?;

        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| HashError::HashFailed(format!("Argon2 hash failed: {}", e)).into())
    }

    #[cfg(feature = "argon2")]
    fn verify_argon2(&self, plaintext: &str, hashed: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hashed)
            .map_err(|e| HashError::InvalidFormat(format!("invalid Argon2 hash: {}", e)))?;

        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::VerifyFailed(format!("Argon2 verify failed: {}", e)).into()),
        }
    }
}

#[async_trait]
impl SecureHasher for TokenHasher {
    async fn hash(&self, plaintext: &str) -> Result<String> {
        let hasher = self.clone();
        let plaintext = plaintext.to_string();

        let hashed = tokio::task::spawn_blocking(move || hasher.hash_blocking(&plaintext))
            .await?
            .inspect_err(|err| {
                tracing::error!(
                    target: TRACING_TARGET_HASH,
                    algorithm = ?self.algorithm,
                    error = %err,
                    "Token hashing failed"
                );
            })?;

        Ok(hashed)
    }

    async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool> {
        let hasher = self.clone();
        let plaintext = plaintext.to_string();
        let hashed = hashed.to_string();

        tokio::task::spawn_blocking(move || hasher.verify_blocking(&plaintext, &hashed)).await?
    }
}
