//! Token 哈希模块
//!
//! 存储中只保存 token 的单向加盐哈希。本模块定义哈希原语的接口
//! [`SecureHasher`]，并提供基于 bcrypt / Argon2id 的默认实现 [`TokenHasher`]。
//!
//! ## Features
//!
//! - `bcrypt` - 启用 bcrypt 支持（默认启用，默认算法，cost 为 10）
//! - `argon2` - 启用 Argon2id 支持（默认启用）
//!
//! ## 示例
//!
//! ```rust
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use passwordless_store::hash::{SecureHasher, TokenHasher};
//!
//! let hasher = TokenHasher::default();
//! let hashed = hasher.hash("tok-A").await.unwrap();
//!
//! assert_ne!(hashed, "tok-A");
//! assert!(hasher.verify("tok-A", &hashed).await.unwrap());
//! assert!(!hasher.verify("tok-B", &hashed).await.unwrap());
//! # });
//! ```
//!
//! ## 自定义实现
//!
//! 实现 [`SecureHasher`] 即可接入外部哈希服务，或在测试中替换为假实现。
//! 实现必须满足：
//!
//! - `hash` 每次调用使用新的随机盐，同一明文两次哈希结果不同
//! - `verify` 使用常量时间比较
//! - “不匹配”返回 `Ok(false)`，只有哈希引擎本身的故障才返回错误

mod hasher;

use async_trait::async_trait;

use crate::error::Result;

pub use hasher::{Algorithm, DEFAULT_BCRYPT_COST, TokenHasher};

/// 安全哈希原语接口
#[async_trait]
pub trait SecureHasher: Send + Sync {
    /// 计算明文的加盐单向哈希
    async fn hash(&self, plaintext: &str) -> Result<String>;

    /// 验证明文是否与哈希匹配
    async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool>;
}
