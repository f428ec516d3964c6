//! Token 存储模块
//!
//! [`TokenStore`] 是所有存储后端共同实现的接口，负责 token 的完整生命周期：
//! 签发、认证、失效、清空、计数。
//!
//! ## 不变量
//!
//! - 每个 uid 最多只有一条记录，重新签发会替换旧记录，旧 token 立即失效
//! - 只保存 token 的加盐哈希，明文从不落盘，也不写入日志
//! - 过期记录即使仍在存储中也不会通过认证
//!
//! ## 错误与否定结果
//!
//! token 错误、过期或不存在时返回 [`Authentication::Denied`]，**不是**错误。
//! 只有哈希引擎或存储故障才会返回 `Err`。空参数等契约违反在任何 I/O 之前返回
//! [`Error::Validation`](crate::Error::Validation)。
//!
//! ## 示例
//!
//! ```rust
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use passwordless_store::{FileTokenStore, StoreConfig, TokenStore};
//! use std::time::Duration;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let location = dir.path().join("tokens.json");
//! let store = FileTokenStore::new(location.to_str().unwrap(), StoreConfig::default()).unwrap();
//!
//! store
//!     .issue("tok-A", "alice@example.com", Duration::from_secs(60), Some("https://x/page"))
//!     .await
//!     .unwrap();
//!
//! let result = store.authenticate("tok-A", "alice@example.com").await.unwrap();
//! assert!(result.is_valid());
//! assert_eq!(result.origin_url(), Some("https://x/page"));
//! # });
//! ```

mod collection_store;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub use collection_store::{CollectionTokenStore, FileTokenStore, MemoryTokenStore};

/// 认证结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// 认证通过
    Granted {
        /// 签发时记录的原始 URL，未提供时为空字符串
        origin_url: String,
    },

    /// 认证未通过（token 不匹配、已过期或不存在）
    Denied,
}

impl Authentication {
    /// 是否认证通过
    pub fn is_valid(&self) -> bool {
        matches!(self, Authentication::Granted { .. })
    }

    /// 认证通过时返回原始 URL
    pub fn origin_url(&self) -> Option<&str> {
        match self {
            Authentication::Granted { origin_url } => Some(origin_url),
            Authentication::Denied => None,
        }
    }

    /// 转换为原始 URL
    pub fn into_origin_url(self) -> Option<String> {
        match self {
            Authentication::Granted { origin_url } => Some(origin_url),
            Authentication::Denied => None,
        }
    }
}

/// Token 存储接口
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// 签发（或替换）用户的 token
    ///
    /// `token` 与 `uid` 不能为空，`ttl` 必须为正。token 以加盐哈希形式保存，
    /// 该用户之前的 token 立即失效。
    async fn issue(
        &self,
        token: &str,
        uid: &str,
        ttl: Duration,
        origin_url: Option<&str>,
    ) -> Result<()>;

    /// 认证 token
    ///
    /// 认证不会消费 token，有效 token 在过期或被失效前可以重复使用。
    async fn authenticate(&self, token: &str, uid: &str) -> Result<Authentication>;

    /// 删除用户的所有 token，记录不存在时同样成功
    async fn invalidate(&self, uid: &str) -> Result<()>;

    /// 删除所有 token
    async fn clear(&self) -> Result<()>;

    /// 存储中的记录总数，包含已过期但尚未删除的记录
    async fn count(&self) -> Result<usize>;
}
