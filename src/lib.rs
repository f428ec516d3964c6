//! # passwordless-store
//!
//! 无密码（魔法链接）登录的 token 存储。
//!
//! 调用方为用户生成一次性 token 并通过邮件等渠道发送，本库负责保存 token
//! 的加盐哈希、有效期和原始请求 URL，并在用户出示 token 时完成校验。
//!
//! ## 功能特性
//!
//! - **只存哈希**: token 使用 bcrypt（默认 cost 10）或 Argon2id 加盐哈希后保存
//! - **每用户一个 token**: 重新签发会替换旧 token，旧 token 立即失效
//! - **惰性过期**: 认证时比较过期时间，不需要后台清理任务
//! - **可插拔后端**: 内置 JSON 文件数据库和内存存储，可实现 [`CollectionProvider`] 接入其他后端
//! - **可替换哈希**: 实现 [`SecureHasher`] 即可接入外部哈希服务
//!
//! ## Features
//!
//! - `bcrypt` - 启用 bcrypt 支持（默认启用）
//! - `argon2` - 启用 Argon2id 支持（默认启用）
//! - `full` - 启用所有功能
//!
//! ## 示例
//!
//! ```rust
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use passwordless_store::random::generate_login_token;
//! use passwordless_store::{FileTokenStore, StoreConfig, TokenStore};
//! use std::time::Duration;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let location = dir.path().join("tokens.json");
//! let store = FileTokenStore::new(location.to_str().unwrap(), StoreConfig::default()).unwrap();
//!
//! // 生成 token 并签发，链接的发送由应用层负责
//! let token = generate_login_token().unwrap();
//! store
//!     .issue(&token, "alice@example.com", Duration::from_secs(15 * 60), None)
//!     .await
//!     .unwrap();
//!
//! // 用户点击链接后验证
//! let result = store.authenticate(&token, "alice@example.com").await.unwrap();
//! assert!(result.is_valid());
//!
//! // 错误的 token 不是错误，只是认证不通过
//! let result = store.authenticate("wrong-token", "alice@example.com").await.unwrap();
//! assert!(!result.is_valid());
//! # });
//! ```
//!
//! ## 日志
//!
//! 通过 `tracing` 输出事件，各模块使用独立的 target（见 [`TRACING_TARGET_STORE`] 等）。
//! 本库不安装任何 subscriber，token 明文和哈希都不会出现在日志中。

pub mod collection;
pub mod config;
pub mod error;
pub mod hash;
pub mod random;
pub mod store;

/// 存储生命周期操作的 tracing target
pub const TRACING_TARGET_STORE: &str = "passwordless_store::store";

/// 集合与数据库文件操作的 tracing target
pub const TRACING_TARGET_COLLECTION: &str = "passwordless_store::collection";

/// 哈希计算的 tracing target
pub const TRACING_TARGET_HASH: &str = "passwordless_store::hash";

pub use error::{Error, Result};

// ============================================================================
// 存储相关导出
// ============================================================================

pub use config::{DEFAULT_COLLECTION, StoreConfig};
pub use store::{
    Authentication, CollectionTokenStore, FileTokenStore, MemoryTokenStore, TokenStore,
};

// ============================================================================
// 后端与哈希导出
// ============================================================================

pub use collection::{
    Collection, CollectionProvider, DatabaseOptions, FileProvider, MemoryProvider, RecordFilter,
    TokenRecord,
};
pub use hash::{Algorithm, SecureHasher, TokenHasher};
