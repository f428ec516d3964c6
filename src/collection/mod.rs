//! 持久化集合模块
//!
//! Token 记录保存在一个“集合”中，集合由嵌入式文档数据库或其他后端提供。
//! 本模块定义后端需要实现的两个接口：
//!
//! - [`Collection`]：对单个集合的查找、删除、插入、清空、计数
//! - [`CollectionProvider`]：按名称打开集合，集合不存在时创建并建立 `uid` 唯一索引
//!
//! 内置两种后端：
//!
//! - [`FileProvider`]：单个 JSON 文件保存的嵌入式文档数据库
//! - [`MemoryProvider`]：进程内存储，适用于测试或单实例部署

mod file;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, StorageError};

pub use file::{DatabaseOptions, FileCollection, FileDatabase, FileProvider};
pub use memory::{MemoryCollection, MemoryProvider};

/// 需要唯一索引的字段
pub const UNIQUE_FIELDS: &[&str] = &["uid"];

// ============================================================================
// 数据结构
// ============================================================================

/// 持久化的 token 记录
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// 用户标识
    pub uid: String,

    /// token 的加盐哈希，从不保存明文
    pub hashed_token: String,

    /// 过期时间
    pub expires_at: DateTime<Utc>,

    /// 认证成功后跳转的原始 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
}

impl TokenRecord {
    /// 在给定时间点是否仍然有效
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// 按字段名取值，用于唯一索引检查
    ///
    /// 只有 [`UNIQUE_FIELDS`] 中的字段可以建立索引，其他字段名返回 `None`。
    pub fn field_value(&self, field: &str) -> Option<&str> {
        match field {
            "uid" => Some(&self.uid),
            _ => None,
        }
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("uid", &self.uid)
            .field("hashed_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("origin_url", &self.origin_url)
            .finish()
    }
}

/// 记录过滤条件
///
/// 所有设置了的条件取交集，未设置任何条件时匹配所有记录。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    uid: Option<String>,
    expires_after: Option<DateTime<Utc>>,
    expired_at: Option<DateTime<Utc>>,
}

impl RecordFilter {
    /// 匹配所有记录
    pub fn all() -> Self {
        Self::default()
    }

    /// 按 uid 匹配
    pub fn uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::default()
        }
    }

    /// 要求 `expires_at > at`
    pub fn expires_after(mut self, at: DateTime<Utc>) -> Self {
        self.expires_after = Some(at);
        self
    }

    /// 要求 `expires_at <= at`
    pub fn expired_at(mut self, at: DateTime<Utc>) -> Self {
        self.expired_at = Some(at);
        self
    }

    /// 检查记录是否满足条件
    pub fn matches(&self, record: &TokenRecord) -> bool {
        if let Some(uid) = &self.uid
            && record.uid != *uid
        {
            return false;
        }
        if let Some(at) = self.expires_after
            && record.expires_at <= at
        {
            return false;
        }
        if let Some(at) = self.expired_at
            && record.expires_at > at
        {
            return false;
        }
        true
    }
}

// ============================================================================
// 存储接口
// ============================================================================

/// 单个集合的操作接口
///
/// 实现此 trait 以接入自定义的存储后端（如 Redis、关系数据库等）。
#[async_trait]
pub trait Collection: Send + Sync {
    /// 查找第一条匹配的记录
    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<TokenRecord>>;

    /// 删除所有匹配的记录，返回删除数量
    async fn remove_where(&self, filter: &RecordFilter) -> Result<usize>;

    /// 插入记录
    ///
    /// 违反唯一索引时返回 [`StorageError::AlreadyExists`]。
    async fn insert(&self, record: TokenRecord) -> Result<()>;

    /// 删除匹配的记录后插入新记录
    ///
    /// 默认实现分两步执行，两步之间不是原子的。能够原子替换的后端应覆盖此方法。
    async fn replace(&self, filter: &RecordFilter, record: TokenRecord) -> Result<()> {
        self.remove_where(filter).await?;
        self.insert(record).await
    }

    /// 删除所有记录
    async fn clear(&self) -> Result<()>;

    /// 记录总数（不区分是否过期）
    async fn count(&self) -> Result<usize>;
}

/// 集合提供者
///
/// 负责连接底层数据库并按名称打开集合。集合不存在时创建，并在 `uid`
/// 上建立唯一索引；集合已存在时不做任何结构变更。
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// 打开后的集合类型
    type Collection: Collection + 'static;

    /// 打开（必要时创建）指定名称的集合
    async fn open(&self, name: &str) -> Result<Self::Collection>;
}

/// 检查插入 `record` 是否会违反唯一索引
pub(crate) fn check_unique(
    records: &[TokenRecord],
    unique: &[String],
    record: &TokenRecord,
) -> Result<()> {
    for field in unique {
        let Some(value) = record.field_value(field) else {
            continue;
        };
        if records
            .iter()
            .any(|existing| existing.field_value(field) == Some(value))
        {
            return Err(StorageError::AlreadyExists(format!("{}={}", field, value)).into());
        }
    }
    Ok(())
}
