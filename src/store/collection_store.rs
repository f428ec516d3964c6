//! 基于集合的 token 存储
//!
//! 集合在第一次操作时才打开，打开后在整个存储生命周期内复用。
//! 打开过程由 [`OnceCell`] 串行化：并发的首次调用共同等待同一次打开，
//! 不会重复连接；打开失败时保持未打开状态，下一次操作会重试。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{Authentication, TokenStore};
use crate::TRACING_TARGET_STORE;
use crate::collection::{
    Collection, CollectionProvider, FileProvider, MemoryProvider, RecordFilter, TokenRecord,
};
use crate::config::StoreConfig;
use crate::error::{Error, Result, ValidationError};
use crate::hash::{SecureHasher, TokenHasher};

/// 文件数据库支持的 token 存储
pub type FileTokenStore = CollectionTokenStore<FileProvider, TokenHasher>;

/// 内存 token 存储
pub type MemoryTokenStore = CollectionTokenStore<MemoryProvider, TokenHasher>;

/// 基于 [`CollectionProvider`] 和 [`SecureHasher`] 组合的 token 存储
pub struct CollectionTokenStore<P: CollectionProvider, H = TokenHasher> {
    provider: P,
    hasher: H,
    collection_name: String,
    collection: OnceCell<P::Collection>,
}

impl FileTokenStore {
    /// 使用默认哈希器创建文件存储
    ///
    /// `location` 为数据库文件路径，不能为空。构造时不做任何 I/O，
    /// 数据库在第一次操作时才连接。
    ///
    /// # Errors
    ///
    /// - `location` 为空：[`ValidationError::EmptyLocation`]
    /// - 集合名称为空：[`ConfigError::InvalidValue`](crate::error::ConfigError::InvalidValue)
    pub fn new(location: &str, config: StoreConfig) -> Result<Self> {
        Self::with_hasher(location, TokenHasher::default(), config)
    }
}

impl<H: SecureHasher> CollectionTokenStore<FileProvider, H> {
    /// 使用自定义哈希器创建文件存储
    pub fn with_hasher(location: &str, hasher: H, config: StoreConfig) -> Result<Self> {
        if location.trim().is_empty() {
            return Err(ValidationError::EmptyLocation.into());
        }

        let provider = FileProvider::new(location, config.database.clone());
        Self::with_parts(provider, hasher, config)
    }
}

impl MemoryTokenStore {
    /// 使用默认哈希器创建内存存储
    pub fn in_memory() -> Self {
        Self {
            provider: MemoryProvider::new(),
            hasher: TokenHasher::default(),
            collection_name: StoreConfig::default().collection,
            collection: OnceCell::new(),
        }
    }
}

impl<P, H> CollectionTokenStore<P, H>
where
    P: CollectionProvider,
    H: SecureHasher,
{
    /// 由任意集合提供者和哈希器组合出存储
    ///
    /// 只使用 `config` 中的集合名称，`database` 部分由调用方自行交给提供者。
    pub fn with_parts(provider: P, hasher: H, config: StoreConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            hasher,
            collection_name: config.collection,
            collection: OnceCell::new(),
        })
    }

    /// 集合名称
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// 集合是否已经打开
    pub fn is_open(&self) -> bool {
        self.collection.initialized()
    }

    /// 集合提供者
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// 哈希器
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// 物理删除所有已过期的记录，返回删除数量
    ///
    /// 过期记录本来就不会通过认证，此方法只用于回收存储空间。
    pub async fn purge_expired(&self) -> Result<usize> {
        let collection = self.collection().await?;
        let removed = collection
            .remove_where(&RecordFilter::all().expired_at(Utc::now()))
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            collection = %self.collection_name,
            removed,
            "Purged expired tokens"
        );
        Ok(removed)
    }

    /// 获取集合，必要时打开
    async fn collection(&self) -> Result<&P::Collection> {
        self.collection
            .get_or_try_init(|| async {
                tracing::debug!(
                    target: TRACING_TARGET_STORE,
                    collection = %self.collection_name,
                    "Opening token collection"
                );

                self.provider
                    .open(&self.collection_name)
                    .await
                    .inspect_err(|err| {
                        tracing::error!(
                            target: TRACING_TARGET_STORE,
                            collection = %self.collection_name,
                            error = %err,
                            "Failed to open token collection"
                        );
                    })
            })
            .await
    }
}

impl<P: CollectionProvider, H> fmt::Debug for CollectionTokenStore<P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionTokenStore")
            .field("collection_name", &self.collection_name)
            .field("is_open", &self.collection.initialized())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<P, H> TokenStore for CollectionTokenStore<P, H>
where
    P: CollectionProvider,
    H: SecureHasher,
{
    async fn issue(
        &self,
        token: &str,
        uid: &str,
        ttl: Duration,
        origin_url: Option<&str>,
    ) -> Result<()> {
        require_non_empty("token", token)?;
        require_non_empty("uid", uid)?;
        let ttl = to_chrono_ttl(ttl)?;

        let collection = self.collection().await?;

        // 哈希失败时直接返回，不写入任何记录
        let hashed_token = self.hasher.hash(token).await?;
        let expires_at = compute_expiry(Utc::now(), ttl)?;

        let record = TokenRecord {
            uid: uid.to_string(),
            hashed_token,
            expires_at,
            origin_url: origin_url
                .filter(|url| !url.is_empty())
                .map(str::to_string),
        };

        collection
            .replace(&RecordFilter::uid(uid), record)
            .await
            .inspect_err(|err| {
                tracing::warn!(
                    target: TRACING_TARGET_STORE,
                    uid,
                    error = %err,
                    "Failed to store token"
                );
            })?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            uid,
            expires_at = %expires_at,
            "Issued token"
        );
        Ok(())
    }

    async fn authenticate(&self, token: &str, uid: &str) -> Result<Authentication> {
        require_non_empty("token", token)?;
        require_non_empty("uid", uid)?;

        let collection = self.collection().await?;
        let filter = RecordFilter::uid(uid).expires_after(Utc::now());

        let Some(record) = collection.find_one(&filter).await? else {
            tracing::debug!(
                target: TRACING_TARGET_STORE,
                uid,
                "No active token for user"
            );
            return Ok(Authentication::Denied);
        };

        if !self.hasher.verify(token, &record.hashed_token).await? {
            tracing::debug!(target: TRACING_TARGET_STORE, uid, "Token mismatch");
            return Ok(Authentication::Denied);
        }

        tracing::debug!(target: TRACING_TARGET_STORE, uid, "Token authenticated");
        Ok(Authentication::Granted {
            origin_url: record.origin_url.unwrap_or_default(),
        })
    }

    async fn invalidate(&self, uid: &str) -> Result<()> {
        require_non_empty("uid", uid)?;

        let collection = self.collection().await?;
        let removed = collection.remove_where(&RecordFilter::uid(uid)).await?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            uid,
            removed,
            "Invalidated user tokens"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.collection().await?.clear().await?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            collection = %self.collection_name,
            "Cleared all tokens"
        );
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        self.collection().await?.count().await
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::empty_field(field));
    }
    Ok(())
}

fn to_chrono_ttl(ttl: Duration) -> Result<chrono::Duration> {
    if ttl.is_zero() {
        return Err(ValidationError::InvalidTtl.into());
    }
    chrono::Duration::from_std(ttl).map_err(|_| ValidationError::InvalidTtl.into())
}

fn compute_expiry(now: DateTime<Utc>, ttl: chrono::Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| ValidationError::InvalidTtl.into())
}
