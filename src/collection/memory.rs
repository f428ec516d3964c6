//! 内存集合实现
//!
//! 适用于单实例部署或测试环境，进程退出后数据丢失。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{Collection, CollectionProvider, RecordFilter, TokenRecord, UNIQUE_FIELDS, check_unique};
use crate::TRACING_TARGET_COLLECTION;
use crate::error::Result;

/// 内存集合
///
/// 克隆后共享同一份数据。
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    unique: Arc<Vec<String>>,
    records: Arc<RwLock<Vec<TokenRecord>>>,
}

impl MemoryCollection {
    /// 创建新的内存集合
    pub fn new(name: impl Into<String>, unique: &[&str]) -> Self {
        Self {
            name: name.into(),
            unique: Arc::new(unique.iter().map(|field| field.to_string()).collect()),
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// 集合名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前所有记录的快照
    pub async fn snapshot(&self) -> Vec<TokenRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<TokenRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| filter.matches(record)).cloned())
    }

    async fn remove_where(&self, filter: &RecordFilter) -> Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| !filter.matches(record));
        Ok(before - records.len())
    }

    async fn insert(&self, record: TokenRecord) -> Result<()> {
        let mut records = self.records.write().await;
        check_unique(&records, &self.unique, &record)?;
        records.push(record);
        Ok(())
    }

    async fn replace(&self, filter: &RecordFilter, record: TokenRecord) -> Result<()> {
        // 同一把写锁内完成删除和插入
        let mut records = self.records.write().await;
        records.retain(|existing| !filter.matches(existing));
        check_unique(&records, &self.unique, &record)?;
        records.push(record);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

/// 内存集合提供者
///
/// 克隆后共享同一组集合，同名集合只会创建一次。
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    collections: Arc<Mutex<HashMap<String, MemoryCollection>>>,
}

impl MemoryProvider {
    /// 创建新的内存提供者
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已存在的集合
    pub async fn get_collection(&self, name: &str) -> Option<MemoryCollection> {
        self.collections.lock().await.get(name).cloned()
    }
}

#[async_trait]
impl CollectionProvider for MemoryProvider {
    type Collection = MemoryCollection;

    async fn open(&self, name: &str) -> Result<MemoryCollection> {
        let mut collections = self.collections.lock().await;
        if let Some(collection) = collections.get(name) {
            return Ok(collection.clone());
        }

        tracing::info!(
            target: TRACING_TARGET_COLLECTION,
            collection = name,
            "Creating in-memory collection with unique uid index"
        );
        let collection = MemoryCollection::new(name, UNIQUE_FIELDS);
        collections.insert(name.to_string(), collection.clone());
        Ok(collection)
    }
}
