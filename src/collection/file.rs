//! 文件集合实现
//!
//! 一个轻量的嵌入式文档数据库：整个数据库保存在单个 JSON 文件中，
//! 包含若干命名集合，每个集合记录自己的唯一索引字段。
//!
//! 文件格式：
//!
//! ```json
//! {
//!   "collections": {
//!     "passwordless-token": {
//!       "unique": ["uid"],
//!       "records": [
//!         { "uid": "alice@example.com", "hashedToken": "$2b$10$...", "expiresAt": "2026-01-01T00:00:00Z" }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! 启用 `autosave`（默认）时，每次变更都会先写入临时文件再原子重命名。
//! 同一个文件只应被一个 [`FileDatabase`] 实例打开，多个实例之间不会互相感知。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Collection, CollectionProvider, RecordFilter, TokenRecord, UNIQUE_FIELDS, check_unique};
use crate::TRACING_TARGET_COLLECTION;
use crate::error::{Result, StorageError};

// ============================================================================
// 配置
// ============================================================================

/// 数据库选项
///
/// 原样传递给 [`FileDatabase::connect`]。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// 每次变更后自动写盘
    pub autosave: bool,

    /// 以缩进格式写出 JSON
    pub pretty: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            autosave: true,
            pretty: false,
        }
    }
}

impl DatabaseOptions {
    /// 设置是否自动写盘
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// 设置是否缩进输出
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

// ============================================================================
// 数据库
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct DatabaseState {
    #[serde(default)]
    collections: BTreeMap<String, CollectionData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CollectionData {
    #[serde(default)]
    unique: Vec<String>,
    #[serde(default)]
    records: Vec<TokenRecord>,
}

/// 基于 JSON 文件的嵌入式文档数据库
///
/// 克隆后共享同一份内存状态。
#[derive(Debug, Clone)]
pub struct FileDatabase {
    path: Arc<PathBuf>,
    options: DatabaseOptions,
    state: Arc<Mutex<DatabaseState>>,
}

impl FileDatabase {
    /// 连接数据库
    ///
    /// 文件不存在或为空时视为空数据库；文件内容无法解析时返回
    /// [`StorageError::ConnectionFailed`]。
    pub async fn connect(path: impl AsRef<Path>, options: DatabaseOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => DatabaseState::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::ConnectionFailed(format!(
                    "invalid database file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => DatabaseState::default(),
            Err(e) => {
                return Err(StorageError::ConnectionFailed(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                ))
                .into());
            }
        };

        tracing::debug!(
            target: TRACING_TARGET_COLLECTION,
            path = %path.display(),
            collections = state.collections.len(),
            "Connected to database file"
        );

        Ok(Self {
            path: Arc::new(path),
            options,
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// 数据库文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 数据库选项
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// 所有集合名称
    pub async fn collection_names(&self) -> Vec<String> {
        self.state.lock().await.collections.keys().cloned().collect()
    }

    /// 获取已存在的集合
    pub async fn get_collection(&self, name: &str) -> Option<FileCollection> {
        let state = self.state.lock().await;
        state
            .collections
            .contains_key(name)
            .then(|| self.handle(name))
    }

    /// 创建集合并建立唯一索引
    ///
    /// 集合已存在时直接返回，不修改其唯一索引。
    pub async fn add_collection(&self, name: &str, unique: &[&str]) -> Result<FileCollection> {
        let mut state = self.state.lock().await;
        if state.collections.contains_key(name) {
            return Ok(self.handle(name));
        }

        tracing::info!(
            target: TRACING_TARGET_COLLECTION,
            collection = name,
            unique = ?unique,
            "Creating collection"
        );
        state.collections.insert(
            name.to_string(),
            CollectionData {
                unique: unique.iter().map(|field| field.to_string()).collect(),
                records: Vec::new(),
            },
        );
        if let Err(err) = self.persist(&state).await {
            state.collections.remove(name);
            return Err(err);
        }

        Ok(self.handle(name))
    }

    /// 立即把当前状态写入文件
    pub async fn save(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.write_file(&state).await
    }

    fn handle(&self, name: &str) -> FileCollection {
        FileCollection {
            name: name.to_string(),
            db: self.clone(),
        }
    }

    async fn persist(&self, state: &DatabaseState) -> Result<()> {
        if self.options.autosave {
            self.write_file(state).await?;
        }
        Ok(())
    }

    async fn write_file(&self, state: &DatabaseState) -> Result<()> {
        let bytes = if self.options.pretty {
            serde_json::to_vec_pretty(state)
        } else {
            serde_json::to_vec(state)
        }
        .map_err(|e| StorageError::OperationFailed(format!("cannot serialize database: {}", e)))?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_result = async {
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, self.path.as_path()).await
        }
        .await;

        write_result.map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_COLLECTION,
                path = %self.path.display(),
                error = %e,
                "Failed to write database file"
            );
            StorageError::OperationFailed(format!("cannot write {}: {}", self.path.display(), e))
                .into()
        })
    }

    /// 在锁内读取指定集合
    async fn read_collection<T>(
        &self,
        name: &str,
        op: impl FnOnce(&CollectionData) -> T,
    ) -> Result<T> {
        let state = self.state.lock().await;
        let data = state
            .collections
            .get(name)
            .ok_or_else(|| StorageError::NotFound(format!("collection '{}'", name)))?;
        Ok(op(data))
    }

    /// 在锁内修改指定集合
    ///
    /// 修改作用在集合副本上，写盘成功后才替换内存状态；
    /// 写盘失败时内存状态保持不变。`op` 返回的 `dirty` 为假时不写盘。
    async fn with_collection<T>(
        &self,
        name: &str,
        op: impl FnOnce(&mut CollectionData) -> Result<(T, bool)>,
    ) -> Result<T> {
        let mut state = self.state.lock().await;
        let mut next = state
            .collections
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("collection '{}'", name)))?;

        let (value, dirty) = op(&mut next)?;
        if !dirty {
            return Ok(value);
        }

        let previous = state.collections.insert(name.to_string(), next);
        if let Err(err) = self.persist(&state).await {
            if let Some(previous) = previous {
                state.collections.insert(name.to_string(), previous);
            }
            return Err(err);
        }
        Ok(value)
    }
}

/// 文件数据库中的一个集合
#[derive(Debug, Clone)]
pub struct FileCollection {
    name: String,
    db: FileDatabase,
}

impl FileCollection {
    /// 集合名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 所属数据库
    pub fn database(&self) -> &FileDatabase {
        &self.db
    }
}

#[async_trait]
impl Collection for FileCollection {
    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<TokenRecord>> {
        self.db
            .read_collection(&self.name, |data| {
                data.records
                    .iter()
                    .find(|record| filter.matches(record))
                    .cloned()
            })
            .await
    }

    async fn remove_where(&self, filter: &RecordFilter) -> Result<usize> {
        self.db
            .with_collection(&self.name, |data| {
                let before = data.records.len();
                data.records.retain(|record| !filter.matches(record));
                let removed = before - data.records.len();
                Ok((removed, removed > 0))
            })
            .await
    }

    async fn insert(&self, record: TokenRecord) -> Result<()> {
        self.db
            .with_collection(&self.name, |data| {
                check_unique(&data.records, &data.unique, &record)?;
                data.records.push(record);
                Ok(((), true))
            })
            .await
    }

    async fn replace(&self, filter: &RecordFilter, record: TokenRecord) -> Result<()> {
        self.db
            .with_collection(&self.name, |data| {
                data.records.retain(|existing| !filter.matches(existing));
                check_unique(&data.records, &data.unique, &record)?;
                data.records.push(record);
                Ok(((), true))
            })
            .await
    }

    async fn clear(&self) -> Result<()> {
        self.db
            .with_collection(&self.name, |data| {
                data.records.clear();
                Ok(((), true))
            })
            .await
    }

    async fn count(&self) -> Result<usize> {
        self.db
            .read_collection(&self.name, |data| data.records.len())
            .await
    }
}

// ============================================================================
// 提供者
// ============================================================================

/// 文件集合提供者
///
/// 每次 [`open`](CollectionProvider::open) 都会重新连接数据库文件，
/// 由上层负责缓存打开后的集合。
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    options: DatabaseOptions,
}

impl FileProvider {
    /// 创建文件提供者
    pub fn new(path: impl Into<PathBuf>, options: DatabaseOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    /// 数据库文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CollectionProvider for FileProvider {
    type Collection = FileCollection;

    async fn open(&self, name: &str) -> Result<FileCollection> {
        let db = FileDatabase::connect(&self.path, self.options.clone()).await?;
        match db.get_collection(name).await {
            Some(collection) => Ok(collection),
            None => db.add_collection(name, UNIQUE_FIELDS).await,
        }
    }
}
