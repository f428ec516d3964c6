//! 存储配置
//!
//! ```rust
//! use passwordless_store::StoreConfig;
//! use passwordless_store::collection::DatabaseOptions;
//!
//! let config = StoreConfig::default()
//!     .with_collection("login-tokens")
//!     .with_database(DatabaseOptions::default().with_pretty(true));
//! assert_eq!(config.collection, "login-tokens");
//! ```

use serde::{Deserialize, Serialize};

use crate::collection::DatabaseOptions;
use crate::error::{ConfigError, Result};

/// 默认集合名称
pub const DEFAULT_COLLECTION: &str = "passwordless-token";

/// Token 存储配置
///
/// `database` 部分不做解释，原样传给底层数据库。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 集合名称
    pub collection: String,

    /// 底层数据库选项
    pub database: DatabaseOptions,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            database: DatabaseOptions::default(),
        }
    }
}

impl StoreConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置集合名称
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// 设置数据库选项
    pub fn with_database(mut self, database: DatabaseOptions) -> Self {
        self.database = database;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "collection".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
