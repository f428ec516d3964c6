//! 统一错误类型模块
//!
//! 提供 passwordless-store 中所有操作的错误类型定义。
//!
//! 错误分为三类：
//!
//! - **契约违反**（[`Error::Validation`]）：调用方传入了空参数或非法 TTL，
//!   在任何 I/O 之前立即返回，属于编程错误
//! - **未通过认证**：不是错误，由 [`Authentication::Denied`](crate::Authentication) 表示
//! - **基础设施故障**（哈希、存储、内部错误）：通过对应操作的 `Result` 返回，
//!   本库不会自动重试

use thiserror::Error;

/// passwordless-store 的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// passwordless-store 的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 参数校验错误（调用方契约违反）
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 哈希计算或比较错误
    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    /// 存储错误
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 随机数等加密原语错误
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 创建一个空字段错误
    pub fn empty_field(field: &str) -> Self {
        Error::Validation(ValidationError::EmptyField(field.to_string()))
    }

    /// 是否为调用方契约违反
    ///
    /// 契约违反说明调用代码有缺陷，不应该作为运行时条件处理或重试。
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// 参数校验相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 字段为空
    #[error("field '{0}' cannot be empty")]
    EmptyField(String),

    /// TTL 必须为正数
    #[error("ttl must be a positive duration")]
    InvalidTtl,

    /// 存储位置为空
    #[error("a valid storage location has to be provided")]
    EmptyLocation,
}

/// 哈希相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// 哈希生成失败
    #[error("hash generation failed: {0}")]
    HashFailed(String),

    /// 比较过程失败（不是“不匹配”）
    #[error("hash verification failed: {0}")]
    VerifyFailed(String),

    /// 无效的哈希格式
    #[error("invalid hash format: {0}")]
    InvalidFormat(String),
}

/// 存储相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// 连接失败
    #[error("storage connection failed: {0}")]
    ConnectionFailed(String),

    /// 记录或集合未找到
    #[error("not found: {0}")]
    NotFound(String),

    /// 违反唯一索引
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// 操作失败
    #[error("storage operation failed: {0}")]
    OperationFailed(String),
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 无效的配置值
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// 随机数生成失败
    #[error("random number generation failed: {0}")]
    RngFailed(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::internal(format!("blocking task failed: {}", err))
    }
}
