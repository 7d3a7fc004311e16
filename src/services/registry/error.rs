use thiserror::Error;

/// 注册表对外暴露的错误类型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid service registration: {0}")]
    Validation(String),

    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("No healthy instances available for service: {0}")]
    NoHealthyInstance(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
