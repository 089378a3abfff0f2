use thiserror::Error;

pub type Result<T> = std::result::Result<T, WardenError>;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("chain access error: {0}")]
    Chain(#[from] ChainAccessError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ChainAccessError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("call to {function} on {contract} failed: {reason}")]
    CallFailed {
        function: String,
        contract: String,
        reason: String,
    },
    #[error("short return data from {function} on {contract}: {got} bytes")]
    ShortReturn {
        function: String,
        contract: String,
        got: usize,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read `{path}`: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to write `{path}`: {reason}")]
    Write { path: String, reason: String },
    #[error("failed to parse `{path}`: {reason}")]
    Parse { path: String, reason: String },
    #[error("failed to encode registry: {0}")]
    Encode(String),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingConfig(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
