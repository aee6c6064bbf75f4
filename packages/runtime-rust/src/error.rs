/// Configuration errors raised while classifying a type's members.
///
/// These abort the bootstrap for the type and are returned to whoever
/// triggered it; nothing is memoized for a type whose build failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootstrapError {
    #[error("Function {type_name}.{key} has invalid name: {tag}")]
    InvalidTag {
        type_name: String,
        key: String,
        tag: String,
    },
    #[error("{type_name}.{key} collides with a reserved accessor")]
    ReservedKey { type_name: String, key: String },
}

/// Errors loading runtime configuration or installing logging.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid runtime configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid log filter `{filter}`: {reason}")]
    Filter { filter: String, reason: String },
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}
