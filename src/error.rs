use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The root value cannot anchor a class.
    #[error("invalid input at {path}: expected a JSON object, found {found}")]
    InvalidInput { path: String, found: &'static str },

    #[error("nesting deeper than {limit} levels at {path}")]
    DepthExceeded { path: String, limit: usize },

    #[error("could not find a free class name for `{base}` after {attempts} attempts")]
    NameCollisionUnresolvable { base: String, attempts: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {message}")]
    Invalid { path: String, message: String },
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;
