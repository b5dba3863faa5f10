use thiserror::Error;

/// Failures reading or writing the widget config file.
///
/// These never reach the user: reads fall back to defaults and failed
/// writes are logged.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures talking to the usage analyzer.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{0} not installed")]
    NotInstalled(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Failed(String),

    #[error("unreadable analyzer output: {0}")]
    Parse(#[from] serde_json::Error),
}
