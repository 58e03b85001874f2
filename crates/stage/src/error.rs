use std::path::PathBuf;

/// Errors from loading or writing stage configuration.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("YAML error: {0}")]
    Serialize(#[from] serde_yaml::Error),
}
