use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("application not found: {0}")]
    NotFound(String),

    #[error("application {0} has nothing to launch")]
    EmptyCommand(String),

    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
