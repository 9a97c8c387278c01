use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not sample load on {host}: {reason}")]
    Sample { host: String, reason: String },

    #[error("Remote shell to {host} could not be started: {source}")]
    Transport {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FarmError {
    /// Process exit code for errors that surface to the user.
    ///
    /// Configuration problems are usage failures (1); a transport that
    /// could not be established uses ssh's convention (255).
    pub fn exit_code(&self) -> i32 {
        match self {
            FarmError::Config(_) => 1,
            FarmError::Transport { .. } => 255,
            FarmError::Sample { .. } | FarmError::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, FarmError>;
