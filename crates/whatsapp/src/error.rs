use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] herald_browser::SessionError),

    #[error(transparent)]
    Engine(#[from] herald_browser::EngineError),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Whether a second attempt after re-entering the web client may help.
    /// Only the engine's navigation/timeout class qualifies.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_transient(),
            Self::Session(_) | Self::Message { .. } => false,
        }
    }
}

impl herald_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

herald_common::impl_context!();
