use thiserror::Error;

/// Failure talking to the CMS.
///
/// `Upstream` carries the CMS's HTTP status so routes can mirror it;
/// the message is already reduced to a single human-readable string.
#[derive(Debug, Error)]
pub enum CmsError {
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("CMS request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl CmsError {
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// HTTP status to surface to the caller for this failure.
    pub fn status(&self) -> u16 {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::Transport(_) => 500,
        }
    }

    /// True when the CMS rejected a registration because the email or
    /// username is already in use.
    pub fn is_already_taken(&self) -> bool {
        matches!(self, Self::Upstream { message, .. } if message.contains("already taken"))
    }
}
