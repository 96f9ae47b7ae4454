//! Harness Error Types
//!
//! Only a handful of failures end a run. Everything else is logged against
//! the test case that produced it and the run moves on.

/// Failures that stop the harness
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The server could not be reached
    #[error("Could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The server was reached but the handshake failed
    #[error("Could not initialize session with {url}: {reason}")]
    Initialize { url: String, reason: String },

    /// Configuration could not be loaded or is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The run was interrupted by a signal or the deadline
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// Cases failed and the caller asked for a failing exit status
    #[error("{failed} test case(s) failed")]
    CasesFailed { failed: usize },
}

impl HarnessError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Connect { .. } | Self::Initialize { .. } | Self::Config(_) => 1,
            Self::CasesFailed { .. } => 2,
            Self::Cancelled(_) => 130,
        }
    }

    /// Classify a handshake failure
    ///
    /// Errors that never produced an HTTP exchange are connection failures;
    /// anything that got an answer from the server is an initialization
    /// failure.
    pub fn from_handshake(url: &str, error: &anyhow::Error) -> Self {
        let reason = format!("{:#}", error);
        let unreachable = error.chain().any(|cause| {
            cause
                .downcast_ref::<reqwest::Error>()
                .map(|e| e.is_connect() || e.is_timeout() || e.is_request())
                .unwrap_or(false)
        });

        if unreachable {
            Self::Connect {
                url: url.to_string(),
                reason,
            }
        } else {
            Self::Initialize {
                url: url.to_string(),
                reason,
            }
        }
    }
}
