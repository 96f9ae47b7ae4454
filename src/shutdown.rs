//! Run cancellation
//!
//! A single background task races the run deadline against OS termination
//! signals. Whichever comes first cancels the shared token; test cases check
//! the token between calls and race each call against it.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Why a run was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The configured timeout elapsed
    Deadline,
    /// Ctrl-C / SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deadline => write!(f, "deadline exceeded"),
            Self::Interrupt => write!(f, "interrupted"),
            Self::Terminate => write!(f, "terminated"),
        }
    }
}

/// Handle to the background listener
pub struct ShutdownGuard {
    token: CancellationToken,
    listener: JoinHandle<Option<CancelReason>>,
}

impl ShutdownGuard {
    /// Spawn the listener
    ///
    /// `timeout` of `None` means no deadline; only signals cancel the run.
    pub fn spawn(timeout: Option<Duration>) -> Self {
        let token = CancellationToken::new();
        let listener = tokio::spawn(listen(token.clone(), timeout));
        Self { token, listener }
    }

    /// Token shared with the test routines
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop listening and report why the run was cancelled, if it was
    pub async fn finish(self) -> Option<CancelReason> {
        if !self.token.is_cancelled() {
            self.listener.abort();
            return None;
        }
        self.listener.await.ok().flatten()
    }
}

async fn listen(token: CancellationToken, timeout: Option<Duration>) -> Option<CancelReason> {
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    let reason = tokio::select! {
        _ = token.cancelled() => return None,
        _ = deadline => CancelReason::Deadline,
        reason = termination_signal() => reason,
    };

    tracing::warn!("Cancelling run: {}", reason);
    token.cancel();
    Some(reason)
}

#[cfg(unix)]
async fn termination_signal() -> CancelReason {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => tokio::select! {
            _ = tokio::signal::ctrl_c() => CancelReason::Interrupt,
            _ = sigterm.recv() => CancelReason::Terminate,
        },
        Err(e) => {
            tracing::debug!("SIGTERM handler unavailable: {}", e);
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> CancelReason {
    ctrl_c().await
}

async fn ctrl_c() -> CancelReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::debug!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    CancelReason::Interrupt
}
