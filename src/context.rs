use crate::UnfurlError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caller-owned cancellation and deadline for one or more scrapes.
///
/// The scraper imposes no timeout of its own; a fetch runs until it finishes,
/// the token is cancelled, or the deadline passes.
#[derive(Debug, Clone, Default)]
pub struct ScrapeContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ScrapeContext {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().deadline_at(deadline)
    }

    /// Sets the deadline, keeping the earlier one if already set.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// A context cancelled along with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails fast if the context is already done.
    pub fn check(&self) -> Result<(), UnfurlError> {
        if self.cancel.is_cancelled() {
            return Err(UnfurlError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(UnfurlError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drives `fut` until it completes or the context ends, dropping it in the
    /// latter case.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, UnfurlError>
    where
        F: Future<Output = Result<T, UnfurlError>>,
    {
        self.check()?;
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| UnfurlError::DeadlineExceeded)?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UnfurlError::Cancelled),
            result = bounded => result,
        }
    }
}
