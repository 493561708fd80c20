use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep_until};

/// Expires a fixed duration after it was created.
///
/// The timer itself is only created on first poll, so a deadline can be set up outside a Tokio
/// runtime; it is measured from creation regardless.
#[derive(Debug)]
pub(crate) struct Deadline {
    duration: Duration,

    // `None` if the duration is too long to represent, in which case the deadline never expires.
    expires_at: Option<Instant>,

    timer: Option<Pin<Box<Sleep>>>,
}

impl Deadline {
    pub(crate) fn after(duration: Duration) -> Self {
        Self {
            duration,
            expires_at: Instant::now().checked_add(duration),
            timer: None,
        }
    }

    pub(crate) fn duration(&self) -> Duration {
        self.duration
    }

    /// Polls the timer, returning `Ready` once the deadline has passed.
    pub(crate) fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let Some(expires_at) = self.expires_at else {
            return Poll::Pending;
        };

        self.timer
            .get_or_insert_with(|| Box::pin(sleep_until(expires_at)))
            .as_mut()
            .poll(cx)
    }
}
