use std::fmt::{self, Display};
use std::time::Duration;

use thiserror::Error;

use crate::{AbortReason, EventName, Payload};

/// Errors produced by the event adapters.
///
/// The type parameter is the argument type of the emitter, which is carried by
/// [`Error::RejectionEventFired`].
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error<V: fmt::Debug> {
    /// The emitter does not expose a usable pair of listener methods.
    #[error(transparent)]
    IncompatibleEmitter(#[from] IncompatibleEmitter),

    /// The caller supplied an option value that cannot be used.
    #[error(transparent)]
    InvalidOption(#[from] InvalidOption),

    /// The emitter raised one of the configured rejection events.
    #[error("rejection event '{event}' was emitted")]
    RejectionEventFired {
        /// The rejection event that was raised.
        event: EventName,

        /// The arguments of the rejection event, packed the same way as accepted values.
        payload: Payload<V>,
    },

    /// The abort signal supplied in the options was triggered.
    #[error("operation was aborted: {reason}")]
    Aborted {
        /// The reason given when the signal was aborted.
        reason: AbortReason,
    },

    /// The configured timeout elapsed before the operation completed.
    #[error("operation timed out after {duration:?}")]
    TimedOut {
        /// The timeout that elapsed.
        duration: Duration,
    },
}

impl<V: fmt::Debug> Error<V> {
    /// Returns the payload of the rejection event, if this error was caused by one.
    #[must_use]
    pub fn rejection_payload(&self) -> Option<&Payload<V>> {
        match self {
            Self::RejectionEventFired { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// The listener method family that an incompatible emitter is missing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum MissingMethod {
    /// None of `on`, `add_listener` or `add_event_listener` is present.
    Registration,

    /// None of `off`, `remove_listener` or `remove_event_listener` is present.
    Removal,
}

impl Display for MissingMethod {
    #[cfg_attr(test, mutants::skip)] // No API contract for error message.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration => write!(f, "on/add_listener/add_event_listener"),
            Self::Removal => write!(f, "off/remove_listener/remove_event_listener"),
        }
    }
}

/// The emitter does not expose both a listener registration method and a removal method.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("emitter is not compatible: it has no {missing} method")]
pub struct IncompatibleEmitter {
    missing: MissingMethod,
}

impl IncompatibleEmitter {
    pub(crate) fn new(missing: MissingMethod) -> Self {
        Self { missing }
    }

    /// Which listener method family the emitter lacks.
    #[must_use]
    pub fn missing(&self) -> MissingMethod {
        self.missing
    }
}

/// An option had a value the adapters cannot work with.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid '{option}' option: {problem}")]
pub struct InvalidOption {
    option: &'static str,
    problem: String,
}

impl InvalidOption {
    pub(crate) fn new(option: &'static str, problem: impl Into<String>) -> Self {
        Self {
            option,
            problem: problem.into(),
        }
    }

    /// The name of the offending option.
    #[must_use]
    pub fn option(&self) -> &'static str {
        self.option
    }

    /// A human-readable description of the problem.
    #[must_use]
    pub fn problem(&self) -> &str {
        &self.problem
    }
}

/// A specialized `Result` type for event adapter operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T, V> = std::result::Result<T, Error<V>>;
