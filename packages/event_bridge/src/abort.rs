//! Cooperative cancellation of pending adapter operations.
//!
//! An [`AbortController`] owns the right to abort; any number of [`AbortSignal`] clones observe it.
//! Passing a signal via [`Options::signal`][crate::Options::signal] makes an adapter fail with
//! [`Error::Aborted`][crate::Error::Aborted] and remove its listeners as soon as the signal is
//! aborted.

use std::any::type_name;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Display};
use std::rc::Rc;

use tracing::debug;

/// Why an operation was aborted.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AbortReason(Cow<'static, str>);

impl AbortReason {
    /// Creates a reason from a description.
    #[must_use]
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self(reason.into())
    }

    /// The description of the reason.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AbortReason {
    fn default() -> Self {
        Self(Cow::Borrowed("the operation was aborted"))
    }
}

impl Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for AbortReason {
    fn from(reason: &'static str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for AbortReason {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}

type AbortCallback = Rc<dyn Fn(&AbortReason)>;

/// Identifies a callback registered with [`AbortSignal::on_abort`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct AbortRegistration(u64);

struct SignalState {
    reason: RefCell<Option<AbortReason>>,
    callbacks: RefCell<Vec<(AbortRegistration, AbortCallback)>>,
    next_id: Cell<u64>,
}

/// Observes whether the owning [`AbortController`] has aborted.
///
/// Cloning a signal is cheap; all clones observe the same controller.
#[derive(Clone)]
pub struct AbortSignal {
    state: Rc<SignalState>,
}

impl AbortSignal {
    fn new(reason: Option<AbortReason>) -> Self {
        Self {
            state: Rc::new(SignalState {
                reason: RefCell::new(reason),
                callbacks: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Creates a signal that is already aborted with the given reason.
    #[must_use]
    pub fn aborted(reason: impl Into<AbortReason>) -> Self {
        Self::new(Some(reason.into()))
    }

    /// Whether the signal has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.reason.borrow().is_some()
    }

    /// The reason the signal was aborted with, if it has been aborted.
    #[must_use]
    pub fn reason(&self) -> Option<AbortReason> {
        self.state.reason.borrow().clone()
    }

    /// Registers a callback to run once when the signal is aborted.
    ///
    /// The callback is not invoked if the signal is already aborted; callers check that first.
    pub(crate) fn on_abort(&self, callback: AbortCallback) -> AbortRegistration {
        let id = self.state.next_id.get();
        self.state.next_id.set(id.wrapping_add(1));

        let registration = AbortRegistration(id);
        self.state
            .callbacks
            .borrow_mut()
            .push((registration, callback));

        registration
    }

    pub(crate) fn remove(&self, registration: AbortRegistration) {
        self.state
            .callbacks
            .borrow_mut()
            .retain(|(existing, _)| *existing != registration);
    }

    fn abort(&self, reason: AbortReason) {
        if self.is_aborted() {
            return;
        }

        *self.state.reason.borrow_mut() = Some(reason.clone());

        // Callbacks typically remove themselves, so we must not hold the borrow while they run.
        let callbacks = self.state.callbacks.take();

        debug!(%reason, callbacks = callbacks.len(), "abort signal triggered");

        for (_, callback) in callbacks {
            callback(&reason);
        }
    }

    #[cfg(test)]
    pub(crate) fn callback_count(&self) -> usize {
        self.state.callbacks.borrow().len()
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("reason", &self.state.reason.borrow())
            .field("callbacks", &self.state.callbacks.borrow().len())
            .finish()
    }
}

/// Aborts the operations observing its [`AbortSignal`].
///
/// # Example
///
/// ```rust
/// use event_bridge::{AbortController, Error, LocalEmitter, Options, wait_for};
/// use std::rc::Rc;
///
/// let emitter = Rc::new(LocalEmitter::<i32>::new());
/// let controller = AbortController::new();
///
/// let pending = wait_for(
///     &emitter,
///     "ready",
///     Options::new().signal(controller.signal()),
/// )
/// .unwrap();
/// assert_eq!(emitter.listener_count("ready"), 1);
///
/// controller.abort_with("shutting down");
/// assert_eq!(emitter.listener_count("ready"), 0);
///
/// let result = futures::executor::block_on(pending);
/// assert!(matches!(result, Err(Error::Aborted { .. })));
/// ```
#[derive(Debug)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Creates a controller whose signal has not been aborted.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signal: AbortSignal::new(None),
        }
    }

    /// Returns a signal observing this controller.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Aborts with the default reason. Does nothing if already aborted.
    pub fn abort(&self) {
        self.signal.abort(AbortReason::default());
    }

    /// Aborts with the given reason. Does nothing if already aborted.
    pub fn abort_with(&self, reason: impl Into<AbortReason>) {
        self.signal.abort(reason.into());
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}
