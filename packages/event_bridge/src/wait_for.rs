//! Waiting for a single event.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::{debug, trace};

use crate::{
    AbortReason, Deadline, Emitter, Error, EventNames, InvalidOption, Listener, ListenerBinding,
    Options, Payload, Result, Subscriptions,
};

/// Waits for the first matching occurrence of any of the named events.
///
/// The returned future resolves with the packed value of the first accepted event, or fails with
/// [`Error::RejectionEventFired`] if one of the rejection events (by default `"error"`) is emitted
/// first. Either way, every listener it registered is removed before it resolves. Dropping the
/// future before that also removes its listeners.
///
/// If an event name appears both in `event_names` and in the rejection events, it is treated as
/// an accepted event.
///
/// # Errors
///
/// Returns [`Error::InvalidOption`] if `event_names` is empty and [`Error::IncompatibleEmitter`]
/// if the emitter lacks listener methods. Nothing is registered in either case.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
///
/// use event_bridge::{LocalEmitter, Options, Payload, wait_for};
/// use futures::executor::block_on;
///
/// let emitter = Rc::new(LocalEmitter::<&str>::new());
/// let ready = wait_for(&emitter, "ready", Options::new()).unwrap();
///
/// emitter.emit("ready", &["🌈"]);
///
/// assert_eq!(block_on(ready).unwrap(), Payload::from("🌈"));
/// assert_eq!(emitter.listener_count("ready"), 0);
/// ```
pub fn wait_for<E: Emitter>(
    emitter: &Rc<E>,
    event_names: impl Into<EventNames>,
    options: Options<E::Value>,
) -> Result<WaitFor<E>, E::Value> {
    let event_names = event_names.into();

    if event_names.is_empty() {
        return Err(InvalidOption::new("event_names", "at least one event name is required").into());
    }

    let binding = ListenerBinding::bind(emitter)?;

    let state = Rc::new(RefCell::new(WaitState {
        outcome: Outcome::Pending,
        waker: None,
        subscriptions: Subscriptions::new(binding),
    }));

    if let Some(reason) = options.abort_signal().and_then(|signal| signal.reason()) {
        debug!(%reason, "signal already aborted, not subscribing");
        state.borrow_mut().outcome = Outcome::Settled(Err(Error::Aborted { reason }));

        return Ok(WaitFor {
            state,
            deadline: None,
        });
    }

    let deadline = options.timeout_duration().map(Deadline::after);
    let options = Rc::new(options);

    {
        let mut state_mut = state.borrow_mut();
        let subscriptions = &mut state_mut.subscriptions;

        let weak = Rc::downgrade(&state);
        let accept_options = Rc::clone(&options);
        let resolve: Listener<E::Value> = Rc::new(move |args: &[E::Value]| {
            let Some(state) = weak.upgrade() else {
                return;
            };

            if !state.borrow().is_pending() {
                return;
            }

            // The filter is user code, so it runs without any borrow of our state held.
            let Some(payload) = accept_options.accept(args) else {
                trace!("event ignored by filter");
                return;
            };

            settle(&state, Ok(payload));
        });
        subscriptions.listen(&event_names, &resolve);

        for rejection in options.rejection_event_names().without(&[&event_names]).iter() {
            let weak = Rc::downgrade(&state);
            let event = rejection.clone();
            let multi_args = options.is_multi_args();

            let reject: Listener<E::Value> = Rc::new(move |args: &[E::Value]| {
                if let Some(state) = weak.upgrade() {
                    let payload = Payload::pack(args, multi_args);
                    settle(
                        &state,
                        Err(Error::RejectionEventFired {
                            event: event.clone(),
                            payload,
                        }),
                    );
                }
            });
            subscriptions.listen([rejection], &reject);
        }

        if let Some(signal) = options.abort_signal() {
            let weak = Rc::downgrade(&state);
            subscriptions.watch_signal(
                signal,
                Rc::new(move |reason: &AbortReason| {
                    if let Some(state) = weak.upgrade() {
                        settle(
                            &state,
                            Err(Error::Aborted {
                                reason: reason.clone(),
                            }),
                        );
                    }
                }),
            );
        }
    }

    Ok(WaitFor { state, deadline })
}

fn settle<E: Emitter>(
    state: &Rc<RefCell<WaitState<E>>>,
    result: Result<Payload<E::Value>, E::Value>,
) {
    let waker = state.borrow_mut().settle(result);

    if let Some(waker) = waker {
        waker.wake();
    }
}

enum Outcome<V: fmt::Debug> {
    /// Listening for events.
    Pending,

    /// An event decided the result but the future has not yet returned it.
    Settled(Result<Payload<V>, V>),

    /// The future has returned its result.
    Consumed,

    /// The caller cancelled the wait; the future never completes.
    Cancelled,
}

struct WaitState<E: Emitter> {
    outcome: Outcome<E::Value>,
    waker: Option<Waker>,
    subscriptions: Subscriptions<E>,
}

impl<E: Emitter> WaitState<E> {
    fn is_pending(&self) -> bool {
        matches!(self.outcome, Outcome::Pending)
    }

    /// Removes all listeners and stores the result, returning the waker to wake, if any.
    #[must_use]
    fn settle(&mut self, result: Result<Payload<E::Value>, E::Value>) -> Option<Waker> {
        if !self.is_pending() {
            return None;
        }

        match &result {
            Ok(_) => trace!("event received"),
            Err(error) => debug!(%error, "wait failed"),
        }

        self.subscriptions.teardown();
        self.outcome = Outcome::Settled(result);
        self.waker.take()
    }
}

/// A future that resolves with the first matching event. Created by [`wait_for`].
///
/// The future owns the listeners it registered: they are removed when it resolves, when
/// [`WaitFor::cancel`] is called or when it is dropped.
///
/// # Panics
///
/// Polling the future again after it has returned `Ready` panics.
#[must_use = "futures do nothing unless polled"]
pub struct WaitFor<E: Emitter> {
    state: Rc<RefCell<WaitState<E>>>,
    deadline: Option<Deadline>,
}

impl<E: Emitter> WaitFor<E> {
    /// Removes all listeners without resolving the future.
    ///
    /// After cancellation the future never completes, including by timing out; do not await it
    /// afterwards. Calling this after the future has resolved does nothing.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();

        if state.is_pending() {
            debug!("wait cancelled");

            state.subscriptions.teardown();
            state.outcome = Outcome::Cancelled;
            state.waker = None;
        }
    }
}

impl<E: Emitter> Future for WaitFor<E> {
    type Output = Result<Payload<E::Value>, E::Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        {
            let mut state = this.state.borrow_mut();

            match mem::replace(&mut state.outcome, Outcome::Consumed) {
                Outcome::Settled(result) => return Poll::Ready(result),
                Outcome::Consumed => panic!("WaitFor polled after completion"),
                Outcome::Cancelled => {
                    state.outcome = Outcome::Cancelled;
                    return Poll::Pending;
                }
                Outcome::Pending => {
                    state.outcome = Outcome::Pending;
                    state.waker = Some(cx.waker().clone());
                }
            }
        }

        let Some(deadline) = &mut this.deadline else {
            return Poll::Pending;
        };

        if deadline.poll_expired(cx).is_pending() {
            return Poll::Pending;
        }

        let duration = deadline.duration();
        debug!(?duration, "timed out waiting for event");

        let mut state = this.state.borrow_mut();
        state.subscriptions.teardown();
        state.outcome = Outcome::Consumed;
        state.waker = None;

        Poll::Ready(Err(Error::TimedOut { duration }))
    }
}

impl<E: Emitter> Drop for WaitFor<E> {
    fn drop(&mut self) {
        self.state.borrow_mut().subscriptions.teardown();
    }
}

impl<E: Emitter> fmt::Debug for WaitFor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();

        f.debug_struct(type_name::<Self>())
            .field("pending", &state.is_pending())
            .field("subscriptions", &state.subscriptions)
            .field("deadline", &self.deadline)
            .finish()
    }
}
