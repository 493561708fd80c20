//! Collecting a number of events into a list.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::{debug, trace};

use crate::{
    AbortReason, Bound, Deadline, Emitter, Error, EventNames, InvalidOption, Listener,
    ListenerBinding, Options, Payload, Result, Subscriptions,
};

/// Collects the values of `count` matching events (see [`Options::count`]).
///
/// By default the returned future resolves once `count` events have been accepted, at which point
/// every listener has already been removed. With [`Options::resolve_immediately`] the future
/// resolves at once and the returned [`Collected`] list keeps growing in place as events arrive,
/// until `count` is reached.
///
/// A rejection event fails the future if it has not resolved yet. After an immediate resolution,
/// a rejection event only stops the collection.
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
/// use event_bridge::{LocalEmitter, Options, Payload, collect};
/// use futures::executor::block_on;
///
/// let emitter = Rc::new(LocalEmitter::<&str>::new());
/// let greetings = collect(
///     &emitter,
///     "hello",
///     Options::new().count(usize::MAX).resolve_immediately(true),
/// )
/// .unwrap();
///
/// let names = block_on(greetings).unwrap();
/// assert!(names.is_empty());
///
/// emitter.emit("hello", &["Jack"]);
/// emitter.emit("hello", &["Mark"]);
/// assert_eq!(names.to_vec(), [Payload::from("Jack"), Payload::from("Mark")]);
///
/// // Stops listening.
/// emitter.emit("error", &["😿"]);
/// emitter.emit("hello", &["John"]);
/// assert_eq!(names.len(), 2);
/// ```
pub fn collect<E: Emitter>(
    emitter: &Rc<E>,
    event_names: impl Into<EventNames>,
    options: Options<E::Value>,
) -> Result<Collect<E>, E::Value> {
    let event_names = event_names.into();

    if event_names.is_empty() {
        return Err(InvalidOption::new("event_names", "at least one event name is required").into());
    }

    let binding = ListenerBinding::bind(emitter)?;

    let state = Rc::new(RefCell::new(CollectState {
        items: Vec::new(),
        count: options.count_bound(),
        failure: None,
        cancelled: false,
        handed_over: options.is_resolve_immediately(),
        waker: None,
        subscriptions: Subscriptions::new(binding),
    }));

    let mut collect = Collect {
        state: Some(Rc::clone(&state)),
        resolve_immediately: options.is_resolve_immediately(),
        deadline: None,
    };

    if let Some(reason) = options.abort_signal().and_then(|signal| signal.reason()) {
        debug!(%reason, "signal already aborted, not subscribing");

        let mut state = state.borrow_mut();
        state.subscriptions.teardown();
        state.failure = Some(Error::Aborted { reason });

        return Ok(collect);
    }

    if state.borrow().is_complete() {
        // Nothing to wait for: a count of zero is satisfied by the empty list.
        state.borrow_mut().subscriptions.teardown();

        return Ok(collect);
    }

    collect.deadline = options.timeout_duration().map(Deadline::after);
    let options = Rc::new(options);

    {
        let mut state_mut = state.borrow_mut();
        let subscriptions = &mut state_mut.subscriptions;

        let weak = Rc::downgrade(&state);
        let accept_options = Rc::clone(&options);
        let append: Listener<E::Value> = Rc::new(move |args: &[E::Value]| {
            let Some(state) = weak.upgrade() else {
                return;
            };

            if !state.borrow().is_listening() {
                return;
            }

            let Some(payload) = accept_options.accept(args) else {
                trace!("event ignored by filter");
                return;
            };

            let waker = state.borrow_mut().append(payload);

            if let Some(waker) = waker {
                waker.wake();
            }
        });
        subscriptions.listen(&event_names, &append);

        for rejection in options.rejection_event_names().without(&[&event_names]).iter() {
            let weak = Rc::downgrade(&state);
            let event = rejection.clone();
            let multi_args = options.is_multi_args();

            let reject: Listener<E::Value> = Rc::new(move |args: &[E::Value]| {
                if let Some(state) = weak.upgrade() {
                    fail(
                        &state,
                        Error::RejectionEventFired {
                            event: event.clone(),
                            payload: Payload::pack(args, multi_args),
                        },
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
                        fail(
                            &state,
                            Error::Aborted {
                                reason: reason.clone(),
                            },
                        );
                    }
                }),
            );
        }
    }

    Ok(collect)
}

fn fail<E: Emitter>(state: &Rc<RefCell<CollectState<E>>>, error: Error<E::Value>) {
    let waker = state.borrow_mut().fail(error);

    if let Some(waker) = waker {
        waker.wake();
    }
}

struct CollectState<E: Emitter> {
    items: Vec<Payload<E::Value>>,
    count: Bound,

    /// Set when the collection failed before the future resolved; taken by the future.
    failure: Option<Error<E::Value>>,

    cancelled: bool,

    /// Whether the future has resolved, handing the list to a [`Collected`].
    handed_over: bool,

    waker: Option<Waker>,
    subscriptions: Subscriptions<E>,
}

impl<E: Emitter> CollectState<E> {
    fn is_listening(&self) -> bool {
        !self.subscriptions.is_torn_down()
    }

    fn is_complete(&self) -> bool {
        self.count.is_reached(self.items.len())
    }

    #[must_use]
    fn append(&mut self, payload: Payload<E::Value>) -> Option<Waker> {
        if !self.is_listening() {
            return None;
        }

        self.items.push(payload);
        trace!(collected = self.items.len(), "event collected");

        if !self.is_complete() {
            return None;
        }

        debug!(collected = self.items.len(), "collection complete");
        self.subscriptions.teardown();
        self.waker.take()
    }

    #[must_use]
    fn fail(&mut self, error: Error<E::Value>) -> Option<Waker> {
        if !self.is_listening() {
            return None;
        }

        self.subscriptions.teardown();

        if self.handed_over {
            debug!(%error, "collection stopped");
            return None;
        }

        debug!(%error, "collection failed");
        self.failure = Some(error);
        self.waker.take()
    }

    fn stop(&mut self) {
        if self.is_listening() {
            debug!(collected = self.items.len(), "collection cancelled");
            self.subscriptions.teardown();
        }
    }
}

/// A future that resolves with a [`Collected`] list. Created by [`collect`].
///
/// Dropping the future before it resolves removes its listeners.
///
/// # Panics
///
/// Polling the future again after it has returned `Ready` panics.
#[must_use = "futures do nothing unless polled"]
pub struct Collect<E: Emitter> {
    // `None` once the future has resolved.
    state: Option<Rc<RefCell<CollectState<E>>>>,
    resolve_immediately: bool,
    deadline: Option<Deadline>,
}

impl<E: Emitter> Collect<E> {
    /// Removes all listeners without resolving the future.
    ///
    /// After cancellation the future never completes, including by timing out. Calling this
    /// after the future has resolved does nothing; use [`Collected::cancel`] instead.
    pub fn cancel(&self) {
        if let Some(state) = &self.state {
            let mut state = state.borrow_mut();
            state.stop();
            state.cancelled = true;
            state.waker = None;
        }
    }
}

impl<E: Emitter> Future for Collect<E> {
    type Output = Result<Collected<E>, E::Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let Some(state_rc) = &this.state else {
            panic!("Collect polled after completion");
        };

        let ready = {
            let mut state = state_rc.borrow_mut();

            if state.cancelled {
                return Poll::Pending;
            }

            if let Some(error) = state.failure.take() {
                Some(Err(error))
            } else if this.resolve_immediately || state.is_complete() {
                state.handed_over = true;
                state.waker = None;
                Some(Ok(()))
            } else {
                state.waker = Some(cx.waker().clone());
                None
            }
        };

        match ready {
            Some(Err(error)) => {
                this.state = None;
                return Poll::Ready(Err(error));
            }
            Some(Ok(())) => {
                if let Some(state) = this.state.take() {
                    return Poll::Ready(Ok(Collected { state }));
                }
            }
            None => {}
        }

        let Some(deadline) = &mut this.deadline else {
            return Poll::Pending;
        };

        if deadline.poll_expired(cx).is_pending() {
            return Poll::Pending;
        }

        let duration = deadline.duration();
        debug!(?duration, "timed out collecting events");

        if let Some(state) = this.state.take() {
            state.borrow_mut().stop();
        }

        Poll::Ready(Err(Error::TimedOut { duration }))
    }
}

impl<E: Emitter> Drop for Collect<E> {
    fn drop(&mut self) {
        if let Some(state) = &self.state {
            state.borrow_mut().stop();
        }
    }
}

impl<E: Emitter> fmt::Debug for Collect<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("resolved", &self.state.is_none())
            .field("resolve_immediately", &self.resolve_immediately)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// The list of values gathered by [`collect`].
///
/// While the collection is still listening (only possible after an immediate resolution), the
/// list grows as matching events arrive. Dropping the list or calling [`Collected::cancel`]
/// stops the collection.
pub struct Collected<E: Emitter> {
    state: Rc<RefCell<CollectState<E>>>,
}

impl<E: Emitter> Collected<E> {
    /// The number of values collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    /// Whether no values have been collected yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().items.is_empty()
    }

    /// The value at the given position, if collected.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Payload<E::Value>> {
        self.state.borrow().items.get(index).cloned()
    }

    /// A copy of the values collected so far, in arrival order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Payload<E::Value>> {
        self.state.borrow().items.clone()
    }

    /// Stops the collection and returns the values collected so far.
    #[must_use]
    pub fn into_vec(self) -> Vec<Payload<E::Value>> {
        let mut state = self.state.borrow_mut();
        state.stop();
        mem::take(&mut state.items)
    }

    /// Whether new matching events are still being appended.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state.borrow().is_listening()
    }

    /// Stops the collection, removing all listeners. The values collected so far remain.
    pub fn cancel(&self) {
        self.state.borrow_mut().stop();
    }
}

impl<E: Emitter> Drop for Collected<E> {
    fn drop(&mut self) {
        self.state.borrow_mut().stop();
    }
}

impl<E: Emitter> fmt::Debug for Collected<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();

        f.debug_struct(type_name::<Self>())
            .field("items", &state.items)
            .field("count", &state.count)
            .field("listening", &state.is_listening())
            .finish()
    }
}
