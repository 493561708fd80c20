//! Pulling events one at a time from an emitter.

use std::any::type_name;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::poll_fn;
use std::mem;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use futures::Stream;
use futures::stream::FusedStream;
use tracing::{debug, trace};

use crate::{
    AbortReason, Bound, Emitter, Error, EventName, EventNames, InvalidOption, Listener,
    ListenerBinding, Options, Payload, Result, Subscriptions,
};

/// The outcome of a successful request for the next value of an [`EventStream`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "a request either yields a value or observes the end"
)]
pub enum Step<V> {
    /// The next value in arrival order.
    Item(Payload<V>),

    /// The stream has ended. Carries the value given to [`EventStream::finish`], if any.
    Finished(Option<Payload<V>>),
}

impl<V> Step<V> {
    /// Whether this step marks the end of the stream.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    /// The value carried by the step, if any.
    #[must_use]
    pub fn into_value(self) -> Option<Payload<V>> {
        match self {
            Self::Item(payload) => Some(payload),
            Self::Finished(value) => value,
        }
    }
}

/// Turns the events of an emitter into a pull-based sequence of values.
///
/// Values of matching events that arrive while nobody is waiting are queued, and values are
/// always handed out in arrival order. The stream ends when:
///
/// * a resolution event fires (see [`Options::resolution_events`]), discarding queued values;
/// * [`Options::limit`] values have been handed out;
/// * [`EventStream::finish`] is called.
///
/// A rejection event or an aborted signal fails the stream instead. Every request after a
/// failure returns the same error. In all cases the listeners are removed from the emitter as
/// part of the transition.
///
/// # Errors
///
/// Returns [`Error::InvalidOption`] if `event_names` is empty, [`Error::IncompatibleEmitter`] if
/// the emitter lacks listener methods and [`Error::Aborted`] if the signal is already aborted.
/// Nothing is registered in any of these cases.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
///
/// use event_bridge::{LocalEmitter, Options, Payload, Step, stream};
/// use futures::executor::block_on;
///
/// let emitter = Rc::new(LocalEmitter::<&str>::new());
/// let mut clicks = stream(&emitter, "click", Options::new().limit(2_usize)).unwrap();
///
/// emitter.emit("click", &["x"]);
/// emitter.emit("click", &["y"]);
/// emitter.emit("click", &["z"]);
///
/// block_on(async {
///     assert_eq!(clicks.recv().await.unwrap(), Step::Item(Payload::from("x")));
///     assert_eq!(clicks.recv().await.unwrap(), Step::Item(Payload::from("y")));
///     assert_eq!(clicks.recv().await.unwrap(), Step::Finished(None));
/// });
///
/// assert_eq!(emitter.total_listener_count(), 0);
/// ```
pub fn stream<E: Emitter>(
    emitter: &Rc<E>,
    event_names: impl Into<EventNames>,
    options: Options<E::Value>,
) -> Result<EventStream<E>, E::Value> {
    let event_names = event_names.into();

    if event_names.is_empty() {
        return Err(InvalidOption::new("event_names", "at least one event name is required").into());
    }

    let binding = ListenerBinding::bind(emitter)?;

    if let Some(reason) = options.abort_signal().and_then(|signal| signal.reason()) {
        debug!(%reason, "signal already aborted, not subscribing");
        return Err(Error::Aborted { reason });
    }

    let state = Rc::new(RefCell::new(StreamState {
        phase: Phase::Active,
        queue: VecDeque::new(),
        slot: Slot::Empty,
        delivered: 0,
        limit: options.limit_bound(),
        subscriptions: Subscriptions::new(binding),
    }));

    let stream = EventStream {
        state: Rc::clone(&state),
        exhausted: false,
    };

    if options.limit_bound().is_reached(0) {
        debug!("limit of zero, stream finished before listening");
        state.borrow_mut().end(Phase::Finished);

        return Ok(stream);
    }

    let rejection_names = options.rejection_event_names().without(&[&event_names]);
    let resolution_names = options
        .resolution_event_names()
        .without(&[&event_names, &rejection_names]);

    let options = Rc::new(options);

    let mut state_mut = state.borrow_mut();
    let subscriptions = &mut state_mut.subscriptions;

    let weak = Rc::downgrade(&state);
    let accept_options = Rc::clone(&options);
    let offer: Listener<E::Value> = Rc::new(move |args: &[E::Value]| {
        let Some(state) = weak.upgrade() else {
            return;
        };

        if !state.borrow().is_active() {
            return;
        }

        let Some(payload) = accept_options.accept(args) else {
            trace!("event ignored by filter");
            return;
        };

        let waker = state.borrow_mut().offer(payload);
        wake(waker);
    });
    subscriptions.listen(&event_names, &offer);

    for rejection in &rejection_names {
        let weak = Rc::downgrade(&state);
        let event = rejection.clone();
        let multi_args = options.is_multi_args();

        let reject: Listener<E::Value> = Rc::new(move |args: &[E::Value]| {
            let Some(state) = weak.upgrade() else {
                return;
            };

            let waker = state.borrow_mut().fail(Error::RejectionEventFired {
                event: event.clone(),
                payload: Payload::pack(args, multi_args),
            });
            wake(waker);
        });
        subscriptions.listen([rejection], &reject);
    }

    for resolution in &resolution_names {
        let weak = Rc::downgrade(&state);
        let event = resolution.clone();

        let resolve: Listener<E::Value> = Rc::new(move |_: &[E::Value]| {
            let Some(state) = weak.upgrade() else {
                return;
            };

            let waker = state.borrow_mut().resolve(&event);
            wake(waker);
        });
        subscriptions.listen([resolution], &resolve);
    }

    if let Some(signal) = options.abort_signal() {
        let weak = Rc::downgrade(&state);
        subscriptions.watch_signal(
            signal,
            Rc::new(move |reason: &AbortReason| {
                let Some(state) = weak.upgrade() else {
                    return;
                };

                let waker = state.borrow_mut().fail(Error::Aborted {
                    reason: reason.clone(),
                });
                wake(waker);
            }),
        );
    }

    drop(state_mut);

    Ok(stream)
}

fn wake(waker: Option<Waker>) {
    if let Some(waker) = waker {
        waker.wake();
    }
}

fn finish_state<E: Emitter>(
    state: &RefCell<StreamState<E>>,
    value: Option<Payload<E::Value>>,
) -> Step<E::Value> {
    let waker = state.borrow_mut().finish(value.clone());
    wake(waker);

    Step::Finished(value)
}

#[derive(Debug)]
enum Phase<V: fmt::Debug> {
    Active,
    Finished,
    Failed(Error<V>),
}

/// The consumer side of the stream.
///
/// Never `Waiting` while the queue holds values.
#[derive(Debug)]
enum Slot<V> {
    Empty,
    Waiting(Waker),

    /// A request that was fulfilled while the consumer was waiting, not yet picked up.
    Ready(Step<V>),
}

struct StreamState<E: Emitter> {
    phase: Phase<E::Value>,
    queue: VecDeque<Payload<E::Value>>,
    slot: Slot<E::Value>,

    /// Values handed to the consumer, including one sitting in a `Ready` slot.
    delivered: usize,
    limit: Bound,

    subscriptions: Subscriptions<E>,
}

impl<E: Emitter> StreamState<E> {
    fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active)
    }

    /// Enters a terminal phase, removing listeners and discarding queued values.
    fn end(&mut self, phase: Phase<E::Value>) {
        self.phase = phase;
        self.subscriptions.teardown();

        if !self.queue.is_empty() {
            debug!(discarded = self.queue.len(), "discarding queued values");
            self.queue.clear();
        }
    }

    fn take_waiting(&mut self) -> Option<Waker> {
        match mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Waiting(waker) => Some(waker),
            other => {
                self.slot = other;
                None
            }
        }
    }

    fn mark_delivered(&mut self) {
        self.delivered = self.delivered.saturating_add(1);

        if self.limit.is_reached(self.delivered) {
            debug!(delivered = self.delivered, "limit reached, stream finished");
            self.end(Phase::Finished);
        }
    }

    #[must_use]
    fn offer(&mut self, payload: Payload<E::Value>) -> Option<Waker> {
        if !self.is_active() {
            return None;
        }

        if let Some(waker) = self.take_waiting() {
            debug_assert!(self.queue.is_empty(), "consumer waiting while values are queued");

            trace!("value handed to waiting consumer");
            self.slot = Slot::Ready(Step::Item(payload));
            self.mark_delivered();

            return Some(waker);
        }

        if self
            .limit
            .is_reached(self.delivered.saturating_add(self.queue.len()))
        {
            trace!("event beyond limit ignored");
            return None;
        }

        self.queue.push_back(payload);
        trace!(buffered = self.queue.len(), "value queued");

        None
    }

    #[must_use]
    fn fail(&mut self, error: Error<E::Value>) -> Option<Waker> {
        if !self.is_active() {
            return None;
        }

        debug!(%error, "stream failed");
        self.end(Phase::Failed(error));
        self.take_waiting()
    }

    #[must_use]
    fn resolve(&mut self, event: &EventName) -> Option<Waker> {
        if !self.is_active() {
            return None;
        }

        debug!(%event, "resolution event, stream finished");
        self.end(Phase::Finished);
        self.take_waiting()
    }

    #[must_use]
    fn finish(&mut self, value: Option<Payload<E::Value>>) -> Option<Waker> {
        debug!(with_value = value.is_some(), "finishing stream early");
        self.end(Phase::Finished);

        let waker = self.take_waiting()?;
        self.slot = Slot::Ready(Step::Finished(value));

        Some(waker)
    }

    fn poll_step(&mut self, cx: &mut Context<'_>) -> Poll<Result<Step<E::Value>, E::Value>> {
        if let Slot::Ready(step) = mem::replace(&mut self.slot, Slot::Empty) {
            return Poll::Ready(Ok(step));
        }

        match &self.phase {
            Phase::Failed(error) => return Poll::Ready(Err(error.clone())),
            Phase::Finished => return Poll::Ready(Ok(Step::Finished(None))),
            Phase::Active => {}
        }

        if let Some(payload) = self.queue.pop_front() {
            trace!(buffered = self.queue.len(), "value dequeued");
            self.mark_delivered();

            return Poll::Ready(Ok(Step::Item(payload)));
        }

        self.slot = Slot::Waiting(cx.waker().clone());

        Poll::Pending
    }
}

/// A pull-based sequence of event values. Created by [`stream`].
///
/// Values are requested with [`recv`][Self::recv] or through the [`Stream`] implementation.
/// Dropping the stream removes its listeners.
#[must_use = "streams do nothing unless polled"]
pub struct EventStream<E: Emitter> {
    state: Rc<RefCell<StreamState<E>>>,

    // Whether the `Stream` implementation has yielded its last item.
    exhausted: bool,
}

impl<E: Emitter> EventStream<E> {
    /// Requests the next value, waiting for an event if none is queued.
    ///
    /// Once the stream has finished, returns [`Step::Finished`]. Once it has failed, returns
    /// the failure, on this and every later call.
    pub async fn recv(&mut self) -> Result<Step<E::Value>, E::Value> {
        poll_fn(|cx| self.poll_recv(cx)).await
    }

    /// Polling form of [`recv`][Self::recv].
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Result<Step<E::Value>, E::Value>> {
        self.state.borrow_mut().poll_step(cx)
    }

    /// Finishes the stream at once, whatever its current state.
    ///
    /// Listeners are removed and queued values are discarded. A consumer waiting through a
    /// [`finisher`][Self::finisher] receives `Step::Finished(value)`; the same step is returned.
    pub fn finish(&mut self, value: Option<Payload<E::Value>>) -> Step<E::Value> {
        finish_state(&self.state, value)
    }

    /// A handle that can finish the stream from elsewhere, such as while a request is pending.
    pub fn finisher(&self) -> StreamFinisher<E> {
        StreamFinisher {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Whether the stream has stopped listening, either finished or failed.
    ///
    /// A value handed over just before the stream stopped may still be waiting to be received.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.state.borrow().is_active()
    }

    /// The number of values handed out so far.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.state.borrow().delivered
    }

    /// The number of values queued and not yet requested.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.state.borrow().queue.len()
    }
}

impl<E: Emitter> Stream for EventStream<E> {
    type Item = Result<Payload<E::Value>, E::Value>;

    /// Yields values until the stream finishes. A failure is yielded once, after which the
    /// stream ends.
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.exhausted {
            return Poll::Ready(None);
        }

        this.poll_recv(cx).map(|step| match step {
            Ok(Step::Item(payload)) => Some(Ok(payload)),
            Ok(Step::Finished(_)) => {
                this.exhausted = true;
                None
            }
            Err(error) => {
                this.exhausted = true;
                Some(Err(error))
            }
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            return (0, Some(0));
        }

        (self.queued_len(), None)
    }
}

impl<E: Emitter> FusedStream for EventStream<E> {
    fn is_terminated(&self) -> bool {
        self.exhausted
    }
}

impl<E: Emitter> Drop for EventStream<E> {
    fn drop(&mut self) {
        self.state.borrow_mut().subscriptions.teardown();
    }
}

impl<E: Emitter> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();

        f.debug_struct(type_name::<Self>())
            .field("phase", &state.phase)
            .field("buffered", &state.queue.len())
            .field("slot", &state.slot)
            .field("delivered", &state.delivered)
            .field("limit", &state.limit)
            .finish_non_exhaustive()
    }
}

/// Finishes an [`EventStream`] from outside of it. Obtained from [`EventStream::finisher`].
///
/// Does not keep the stream alive.
pub struct StreamFinisher<E: Emitter> {
    state: Weak<RefCell<StreamState<E>>>,
}

impl<E: Emitter> StreamFinisher<E> {
    /// Same as [`EventStream::finish`]. Does nothing to the stream if it has been dropped.
    pub fn finish(&self, value: Option<Payload<E::Value>>) -> Step<E::Value> {
        match self.state.upgrade() {
            Some(state) => finish_state(&state, value),
            None => Step::Finished(value),
        }
    }
}

impl<E: Emitter> Clone for StreamFinisher<E> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

impl<E: Emitter> fmt::Debug for StreamFinisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("stream_alive", &(self.state.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::pin::pin;

    use futures::StreamExt;
    use futures::executor::{LocalPool, block_on};
    use futures::task::{LocalSpawnExt, noop_waker_ref};
    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::test_utils::{AppendOnlyEmitter, DomEmitter, local_emitter};
    use crate::{AbortController, AbortSignal, LocalEmitter};

    assert_not_impl_any!(EventStream<LocalEmitter<i32>>: Send, Sync);
    assert_not_impl_any!(StreamFinisher<LocalEmitter<i32>>: Send, Sync);

    fn poll_step<E: Emitter>(stream: &mut EventStream<E>) -> Poll<Result<Step<E::Value>, E::Value>> {
        let mut cx = Context::from_waker(noop_waker_ref());
        stream.poll_recv(&mut cx)
    }

    fn item(value: &'static str) -> Step<&'static str> {
        Step::Item(Payload::from(value))
    }

    #[test]
    fn queued_values_are_delivered_in_firing_order() {
        let emitter = local_emitter::<&'static str>();
        let mut events = stream(&emitter, "data", Options::new()).unwrap();

        emitter.emit("data", &["x"]);
        emitter.emit("data", &["y"]);
        emitter.emit("data", &["z"]);
        assert_eq!(events.queued_len(), 3);

        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(item("x"))));
        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(item("y"))));
        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(item("z"))));
        assert!(poll_step(&mut events).is_pending());

        emitter.emit("data", &["w"]);
        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(item("w"))));
        assert_eq!(events.delivered(), 4);
    }

    #[test]
    fn waiting_requests_are_satisfied_in_order() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(&emitter, "n", Options::new()).unwrap();
        let received = Rc::new(RefCell::new(Vec::new()));

        let mut pool = LocalPool::new();
        let received_clone = Rc::clone(&received);
        pool.spawner()
            .spawn_local(async move {
                for _ in 0..3 {
                    let step = events.recv().await.unwrap();
                    received_clone.borrow_mut().push(step);
                }
            })
            .unwrap();

        pool.run_until_stalled();
        assert!(received.borrow().is_empty());

        for value in 1..=4 {
            emitter.emit("n", &[value]);
            pool.run_until_stalled();
        }

        assert_eq!(
            *received.borrow(),
            [
                Step::Item(Payload::from(1)),
                Step::Item(Payload::from(2)),
                Step::Item(Payload::from(3)),
            ]
        );
    }

    #[test]
    fn limit_finishes_on_last_delivery() {
        let emitter = local_emitter::<&'static str>();
        let mut events = stream(&emitter, "data", Options::new().limit(2_usize)).unwrap();

        emitter.emit("data", &["x"]);
        emitter.emit("data", &["y"]);
        emitter.emit("data", &["z"]);
        assert_eq!(events.queued_len(), 2);

        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(item("x"))));
        assert!(!events.is_finished());

        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(item("y"))));
        assert!(events.is_finished());
        assert_eq!(emitter.total_listener_count(), 0);

        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(Step::Finished(None))));
        assert_eq!(events.delivered(), 2);
    }

    #[test]
    fn limit_reached_by_direct_hand_over() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(&emitter, "n", Options::new().limit(1_usize)).unwrap();

        assert!(poll_step(&mut events).is_pending());
        emitter.emit("n", &[7]);

        assert!(events.is_finished());
        assert_eq!(emitter.total_listener_count(), 0);

        assert_eq!(
            poll_step(&mut events),
            Poll::Ready(Ok(Step::Item(Payload::from(7))))
        );
        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(Step::Finished(None))));
    }

    #[test]
    fn zero_limit_finishes_without_listening() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(&emitter, "n", Options::new().limit(0_usize)).unwrap();

        assert_eq!(emitter.total_listener_count(), 0);
        assert!(events.is_finished());
        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(Step::Finished(None))));
    }

    #[test]
    fn rejection_fails_every_later_request() {
        let emitter = local_emitter::<&'static str>();
        let mut events = stream(&emitter, "data", Options::new()).unwrap();

        emitter.emit("data", &["x"]);
        emitter.emit("error", &["boom"]);
        assert_eq!(emitter.total_listener_count(), 0);
        assert_eq!(events.queued_len(), 0);

        let expected = Error::RejectionEventFired {
            event: EventName::from("error"),
            payload: Payload::from("boom"),
        };
        assert_eq!(poll_step(&mut events), Poll::Ready(Err(expected.clone())));
        assert_eq!(poll_step(&mut events), Poll::Ready(Err(expected)));
    }

    #[test]
    fn rejection_fails_waiting_request() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(
            &emitter,
            "n",
            Options::new().rejection_events("fail").multi_args(true),
        )
        .unwrap();

        let mut request = pin!(events.recv());
        let mut cx = Context::from_waker(noop_waker_ref());
        assert!(request.as_mut().poll(&mut cx).is_pending());

        emitter.emit("fail", &[1, 2]);

        let Poll::Ready(result) = request.as_mut().poll(&mut cx) else {
            panic!("the pending request should have failed");
        };
        assert_eq!(
            result.unwrap_err().rejection_payload(),
            Some(&Payload::All(vec![1, 2]))
        );
    }

    #[test]
    fn resolution_discards_backlog() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(&emitter, "n", Options::new().resolution_events("end")).unwrap();

        emitter.emit("n", &[1]);
        emitter.emit("n", &[2]);
        emitter.emit("end", &[]);

        assert_eq!(emitter.total_listener_count(), 0);
        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(Step::Finished(None))));
    }

    #[test]
    fn resolution_finishes_waiting_request() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(&emitter, "n", Options::new().resolution_events("end")).unwrap();

        assert!(poll_step(&mut events).is_pending());
        emitter.emit("end", &[]);

        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(Step::Finished(None))));
    }

    #[test]
    fn finish_removes_listeners_and_returns_value() {
        let emitter = local_emitter::<&'static str>();
        let mut events = stream(&emitter, ["a", "b"], Options::new()).unwrap();
        emitter.emit("a", &["queued"]);
        assert_eq!(emitter.total_listener_count(), 3);

        let step = events.finish(Some(Payload::from("bye")));

        assert_eq!(step, Step::Finished(Some(Payload::from("bye"))));
        assert_eq!(emitter.total_listener_count(), 0);
        assert_eq!(events.queued_len(), 0);
        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(Step::Finished(None))));
    }

    #[test]
    fn finisher_fulfils_waiting_request() {
        let emitter = local_emitter::<&'static str>();
        let mut events = stream(&emitter, "a", Options::new()).unwrap();
        let finisher = events.finisher();

        assert!(poll_step(&mut events).is_pending());
        finisher.clone().finish(Some(Payload::from("done")));

        assert_eq!(
            poll_step(&mut events),
            Poll::Ready(Ok(Step::Finished(Some(Payload::from("done")))))
        );
        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(Step::Finished(None))));
    }

    #[test]
    fn finish_overrides_failure() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(&emitter, "n", Options::new()).unwrap();
        emitter.emit("error", &[0]);

        events.finish(None);

        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(Step::Finished(None))));
    }

    #[test]
    fn finisher_outliving_stream_does_nothing() {
        let emitter = local_emitter::<i32>();
        let events = stream(&emitter, "n", Options::new()).unwrap();
        let finisher = events.finisher();

        drop(events);

        assert_eq!(finisher.finish(None), Step::Finished(None));
        assert_eq!(emitter.total_listener_count(), 0);
    }

    #[test]
    fn filter_passes_only_matching_events() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(
            &emitter,
            "n",
            Options::filtered(|payload: &Payload<i32>| payload.first() == Some(&3)),
        )
        .unwrap();

        for value in 1..=5 {
            emitter.emit("n", &[value]);
        }

        assert_eq!(events.queued_len(), 1);
        assert_eq!(
            poll_step(&mut events),
            Poll::Ready(Ok(Step::Item(Payload::from(3))))
        );
        assert!(poll_step(&mut events).is_pending());
    }

    #[test]
    fn acceptance_outranks_rejection_and_rejection_outranks_resolution() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(
            &emitter,
            ["n", "error"],
            Options::new()
                .rejection_events(["error", "bad"])
                .resolution_events(["bad", "end"]),
        )
        .unwrap();

        emitter.emit("error", &[1]);
        assert_eq!(
            poll_step(&mut events),
            Poll::Ready(Ok(Step::Item(Payload::from(1))))
        );

        emitter.emit("bad", &[2]);
        assert!(matches!(
            poll_step(&mut events),
            Poll::Ready(Err(Error::RejectionEventFired { .. }))
        ));
    }

    #[test]
    fn abort_fails_stream() {
        let emitter = local_emitter::<i32>();
        let controller = AbortController::new();
        let mut events = stream(&emitter, "n", Options::new().signal(controller.signal())).unwrap();

        assert!(poll_step(&mut events).is_pending());
        controller.abort_with("stop");

        assert_eq!(emitter.total_listener_count(), 0);
        for _ in 0..2 {
            let Poll::Ready(Err(Error::Aborted { reason })) = poll_step(&mut events) else {
                panic!("expected the stream to be aborted");
            };
            assert_eq!(reason.as_str(), "stop");
        }
    }

    #[test]
    fn pre_aborted_signal_is_rejected_synchronously() {
        let emitter = local_emitter::<i32>();

        let error = stream(&emitter, "n", Options::new().signal(AbortSignal::aborted("early")))
            .unwrap_err();

        assert!(matches!(error, Error::Aborted { .. }));
        assert_eq!(emitter.total_listener_count(), 0);
    }

    #[test]
    fn validation_errors_register_nothing() {
        let emitter = local_emitter::<i32>();
        assert!(matches!(
            stream(&emitter, Vec::<&'static str>::new(), Options::new()),
            Err(Error::InvalidOption(_))
        ));
        assert_eq!(emitter.total_listener_count(), 0);

        let append_only = Rc::new(AppendOnlyEmitter::default());
        assert!(matches!(
            stream(&append_only, "n", Options::new()),
            Err(Error::IncompatibleEmitter(_))
        ));
        assert_eq!(append_only.registered(), 0);
    }

    #[test]
    fn dropping_stream_removes_listeners() {
        let emitter = local_emitter::<i32>();
        let events = stream(
            &emitter,
            ["a", "b"],
            Options::new().resolution_events("end"),
        )
        .unwrap();
        assert_eq!(emitter.total_listener_count(), 4);

        drop(events);

        assert_eq!(emitter.total_listener_count(), 0);
    }

    #[test]
    fn works_with_dom_style_emitter() {
        let emitter = Rc::new(DomEmitter::default());
        let mut events = stream(&emitter, "message", Options::new().limit(1_usize)).unwrap();
        assert_eq!(emitter.listener_count("message"), 1);

        emitter.dispatch("message", "hi");

        assert_eq!(poll_step(&mut events), Poll::Ready(Ok(item("hi"))));
        assert_eq!(emitter.listener_count("message"), 0);
    }

    #[test]
    fn stream_trait_ends_on_resolution() {
        let emitter = local_emitter::<i32>();
        let events = stream(&emitter, "n", Options::new().resolution_events("end")).unwrap();

        emitter.emit("n", &[1]);
        emitter.emit("end", &[]);

        let collected: Vec<_> = block_on(events.collect());
        assert!(collected.is_empty());

        let emitter = local_emitter::<i32>();
        let mut events = stream(&emitter, "n", Options::new().limit(2_usize)).unwrap();
        emitter.emit("n", &[1]);
        emitter.emit("n", &[2]);

        assert_eq!(block_on(events.next()), Some(Ok(Payload::from(1))));
        assert_eq!(block_on(events.next()), Some(Ok(Payload::from(2))));
        assert_eq!(block_on(events.next()), None);
        assert!(events.is_terminated());
    }

    #[test]
    fn stream_trait_yields_failure_once() {
        let emitter = local_emitter::<i32>();
        let mut events = stream(&emitter, "n", Options::new()).unwrap();

        emitter.emit("n", &[1]);
        let first = block_on(events.next());
        emitter.emit("error", &[9]);

        let rest: Vec<_> = block_on((&mut events).collect());

        assert_eq!(first, Some(Ok(Payload::from(1))));
        assert_eq!(rest.len(), 1);
        assert!(matches!(rest[0], Err(Error::RejectionEventFired { .. })));
        assert!(events.is_terminated());
    }
}
