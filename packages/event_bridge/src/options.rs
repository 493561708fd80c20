use std::any::type_name;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::{AbortSignal, EventName, EventNames, InvalidOption, Payload};

/// The rejection event used when the caller does not configure any.
pub const DEFAULT_REJECTION_EVENT: EventName = EventName::from_static("error");

/// A predicate deciding whether an event is accepted.
pub type Filter<V> = Rc<dyn Fn(&Payload<V>) -> bool>;

/// An upper bound on a number of events, possibly unbounded.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "a bound is either a number or absent"
)]
pub enum Bound {
    /// At most this many.
    Finite(usize),

    /// No upper bound.
    #[default]
    Unbounded,
}

impl Bound {
    /// Whether `n` has reached the bound.
    #[must_use]
    pub fn is_reached(self, n: usize) -> bool {
        match self {
            Self::Finite(bound) => n >= bound,
            Self::Unbounded => false,
        }
    }

    fn from_signed(option: &'static str, value: i64) -> Result<Self, InvalidOption> {
        usize::try_from(value).map(Self::Finite).map_err(|_| {
            InvalidOption::new(
                option,
                format!("expected a number at least 0 but got {value}"),
            )
        })
    }
}

impl From<usize> for Bound {
    fn from(value: usize) -> Self {
        Self::Finite(value)
    }
}

/// Configuration shared by the event adapters.
///
/// Each adapter reads the options that apply to it and ignores the rest:
///
/// | option                  | [`wait_for`][crate::wait_for] | [`collect`][crate::collect] | [`stream`][crate::stream] |
/// |-------------------------|:---:|:---:|:---:|
/// | `multi_args`            | ✓ | ✓ | ✓ |
/// | `filter`                | ✓ | ✓ | ✓ |
/// | `rejection_events`      | ✓ | ✓ | ✓ |
/// | `resolution_events`     |   |   | ✓ |
/// | `limit`                 |   |   | ✓ |
/// | `count`                 |   | ✓ |   |
/// | `resolve_immediately`   |   | ✓ |   |
/// | `timeout`               | ✓ | ✓ |   |
/// | `signal`                | ✓ | ✓ | ✓ |
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use event_bridge::{Options, Payload};
///
/// let options = Options::<u32>::new()
///     .filter(|payload: &Payload<u32>| payload.first().is_some_and(|value| *value > 3))
///     .rejection_events(["error", "close"])
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct Options<V> {
    multi_args: bool,
    filter: Option<Filter<V>>,
    rejection_events: EventNames,
    resolution_events: EventNames,
    limit: Bound,
    count: Bound,
    resolve_immediately: bool,
    timeout: Option<Duration>,
    signal: Option<AbortSignal>,
}

impl<V> Options<V> {
    /// Creates options with every setting at its default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi_args: false,
            filter: None,
            rejection_events: EventNames::from(DEFAULT_REJECTION_EVENT),
            resolution_events: EventNames::new(),
            limit: Bound::Unbounded,
            count: Bound::Unbounded,
            resolve_immediately: false,
            timeout: None,
            signal: None,
        }
    }

    /// Shorthand for options that only set a filter.
    #[must_use]
    pub fn filtered(filter: impl Fn(&Payload<V>) -> bool + 'static) -> Self {
        Self::new().filter(filter)
    }

    /// Whether to pack every callback argument into the produced value instead of only the first.
    ///
    /// Also applies to the payload of rejection events. Defaults to `false`.
    #[must_use]
    pub fn multi_args(mut self, multi_args: bool) -> Self {
        self.multi_args = multi_args;
        self
    }

    /// Only accepts events whose packed value satisfies the predicate.
    ///
    /// Events that do not match are ignored entirely: they are neither delivered nor counted.
    #[must_use]
    pub fn filter(mut self, filter: impl Fn(&Payload<V>) -> bool + 'static) -> Self {
        self.filter = Some(Rc::new(filter));
        self
    }

    /// Events that fail the operation. Defaults to `["error"]`.
    ///
    /// A name that is also one of the accepted event names is treated as accepted.
    #[must_use]
    pub fn rejection_events(mut self, events: impl Into<EventNames>) -> Self {
        self.rejection_events = events.into();
        self
    }

    /// Events that end a stream successfully. Defaults to none.
    #[must_use]
    pub fn resolution_events(mut self, events: impl Into<EventNames>) -> Self {
        self.resolution_events = events.into();
        self
    }

    /// The maximum number of values a stream delivers before it finishes.
    #[must_use]
    pub fn limit(mut self, limit: impl Into<Bound>) -> Self {
        self.limit = limit.into();
        self
    }

    /// Like [`Options::limit`] but accepts a signed value, rejecting negative ones.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOption`] if `limit` is negative.
    pub fn try_limit(self, limit: i64) -> Result<Self, InvalidOption> {
        Ok(self.limit(Bound::from_signed("limit", limit)?))
    }

    /// The number of events to collect.
    #[must_use]
    pub fn count(mut self, count: impl Into<Bound>) -> Self {
        self.count = count.into();
        self
    }

    /// Like [`Options::count`] but accepts a signed value, rejecting negative ones.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOption`] if `count` is negative.
    pub fn try_count(self, count: i64) -> Result<Self, InvalidOption> {
        Ok(self.count(Bound::from_signed("count", count)?))
    }

    /// Whether a collection resolves at once with a list that keeps growing in place.
    #[must_use]
    pub fn resolve_immediately(mut self, resolve_immediately: bool) -> Self {
        self.resolve_immediately = resolve_immediately;
        self
    }

    /// Fails the operation with [`Error::TimedOut`][crate::Error::TimedOut] if it has not
    /// completed this long after it was started.
    ///
    /// Timeouts are driven by the Tokio time driver, so operations with a timeout must be polled
    /// from within a Tokio runtime that has time enabled.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fails the operation with [`Error::Aborted`][crate::Error::Aborted] when the signal aborts.
    #[must_use]
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub(crate) fn is_multi_args(&self) -> bool {
        self.multi_args
    }

    pub(crate) fn rejection_event_names(&self) -> &EventNames {
        &self.rejection_events
    }

    pub(crate) fn resolution_event_names(&self) -> &EventNames {
        &self.resolution_events
    }

    pub(crate) fn limit_bound(&self) -> Bound {
        self.limit
    }

    pub(crate) fn count_bound(&self) -> Bound {
        self.count
    }

    pub(crate) fn is_resolve_immediately(&self) -> bool {
        self.resolve_immediately
    }

    pub(crate) fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn abort_signal(&self) -> Option<&AbortSignal> {
        self.signal.as_ref()
    }

    /// Packs the arguments and applies the filter, returning `None` for filtered-out events.
    pub(crate) fn accept(&self, args: &[V]) -> Option<Payload<V>>
    where
        V: Clone,
    {
        let payload = Payload::pack(args, self.multi_args);

        match &self.filter {
            Some(filter) if !filter(&payload) => None,
            _ => Some(payload),
        }
    }
}

impl<V> Default for Options<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Options<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("multi_args", &self.multi_args)
            .field("filter", &self.filter.is_some())
            .field("rejection_events", &self.rejection_events)
            .field("resolution_events", &self.resolution_events)
            .field("limit", &self.limit)
            .field("count", &self.count)
            .field("resolve_immediately", &self.resolve_immediately)
            .field("timeout", &self.timeout)
            .field("signal", &self.signal)
            .finish()
    }
}
