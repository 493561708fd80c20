//! The interface between event emitters and the adapters that subscribe to them.

use std::any::type_name;
use std::fmt;
use std::rc::Rc;

use crate::EventName;

/// A callback registered with an emitter.
///
/// The listener receives every argument the emitter passes for an event. Listeners are compared
/// by `Rc` pointer identity, so removing a listener requires the same `Rc` that was registered.
pub type Listener<V> = Rc<dyn Fn(&[V])>;

/// A listener registration or removal method of an emitter.
pub type ListenerFn<E> = fn(&E, &EventName, &Listener<<E as Emitter>::Value>);

/// A source of named events that accepts listeners.
///
/// Implementations describe which listener methods they expose via [`Emitter::listener_methods`].
/// At least one registration method and one removal method must be present for the emitter to be
/// usable with the adapters in this crate.
///
/// Emitters must not hold internal borrows while invoking listeners: the adapters remove their
/// own listeners from inside listener callbacks.
///
/// # Example
///
/// ```rust
/// use event_bridge::{Emitter, EventName, Listener, ListenerMethods};
/// # use std::cell::RefCell;
///
/// #[derive(Default)]
/// struct Button {
///     listeners: RefCell<Vec<(EventName, Listener<u32>)>>,
/// }
///
/// impl Button {
///     fn add_event_listener(&self, event: &EventName, listener: &Listener<u32>) {
///         self.listeners
///             .borrow_mut()
///             .push((event.clone(), listener.clone()));
///     }
///
///     fn remove_event_listener(&self, event: &EventName, listener: &Listener<u32>) {
///         self.listeners
///             .borrow_mut()
///             .retain(|(name, existing)| name != event || !std::rc::Rc::ptr_eq(existing, listener));
///     }
/// }
///
/// impl Emitter for Button {
///     type Value = u32;
///
///     fn listener_methods(&self) -> ListenerMethods<Self> {
///         ListenerMethods::new()
///             .with_add_event_listener(Self::add_event_listener)
///             .with_remove_event_listener(Self::remove_event_listener)
///     }
/// }
/// ```
pub trait Emitter: Sized + 'static {
    /// The type of each argument the emitter passes to its listeners.
    type Value: Clone + fmt::Debug + 'static;

    /// Reports which listener registration and removal methods this emitter exposes.
    fn listener_methods(&self) -> ListenerMethods<Self>;
}

/// The table of listener methods an emitter exposes.
///
/// Each slot corresponds to one of the conventional method names used by event emitters.
/// Slots left empty are treated as absent when binding to the emitter.
pub struct ListenerMethods<E: Emitter> {
    pub(crate) on: Option<ListenerFn<E>>,
    pub(crate) add_listener: Option<ListenerFn<E>>,
    pub(crate) add_event_listener: Option<ListenerFn<E>>,
    pub(crate) off: Option<ListenerFn<E>>,
    pub(crate) remove_listener: Option<ListenerFn<E>>,
    pub(crate) remove_event_listener: Option<ListenerFn<E>>,
}

impl<E: Emitter> ListenerMethods<E> {
    /// Creates a table with no methods present.
    #[must_use]
    pub fn new() -> Self {
        Self {
            on: None,
            add_listener: None,
            add_event_listener: None,
            off: None,
            remove_listener: None,
            remove_event_listener: None,
        }
    }

    /// Declares an `on` registration method.
    #[must_use]
    pub fn with_on(mut self, method: ListenerFn<E>) -> Self {
        self.on = Some(method);
        self
    }

    /// Declares an `add_listener` registration method.
    #[must_use]
    pub fn with_add_listener(mut self, method: ListenerFn<E>) -> Self {
        self.add_listener = Some(method);
        self
    }

    /// Declares an `add_event_listener` registration method.
    #[must_use]
    pub fn with_add_event_listener(mut self, method: ListenerFn<E>) -> Self {
        self.add_event_listener = Some(method);
        self
    }

    /// Declares an `off` removal method.
    #[must_use]
    pub fn with_off(mut self, method: ListenerFn<E>) -> Self {
        self.off = Some(method);
        self
    }

    /// Declares a `remove_listener` removal method.
    #[must_use]
    pub fn with_remove_listener(mut self, method: ListenerFn<E>) -> Self {
        self.remove_listener = Some(method);
        self
    }

    /// Declares a `remove_event_listener` removal method.
    #[must_use]
    pub fn with_remove_event_listener(mut self, method: ListenerFn<E>) -> Self {
        self.remove_event_listener = Some(method);
        self
    }
}

impl<E: Emitter> Default for ListenerMethods<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Emitter> Clone for ListenerMethods<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Emitter> Copy for ListenerMethods<E> {}

impl<E: Emitter> fmt::Debug for ListenerMethods<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("on", &self.on.is_some())
            .field("add_listener", &self.add_listener.is_some())
            .field("add_event_listener", &self.add_event_listener.is_some())
            .field("off", &self.off.is_some())
            .field("remove_listener", &self.remove_listener.is_some())
            .field("remove_event_listener", &self.remove_event_listener.is_some())
            .finish()
    }
}
