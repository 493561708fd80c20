use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::{Emitter, EventName, Listener, ListenerMethods};

/// A single-threaded event emitter with named events.
///
/// Listeners are invoked in registration order. The set of listeners is captured when an event
/// is emitted, so listeners may freely add or remove listeners (including themselves) while being
/// invoked; such changes take effect from the next emitted event.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
///
/// use event_bridge::{EventName, Listener, LocalEmitter};
///
/// let emitter = LocalEmitter::<&str>::new();
/// let listener: Listener<&str> = Rc::new(|args: &[&str]| println!("got {args:?}"));
///
/// emitter.on(&EventName::from("greeting"), &listener);
/// assert!(emitter.emit("greeting", &["hello"]));
///
/// emitter.off(&EventName::from("greeting"), &listener);
/// assert!(!emitter.emit("greeting", &["hello"]));
/// ```
pub struct LocalEmitter<V> {
    listeners: RefCell<Vec<(EventName, Listener<V>)>>,
}

impl<V> LocalEmitter<V> {
    /// Creates an emitter without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Registers a listener for the named event.
    ///
    /// Registering the same listener twice makes it run twice per event.
    pub fn on(&self, event: &EventName, listener: &Listener<V>) {
        self.listeners
            .borrow_mut()
            .push((event.clone(), Rc::clone(listener)));
    }

    /// Alias of [`LocalEmitter::on`].
    pub fn add_listener(&self, event: &EventName, listener: &Listener<V>) {
        self.on(event, listener);
    }

    /// Removes the most recently added registration of the listener for the named event.
    ///
    /// Does nothing if the listener is not registered for that event.
    pub fn off(&self, event: &EventName, listener: &Listener<V>) {
        let mut listeners = self.listeners.borrow_mut();

        if let Some(index) = listeners
            .iter()
            .rposition(|(name, existing)| name == event && Rc::ptr_eq(existing, listener))
        {
            listeners.remove(index);
        }
    }

    /// Alias of [`LocalEmitter::off`].
    pub fn remove_listener(&self, event: &EventName, listener: &Listener<V>) {
        self.off(event, listener);
    }

    /// Invokes every listener of the named event with the arguments.
    ///
    /// Returns whether the event had any listeners.
    pub fn emit(&self, event: &str, args: &[V]) -> bool {
        let snapshot: Vec<Listener<V>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        trace!(event, listeners = snapshot.len(), "emitting");

        for listener in &snapshot {
            listener(args);
        }

        !snapshot.is_empty()
    }

    /// The number of listeners registered for the named event.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }

    /// The number of listeners registered for all events combined.
    #[must_use]
    pub fn total_listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl<V> Default for LocalEmitter<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for LocalEmitter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl<V> Emitter for LocalEmitter<V>
where
    V: Clone + fmt::Debug + 'static,
{
    type Value = V;

    fn listener_methods(&self) -> ListenerMethods<Self> {
        ListenerMethods::new()
            .with_on(Self::on)
            .with_add_listener(Self::add_listener)
            .with_off(Self::off)
            .with_remove_listener(Self::remove_listener)
    }
}
