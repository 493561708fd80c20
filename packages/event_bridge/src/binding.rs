//! Locating the listener methods of an emitter and keeping track of what was registered.

use std::any::type_name;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::{
    AbortReason, AbortRegistration, AbortSignal, Emitter, EventName, IncompatibleEmitter, Listener,
    ListenerFn, MissingMethod,
};

/// The outcome of probing an emitter for listener methods.
#[derive(Debug)]
#[expect(
    clippy::exhaustive_enums,
    reason = "an emitter either has a usable method pair or it does not"
)]
pub enum Probe<E: Emitter> {
    /// The emitter has both a registration and a removal method.
    Bound(ListenerBinding<E>),

    /// The emitter lacks one of the two method families.
    Incompatible(IncompatibleEmitter),
}

/// Determines which listener methods the emitter exposes.
///
/// The first present registration method among `on`, `add_listener` and `add_event_listener` is
/// used, as is the first present removal method among `off`, `remove_listener` and
/// `remove_event_listener`. Nothing is registered with the emitter.
pub fn probe<E: Emitter>(emitter: &Rc<E>) -> Probe<E> {
    let methods = emitter.listener_methods();

    let Some(subscribe) = methods
        .on
        .or(methods.add_listener)
        .or(methods.add_event_listener)
    else {
        return Probe::Incompatible(IncompatibleEmitter::new(MissingMethod::Registration));
    };

    let Some(unsubscribe) = methods
        .off
        .or(methods.remove_listener)
        .or(methods.remove_event_listener)
    else {
        return Probe::Incompatible(IncompatibleEmitter::new(MissingMethod::Removal));
    };

    Probe::Bound(ListenerBinding {
        emitter: Rc::clone(emitter),
        subscribe,
        unsubscribe,
    })
}

/// A registration and removal method pair bound to a specific emitter.
pub struct ListenerBinding<E: Emitter> {
    emitter: Rc<E>,
    subscribe: ListenerFn<E>,
    unsubscribe: ListenerFn<E>,
}

impl<E: Emitter> ListenerBinding<E> {
    /// Binds to the listener methods of the emitter.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleEmitter`] if the emitter lacks a registration or a removal method.
    pub fn bind(emitter: &Rc<E>) -> Result<Self, IncompatibleEmitter> {
        match probe(emitter) {
            Probe::Bound(binding) => Ok(binding),
            Probe::Incompatible(error) => Err(error),
        }
    }

    /// Registers a listener for the named event.
    pub fn subscribe(&self, event: &EventName, listener: &Listener<E::Value>) {
        (self.subscribe)(&self.emitter, event, listener);
    }

    /// Removes a listener previously registered for the named event.
    pub fn unsubscribe(&self, event: &EventName, listener: &Listener<E::Value>) {
        (self.unsubscribe)(&self.emitter, event, listener);
    }
}

impl<E: Emitter> fmt::Debug for ListenerBinding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>()).finish_non_exhaustive()
    }
}

/// Everything one adapter has registered, removed together exactly once.
pub(crate) struct Subscriptions<E: Emitter> {
    binding: ListenerBinding<E>,
    listeners: Vec<(EventName, Listener<E::Value>)>,
    abort: Option<(AbortSignal, AbortRegistration)>,
    torn_down: bool,
}

impl<E: Emitter> Subscriptions<E> {
    pub(crate) fn new(binding: ListenerBinding<E>) -> Self {
        Self {
            binding,
            listeners: Vec::new(),
            abort: None,
            torn_down: false,
        }
    }

    /// Registers the same listener for each of the names.
    pub(crate) fn listen<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a EventName>,
        listener: &Listener<E::Value>,
    ) {
        debug_assert!(!self.torn_down, "listening after teardown");

        for name in names {
            trace!(event = %name, "subscribing");

            self.binding.subscribe(name, listener);
            self.listeners.push((name.clone(), Rc::clone(listener)));
        }
    }

    /// Runs the callback when the signal aborts, until teardown.
    pub(crate) fn watch_signal(
        &mut self,
        signal: &AbortSignal,
        callback: Rc<dyn Fn(&AbortReason)>,
    ) {
        debug_assert!(self.abort.is_none(), "only one abort signal per operation");

        let registration = signal.on_abort(callback);
        self.abort = Some((signal.clone(), registration));
    }

    /// Removes every listener and the abort callback. Later calls do nothing.
    pub(crate) fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        self.torn_down = true;

        debug!(listeners = self.listeners.len(), "removing listeners");

        for (name, listener) in self.listeners.drain(..) {
            self.binding.unsubscribe(&name, &listener);
        }

        if let Some((signal, registration)) = self.abort.take() {
            signal.remove(registration);
        }
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<E: Emitter> fmt::Debug for Subscriptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("listeners", &self.listeners.len())
            .field("abort", &self.abort.is_some())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}
