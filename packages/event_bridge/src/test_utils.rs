//! Testing utilities shared by the adapter test modules.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;

use crate::{Emitter, EventName, Listener, ListenerMethods, LocalEmitter};

/// Polls a future once with a waker that does nothing.
pub(crate) fn poll_once<F>(future: &mut F) -> Poll<F::Output>
where
    F: Future + Unpin,
{
    let mut cx = Context::from_waker(noop_waker_ref());
    Pin::new(future).poll(&mut cx)
}

/// An emitter that only exposes the `add_event_listener`/`remove_event_listener` pair.
#[derive(Debug, Default)]
pub(crate) struct DomEmitter {
    inner: LocalEmitter<&'static str>,
}

impl DomEmitter {
    fn add_event_listener(&self, event: &EventName, listener: &Listener<&'static str>) {
        self.inner.on(event, listener);
    }

    fn remove_event_listener(&self, event: &EventName, listener: &Listener<&'static str>) {
        self.inner.off(event, listener);
    }

    pub(crate) fn dispatch(&self, event: &str, value: &'static str) {
        self.inner.emit(event, &[value]);
    }

    pub(crate) fn listener_count(&self, event: &str) -> usize {
        self.inner.listener_count(event)
    }
}

impl Emitter for DomEmitter {
    type Value = &'static str;

    fn listener_methods(&self) -> ListenerMethods<Self> {
        ListenerMethods::new()
            .with_add_event_listener(Self::add_event_listener)
            .with_remove_event_listener(Self::remove_event_listener)
    }
}

/// An emitter that can register listeners but never remove them.
#[derive(Debug, Default)]
pub(crate) struct AppendOnlyEmitter {
    registered: RefCell<usize>,
}

impl AppendOnlyEmitter {
    fn on(&self, _: &EventName, _: &Listener<i32>) {
        *self.registered.borrow_mut() += 1;
    }

    pub(crate) fn registered(&self) -> usize {
        *self.registered.borrow()
    }
}

impl Emitter for AppendOnlyEmitter {
    type Value = i32;

    fn listener_methods(&self) -> ListenerMethods<Self> {
        ListenerMethods::new().with_on(Self::on)
    }
}

pub(crate) fn local_emitter<V>() -> Rc<LocalEmitter<V>> {
    Rc::new(LocalEmitter::new())
}
