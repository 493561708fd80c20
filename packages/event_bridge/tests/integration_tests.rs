//! End-to-end tests of the adapters through the public API, including an emitter implemented
//! outside of the crate.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use event_bridge::{
    AbortController, Emitter, Error, EventName, Listener, ListenerMethods, LocalEmitter,
    MissingMethod, Options, Payload, Step, collect, stream, wait_for,
};
use futures::StreamExt;
use futures::executor::{LocalPool, block_on};
use futures::future::ready;
use futures::task::LocalSpawnExt;

/// A browser-style event target that only knows `add_event_listener`/`remove_event_listener`.
#[derive(Default)]
struct EventTarget {
    listeners: RefCell<Vec<(EventName, Listener<String>)>>,
}

impl EventTarget {
    fn add_event_listener(&self, event: &EventName, listener: &Listener<String>) {
        self.listeners
            .borrow_mut()
            .push((event.clone(), Rc::clone(listener)));
    }

    fn remove_event_listener(&self, event: &EventName, listener: &Listener<String>) {
        self.listeners
            .borrow_mut()
            .retain(|(name, existing)| !(name == event && Rc::ptr_eq(existing, listener)));
    }

    fn dispatch(&self, event: &str, detail: &str) {
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&[detail.to_owned()]);
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Emitter for EventTarget {
    type Value = String;

    fn listener_methods(&self) -> ListenerMethods<Self> {
        ListenerMethods::new()
            .with_add_event_listener(Self::add_event_listener)
            .with_remove_event_listener(Self::remove_event_listener)
    }
}

/// Can register listeners but has no way to remove them.
struct WriteOnlyTarget;

impl WriteOnlyTarget {
    fn add_event_listener(&self, _: &EventName, _: &Listener<String>) {}
}

impl Emitter for WriteOnlyTarget {
    type Value = String;

    fn listener_methods(&self) -> ListenerMethods<Self> {
        ListenerMethods::new().with_add_event_listener(Self::add_event_listener)
    }
}

#[test]
fn custom_emitter_resolves_wait_for() {
    let target = Rc::new(EventTarget::default());
    let loaded = wait_for(&target, "load", Options::new()).unwrap();
    assert_eq!(target.listener_count(), 2);

    target.dispatch("load", "page.html");

    assert_eq!(
        block_on(loaded).unwrap(),
        Payload::First(Some("page.html".to_owned()))
    );
    assert_eq!(target.listener_count(), 0);
}

#[test]
fn custom_emitter_without_removal_is_rejected() {
    let target = Rc::new(WriteOnlyTarget);

    let Err(Error::IncompatibleEmitter(error)) = wait_for(&target, "load", Options::new()) else {
        panic!("expected an incompatible emitter error");
    };

    assert_eq!(error.missing(), MissingMethod::Removal);
}

#[test]
fn producer_and_consumer_interleave() {
    let emitter = Rc::new(LocalEmitter::<u32>::new());
    let mut numbers = stream(
        &emitter,
        ["odd", "even"],
        Options::new().resolution_events("end"),
    )
    .unwrap();
    let received = Rc::new(RefCell::new(Vec::new()));

    let mut pool = LocalPool::new();
    let received_clone = Rc::clone(&received);
    pool.spawner()
        .spawn_local(async move {
            while let Step::Item(payload) = numbers.recv().await.unwrap() {
                received_clone.borrow_mut().extend(payload.into_first());
            }
        })
        .unwrap();

    // Consumer waits first.
    pool.run_until_stalled();
    emitter.emit("odd", &[1]);
    pool.run_until_stalled();

    // Producer runs ahead.
    emitter.emit("even", &[2]);
    emitter.emit("odd", &[3]);
    emitter.emit("even", &[4]);
    pool.run_until_stalled();

    emitter.emit("end", &[]);
    pool.run();

    assert_eq!(*received.borrow(), [1, 2, 3, 4]);
    assert_eq!(emitter.total_listener_count(), 0);
}

#[test]
fn stream_combinators_apply() {
    let emitter = Rc::new(LocalEmitter::<i64>::new());
    let readings = stream(&emitter, "reading", Options::new().limit(4_usize)).unwrap();

    for value in [5, -1, 7, 12, 30] {
        emitter.emit("reading", &[value]);
    }
    assert_eq!(readings.queued_len(), 4);

    let positive: Vec<i64> = block_on(
        readings
            .filter_map(|reading| async move { reading.ok().and_then(Payload::into_first) })
            .filter(|value| ready(*value > 0))
            .collect(),
    );

    assert_eq!(positive, [5, 7, 12]);
    assert_eq!(emitter.total_listener_count(), 0);
}

#[test]
fn immediately_resolved_collection_follows_emitter() {
    let emitter = Rc::new(LocalEmitter::<&'static str>::new());
    let names = block_on(
        collect(
            &emitter,
            "hello",
            Options::new().resolve_immediately(true),
        )
        .unwrap(),
    )
    .unwrap();

    emitter.emit("hello", &["Jack"]);
    assert_eq!(names.to_vec(), [Payload::from("Jack")]);

    emitter.emit("hello", &["Mark"]);
    assert_eq!(
        names.to_vec(),
        [Payload::from("Jack"), Payload::from("Mark")]
    );

    emitter.emit("error", &["😿"]);
    emitter.emit("hello", &["John"]);
    assert_eq!(names.len(), 2);
    assert!(!names.is_listening());
}

#[test]
fn one_signal_aborts_every_adapter() {
    let emitter = Rc::new(LocalEmitter::<i32>::new());
    let controller = AbortController::new();
    let options = Options::new().signal(controller.signal());

    let single = wait_for(&emitter, "a", options.clone()).unwrap();
    let several = collect(&emitter, "b", options.clone().count(3_usize)).unwrap();
    let mut sequence = stream(&emitter, "c", options).unwrap();
    assert_eq!(emitter.total_listener_count(), 6);

    controller.abort_with("shutting down");

    assert_eq!(emitter.total_listener_count(), 0);
    assert!(matches!(block_on(single), Err(Error::Aborted { .. })));
    assert!(matches!(block_on(several), Err(Error::Aborted { .. })));

    let Err(Error::Aborted { reason }) = block_on(sequence.recv()) else {
        panic!("expected the stream to be aborted");
    };
    assert_eq!(reason.as_str(), "shutting down");
}

#[tokio::test(start_paused = true)]
async fn timeout_applies_to_futures_only() {
    let emitter = Rc::new(LocalEmitter::<i32>::new());
    let timeout = Duration::from_millis(250);

    let single = wait_for(&emitter, "a", Options::new().timeout(timeout)).unwrap();
    let mut sequence = stream(&emitter, "a", Options::new().timeout(timeout)).unwrap();

    assert_eq!(single.await.unwrap_err(), Error::TimedOut { duration: timeout });

    emitter.emit("a", &[1]);
    assert_eq!(
        sequence.recv().await.unwrap(),
        Step::Item(Payload::from(1))
    );
}
