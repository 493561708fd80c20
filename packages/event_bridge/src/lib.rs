#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Turns callback-driven event emitters into futures and streams.
//!
//! Many event sources deliver their events by invoking registered listener callbacks. This crate
//! adapts any such emitter into one of three pull-based shapes:
//!
//! - [`wait_for`] - a future that resolves with the value of the next matching event.
//! - [`collect`] - a future that resolves with the values of a number of matching events.
//! - [`stream`] - an [`EventStream`] that hands out the value of every matching event in order,
//!   queueing values that arrive before they are requested.
//!
//! Every adapter removes the listeners it registered as soon as it completes, fails, is cancelled
//! or is dropped. Rejection events (`"error"` by default), an [`AbortSignal`] and, for the
//! futures, a timeout can end an operation early. See [`Options`] for the full configuration.
//!
//! Emitters plug in by implementing [`Emitter`], exposing whichever of the common listener
//! method pairs they have. [`LocalEmitter`] is a ready-made single-threaded emitter.
//!
//! All types in this crate are single-threaded.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use event_bridge::{LocalEmitter, Options, Payload, Step, stream, wait_for};
//! use futures::executor::block_on;
//!
//! let emitter = Rc::new(LocalEmitter::<u32>::new());
//!
//! let ready = wait_for(&emitter, "ready", Options::new()).unwrap();
//! let mut progress = stream(
//!     &emitter,
//!     "progress",
//!     Options::new().resolution_events("done"),
//! )
//! .unwrap();
//!
//! emitter.emit("ready", &[1]);
//! emitter.emit("progress", &[10]);
//! emitter.emit("progress", &[20]);
//!
//! block_on(async {
//!     assert_eq!(ready.await.unwrap(), Payload::from(1));
//!
//!     assert_eq!(progress.recv().await.unwrap(), Step::Item(Payload::from(10)));
//!     assert_eq!(progress.recv().await.unwrap(), Step::Item(Payload::from(20)));
//!
//!     emitter.emit("done", &[]);
//!     assert_eq!(progress.recv().await.unwrap(), Step::Finished(None));
//! });
//!
//! assert_eq!(emitter.total_listener_count(), 0);
//! ```

mod abort;
mod binding;
mod collect;
mod deadline;
mod emitter;
mod error;
mod event_name;
mod local_emitter;
mod options;
mod payload;
mod stream;
mod wait_for;

#[cfg(test)]
mod test_utils;

pub use abort::*;
pub use binding::*;
pub use collect::*;
pub(crate) use deadline::*;
pub use emitter::*;
pub use error::*;
pub use event_name::*;
pub use local_emitter::*;
pub use options::*;
pub use payload::*;
pub use stream::*;
pub use wait_for::*;
